//! Single feed refresh.
//!
//! One refresh picks the feed that has waited longest, claims it by moving
//! its last-fetched time to now, then fetches the document and stores every
//! item whose URL is new. The claim happens before the fetch so a broken feed
//! still rotates to the back of the queue.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::fetcher::DocumentFetcher;
use super::normalizer::normalize_item;
use super::store::FeedStore;
use super::types::InsertOutcome;
use crate::Result;

/// Counts from one feed refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// The refreshed feed.
    pub feed_id: Uuid,
    /// Its URL.
    pub feed_url: String,
    /// Channel title reported by the document.
    pub channel_title: String,
    /// Items stored for the first time.
    pub inserted: usize,
    /// Items whose URL was already stored.
    pub duplicates: usize,
    /// Items without a link.
    pub skipped: usize,
    /// Items the store failed to write.
    pub failed: usize,
}

/// What one ingestion step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// There were no feeds to refresh.
    Idle,
    /// A feed was refreshed.
    Refreshed(RefreshSummary),
}

/// Runs feed refreshes against a store and a fetcher.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn FeedStore>,
    fetcher: Arc<dyn DocumentFetcher>,
}

impl Ingestor {
    /// Create an ingestor.
    pub fn new(store: Arc<dyn FeedStore>, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self { store, fetcher }
    }

    /// Refresh the feed that has waited longest.
    ///
    /// Fails when selecting or claiming the feed fails, or when its document
    /// cannot be fetched or parsed. Every failure is logged here along with
    /// the feed it concerns. Per-item store failures are counted in the
    /// summary instead.
    pub async fn refresh_next(&self) -> Result<TickOutcome> {
        let next = self.store.next_feed_to_fetch().await.map_err(|e| {
            error!("Failed to select the next feed: {}", e);
            e
        })?;
        let Some(feed) = next else {
            return Ok(TickOutcome::Idle);
        };

        let feed = self
            .store
            .mark_feed_fetched(feed.id, Utc::now())
            .await
            .map_err(|e| {
                error!("Failed to claim feed {} ({}): {}", feed.id, feed.url, e);
                e
            })?;
        debug!("Claimed feed {} ({})", feed.id, feed.url);

        let parsed = self.fetcher.fetch(&feed.url).await.map_err(|e| {
            error!("Failed to fetch feed {} ({}): {}", feed.id, feed.url, e);
            e
        })?;

        let mut summary = RefreshSummary {
            feed_id: feed.id,
            feed_url: feed.url.clone(),
            channel_title: parsed.title.clone(),
            ..RefreshSummary::default()
        };

        for item in &parsed.items {
            let Some(post) = normalize_item(item, feed.id) else {
                warn!(
                    "Skipping item {:?} of feed {} ({}): no link",
                    item.title, feed.id, feed.url
                );
                summary.skipped += 1;
                continue;
            };

            match self.store.create_post_if_absent(&post).await {
                Ok(InsertOutcome::Inserted(_)) => summary.inserted += 1,
                Ok(InsertOutcome::AlreadyExists) => {
                    debug!("Post {} already stored", post.url);
                    summary.duplicates += 1;
                }
                Err(e) => {
                    error!(
                        "Failed to store post {} of feed {} ({}): {}",
                        post.url, feed.id, feed.url, e
                    );
                    summary.failed += 1;
                }
            }
        }

        Ok(TickOutcome::Refreshed(summary))
    }

    /// Run one ingestion step, logging the outcome instead of returning errors.
    ///
    /// Returns `None` when the step failed.
    pub async fn tick(&self) -> Option<TickOutcome> {
        match self.refresh_next().await {
            Ok(TickOutcome::Idle) => {
                info!("No feeds to fetch");
                Some(TickOutcome::Idle)
            }
            Ok(TickOutcome::Refreshed(summary)) => {
                info!(
                    "Fetched {:?} ({}): {} new, {} already stored, {} skipped, {} failed",
                    summary.channel_title,
                    summary.feed_url,
                    summary.inserted,
                    summary.duplicates,
                    summary.skipped,
                    summary.failed
                );
                Some(TickOutcome::Refreshed(summary))
            }
            Err(_) => None,
        }
    }
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor").finish()
    }
}
