//! Storage boundary used by the ingestion step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::repository::{FeedRepository, PostRepository};
use super::types::{Feed, InsertOutcome, NewPost};
use crate::{Database, Result};

/// Feed and post storage as seen by the ingestion step.
#[async_trait]
pub trait FeedStore: Send + Sync {
    /// The feed that has waited longest for a refresh, never-fetched first.
    async fn next_feed_to_fetch(&self) -> Result<Option<Feed>>;

    /// Set the feed's last-fetched time. Fails with `NotFound` for an unknown feed.
    async fn mark_feed_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<Feed>;

    /// Store the post unless its URL is already present.
    async fn create_post_if_absent(&self, post: &NewPost) -> Result<InsertOutcome>;
}

/// `FeedStore` backed by the relational database.
#[derive(Debug, Clone)]
pub struct SqlFeedStore {
    db: Database,
}

impl SqlFeedStore {
    /// Create a store over an open database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl FeedStore for SqlFeedStore {
    async fn next_feed_to_fetch(&self) -> Result<Option<Feed>> {
        FeedRepository::new(self.db.pool()).next_to_fetch().await
    }

    async fn mark_feed_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<Feed> {
        FeedRepository::new(self.db.pool())
            .mark_fetched(feed_id, at)
            .await
    }

    async fn create_post_if_absent(&self, post: &NewPost) -> Result<InsertOutcome> {
        PostRepository::new(self.db.pool())
            .create_if_absent(post)
            .await
    }
}
