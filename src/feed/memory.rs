//! In-memory `FeedStore`.
//!
//! Mirrors the database contract (oldest-first selection, monotonic
//! last-fetched time, unique post URLs) without a database, and can be told
//! to fail specific writes.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::store::FeedStore;
use super::types::{Feed, InsertOutcome, NewPost, Post};
use crate::{GatorError, Result};

#[derive(Debug, Default)]
struct Inner {
    feeds: Vec<Feed>,
    posts: Vec<Post>,
    failing_post_urls: HashSet<String>,
    fail_marks: bool,
}

/// Feed store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryFeedStore {
    inner: Mutex<Inner>,
}

impl MemoryFeedStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a feed that has never been fetched.
    pub fn add_feed(&self, name: &str, url: &str) -> Feed {
        self.add_feed_fetched_at(name, url, None)
    }

    /// Add a feed with the given last-fetched time.
    pub fn add_feed_fetched_at(
        &self,
        name: &str,
        url: &str,
        last_fetched_at: Option<DateTime<Utc>>,
    ) -> Feed {
        let now = Utc::now();
        let feed = Feed {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            name: name.to_string(),
            url: url.to_string(),
            user_id: Uuid::nil(),
            last_fetched_at,
        };
        self.lock().feeds.push(feed.clone());
        feed
    }

    /// Get a feed by ID.
    pub fn feed(&self, id: Uuid) -> Option<Feed> {
        self.lock().feeds.iter().find(|f| f.id == id).cloned()
    }

    /// Snapshot of all stored posts in insertion order.
    pub fn posts(&self) -> Vec<Post> {
        self.lock().posts.clone()
    }

    /// Make inserts of the given URL fail with a database error.
    pub fn fail_inserts_for(&self, url: &str) {
        self.lock().failing_post_urls.insert(url.to_string());
    }

    /// Make every last-fetched update fail with a database error.
    pub fn fail_marks(&self, fail: bool) {
        self.lock().fail_marks = fail;
    }
}

#[async_trait]
impl FeedStore for MemoryFeedStore {
    async fn next_feed_to_fetch(&self) -> Result<Option<Feed>> {
        let inner = self.lock();
        let next = inner
            .feeds
            .iter()
            .min_by(|a, b| {
                // None sorts before Some, matching NULLS FIRST.
                a.last_fetched_at
                    .cmp(&b.last_fetched_at)
                    .then(a.created_at.cmp(&b.created_at))
                    .then(a.id.cmp(&b.id))
            })
            .cloned();
        Ok(next)
    }

    async fn mark_feed_fetched(&self, feed_id: Uuid, at: DateTime<Utc>) -> Result<Feed> {
        let mut inner = self.lock();
        if inner.fail_marks {
            return Err(GatorError::Database("simulated write failure".to_string()));
        }
        let feed = inner
            .feeds
            .iter_mut()
            .find(|f| f.id == feed_id)
            .ok_or_else(|| GatorError::NotFound(format!("feed {feed_id}")))?;

        if feed.last_fetched_at.map_or(true, |last| last < at) {
            feed.last_fetched_at = Some(at);
        }
        feed.updated_at = Utc::now();
        Ok(feed.clone())
    }

    async fn create_post_if_absent(&self, post: &NewPost) -> Result<InsertOutcome> {
        let mut inner = self.lock();
        if inner.failing_post_urls.contains(&post.url) {
            return Err(GatorError::Database("simulated write failure".to_string()));
        }
        if inner.posts.iter().any(|p| p.url == post.url) {
            return Ok(InsertOutcome::AlreadyExists);
        }

        let now = Utc::now();
        let stored = Post {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            title: post.title.clone(),
            url: post.url.clone(),
            description: post.description.clone(),
            published_at: post.published_at,
            feed_id: post.feed_id,
        };
        inner.posts.push(stored.clone());
        Ok(InsertOutcome::Inserted(stored))
    }
}
