//! Feed types for Gator.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A subscribed feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    /// Feed ID.
    pub id: Uuid,
    /// When the feed was created.
    pub created_at: DateTime<Utc>,
    /// When the feed was last updated.
    pub updated_at: DateTime<Utc>,
    /// Display name.
    pub name: String,
    /// Feed URL (unique).
    pub url: String,
    /// Owning user.
    pub user_id: Uuid,
    /// Last time the feed was claimed for a refresh.
    pub last_fetched_at: Option<DateTime<Utc>>,
}

/// New feed for creation.
#[derive(Debug, Clone)]
pub struct NewFeed {
    /// Display name.
    pub name: String,
    /// Feed URL.
    pub url: String,
    /// Owning user.
    pub user_id: Uuid,
}

impl NewFeed {
    /// Create a new feed.
    pub fn new(name: impl Into<String>, url: impl Into<String>, user_id: Uuid) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            user_id,
        }
    }
}

/// A feed together with the name of the user who added it.
#[derive(Debug, Clone)]
pub struct FeedWithOwner {
    /// The feed.
    pub feed: Feed,
    /// Owner's user name.
    pub owner_name: String,
}

/// A user's subscription to a feed.
#[derive(Debug, Clone)]
pub struct FeedFollow {
    /// Follow ID.
    pub id: Uuid,
    /// When the follow was created.
    pub created_at: DateTime<Utc>,
    /// When the follow was last updated.
    pub updated_at: DateTime<Utc>,
    /// Following user.
    pub user_id: Uuid,
    /// Followed feed.
    pub feed_id: Uuid,
    /// Name of the followed feed.
    pub feed_name: String,
    /// Name of the following user.
    pub user_name: String,
}

/// An ingested feed entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Post ID.
    pub id: Uuid,
    /// When the post was stored.
    pub created_at: DateTime<Utc>,
    /// When the post was last updated.
    pub updated_at: DateTime<Utc>,
    /// Title.
    pub title: String,
    /// Canonical URL (unique across all posts).
    pub url: String,
    /// Description, absent when the source gave none.
    pub description: Option<String>,
    /// Publication time, absent when missing or unparseable.
    pub published_at: Option<DateTime<Utc>>,
    /// Parent feed.
    pub feed_id: Uuid,
}

/// Storage-ready entry produced from a parsed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    /// Title.
    pub title: String,
    /// Canonical URL.
    pub url: String,
    /// Description.
    pub description: Option<String>,
    /// Publication time.
    pub published_at: Option<DateTime<Utc>>,
    /// Parent feed.
    pub feed_id: Uuid,
}

/// Result of an idempotent post insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The post was new and has been stored.
    Inserted(Post),
    /// A post with the same URL already exists; nothing was written.
    AlreadyExists,
}

impl InsertOutcome {
    /// Whether a row was written.
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}

/// Parsed feed document (from fetcher).
#[derive(Debug, Clone, Default)]
pub struct ParsedFeed {
    /// Channel title.
    pub title: String,
    /// Items in document order.
    pub items: Vec<ParsedItem>,
}

/// Parsed feed item (from fetcher).
#[derive(Debug, Clone, Default)]
pub struct ParsedItem {
    /// Item title.
    pub title: String,
    /// Item link.
    pub link: String,
    /// Item description.
    pub description: Option<String>,
    /// Publication date exactly as the document gave it.
    pub published_raw: Option<String>,
}

impl ParsedItem {
    /// Create an item with a title and link.
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            description: None,
            published_raw: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the raw publication date.
    pub fn with_published(mut self, published: impl Into<String>) -> Self {
        self.published_raw = Some(published.into());
        self
    }
}
