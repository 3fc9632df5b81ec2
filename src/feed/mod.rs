//! Feed subscription and ingestion for Gator.
//!
//! This module holds the feed, follow and post repositories and the polling
//! loop that keeps posts up to date.

pub mod fetcher;
pub mod ingest;
pub mod memory;
pub mod normalizer;
pub mod repository;
pub mod scheduler;
pub mod store;
pub mod types;

pub use fetcher::{parse_document, validate_url, DocumentFetcher, FetchError, RssFetcher};
pub use ingest::{Ingestor, RefreshSummary, TickOutcome};
pub use memory::MemoryFeedStore;
pub use normalizer::normalize_item;
pub use repository::{FeedFollowRepository, FeedRepository, PostRepository};
pub use scheduler::{parse_interval, Scheduler};
pub use store::{FeedStore, SqlFeedStore};
pub use types::{
    Feed, FeedFollow, FeedWithOwner, InsertOutcome, NewFeed, NewPost, ParsedFeed, ParsedItem,
    Post,
};
