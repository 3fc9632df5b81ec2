//! Gator - RSS feed aggregator
//!
//! Users follow syndication feeds; a polling loop refreshes one feed per tick
//! and stores each new post exactly once, keyed by its URL.

pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;

pub use config::Config;
pub use db::{Database, DbPool, NewUser, User, UserRepository};
pub use error::{GatorError, Result};
pub use feed::{
    DocumentFetcher, FeedStore, FetchError, Ingestor, InsertOutcome, MemoryFeedStore,
    RssFetcher, Scheduler, SqlFeedStore, TickOutcome,
};
