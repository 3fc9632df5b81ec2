//! Feed document fetcher.
//!
//! Downloads a syndication document over HTTP with bounded time and size,
//! then parses it. RSS 2.0 goes through the `rss` crate so the raw `pubDate`
//! string survives; Atom and JSON Feed fall back to `feed-rs`.

use std::time::Duration;

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;
use rss::Channel;
use thiserror::Error;

use super::types::{ParsedFeed, ParsedItem};
use crate::config::FetcherConfig;
use crate::datetime::format_pub_date;
use crate::{GatorError, Result};

/// Failure to retrieve or parse a feed document.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The URL cannot be fetched at all.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Connection, timeout or body read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// The document exceeds the configured size limit.
    #[error("feed too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    /// The document is not a feed we can read.
    #[error("malformed feed document: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Transport(e.to_string())
    }
}

/// Retrieves and parses feed documents.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch the document at `url` and parse it.
    async fn fetch(&self, url: &str) -> std::result::Result<ParsedFeed, FetchError>;
}

/// HTTP feed fetcher with timeouts, a redirect limit and a size cap.
#[derive(Debug, Clone)]
pub struct RssFetcher {
    client: Client,
    max_feed_size: u64,
}

impl RssFetcher {
    /// Create a fetcher from configuration.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| GatorError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_feed_size: config.max_feed_size_bytes,
        })
    }

    async fn download(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let mut response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        if let Some(content_length) = response.content_length() {
            if content_length > self.max_feed_size {
                return Err(FetchError::TooLarge {
                    size: content_length,
                    max: self.max_feed_size,
                });
            }
        }

        // Chunked bodies carry no length up front.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() as u64 > self.max_feed_size {
                return Err(FetchError::TooLarge {
                    size: body.len() as u64,
                    max: self.max_feed_size,
                });
            }
        }

        Ok(body)
    }
}

#[async_trait]
impl DocumentFetcher for RssFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<ParsedFeed, FetchError> {
        validate_url(url)?;
        let body = self.download(url).await?;
        parse_document(&body)
    }
}

/// Check that a URL can be fetched: http or https with a host.
pub fn validate_url(url: &str) -> std::result::Result<(), FetchError> {
    let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(FetchError::InvalidUrl(format!(
                "unsupported URL scheme: {scheme}"
            )));
        }
    }

    if parsed.host().is_none() {
        return Err(FetchError::InvalidUrl("URL has no host".to_string()));
    }

    Ok(())
}

/// Parse a feed document.
pub fn parse_document(bytes: &[u8]) -> std::result::Result<ParsedFeed, FetchError> {
    match Channel::read_from(bytes) {
        Ok(channel) => Ok(from_channel(&channel)),
        Err(rss_err) => parser::parse(bytes).map(from_feed_rs).map_err(|e| {
            FetchError::Parse(format!("not RSS ({rss_err}) and not Atom/JSON ({e})"))
        }),
    }
}

fn from_channel(channel: &Channel) -> ParsedFeed {
    let items = channel
        .items()
        .iter()
        .map(|item| ParsedItem {
            title: item.title().unwrap_or_default().to_string(),
            link: item.link().unwrap_or_default().to_string(),
            description: item.description().map(str::to_string),
            published_raw: item.pub_date().map(str::to_string),
        })
        .collect();

    ParsedFeed {
        title: channel.title().to_string(),
        items,
    }
}

fn from_feed_rs(feed: feed_rs::model::Feed) -> ParsedFeed {
    let title = feed.title.map(|t| t.content).unwrap_or_default();

    let items = feed
        .entries
        .into_iter()
        .map(|entry| {
            let published = entry.published.or(entry.updated);
            ParsedItem {
                title: entry.title.map(|t| t.content).unwrap_or_default(),
                link: entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .unwrap_or_default(),
                description: entry
                    .summary
                    .map(|t| t.content)
                    .or(entry.content.and_then(|c| c.body)),
                published_raw: published.as_ref().map(format_pub_date),
            }
        })
        .collect();

    ParsedFeed { title, items }
}
