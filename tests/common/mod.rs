//! Test helpers for integration tests.
//!
//! Provides log capture, canned feed documents, fake fetchers and database
//! setup shared by the integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::subscriber::DefaultGuard;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gator::config::FetcherConfig;
use gator::db::{NewUser, User, UserRepository};
use gator::feed::{Feed, FeedRepository, NewFeed, ParsedFeed, RssFetcher};
use gator::{Database, DocumentFetcher, FetchError};

/// Captured log output.
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Everything logged so far.
    pub fn contents(&self) -> String {
        let buf = self.buf.lock().unwrap();
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Capture every log line on this thread until the guard drops.
///
/// Use from a current-thread runtime so spawned work logs on the same thread.
pub fn capture_logs() -> (LogCapture, DefaultGuard) {
    capture_logs_at("gator=trace")
}

/// Like `capture_logs`, with an explicit filter such as `gator=info`.
pub fn capture_logs_at(filter: &str) -> (LogCapture, DefaultGuard) {
    let capture = LogCapture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}

/// One item of a generated RSS document.
pub struct Item<'a> {
    pub title: &'a str,
    pub link: &'a str,
    pub description: Option<&'a str>,
    pub pub_date: Option<&'a str>,
}

impl<'a> Item<'a> {
    pub fn new(title: &'a str, link: &'a str) -> Self {
        Self {
            title,
            link,
            description: None,
            pub_date: None,
        }
    }

    pub fn description(mut self, description: &'a str) -> Self {
        self.description = Some(description);
        self
    }

    pub fn pub_date(mut self, pub_date: &'a str) -> Self {
        self.pub_date = Some(pub_date);
        self
    }
}

/// Build an RSS 2.0 document.
pub fn rss_document(title: &str, items: &[Item<'_>]) -> String {
    let mut doc = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n<channel>\n\
         <title>{title}</title>\n<link>https://example.com/</link>\n\
         <description>Test feed</description>\n"
    );
    for item in items {
        doc.push_str("<item>\n");
        doc.push_str(&format!("<title>{}</title>\n", item.title));
        doc.push_str(&format!("<link>{}</link>\n", item.link));
        if let Some(description) = item.description {
            doc.push_str(&format!("<description>{description}</description>\n"));
        }
        if let Some(pub_date) = item.pub_date {
            doc.push_str(&format!("<pubDate>{pub_date}</pubDate>\n"));
        }
        doc.push_str("</item>\n");
    }
    doc.push_str("</channel>\n</rss>\n");
    doc
}

/// Serve `body` at `route` and return the full URL.
pub async fn mount_feed(server: &MockServer, route: &str, body: String) -> String {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(body),
        )
        .mount(server)
        .await;
    format!("{}{}", server.uri(), route)
}

/// Answer `route` with the given status and return the full URL.
pub async fn mount_status(server: &MockServer, route: &str, status: u16) -> String {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
    format!("{}{}", server.uri(), route)
}

/// HTTP fetcher with default settings.
pub fn http_fetcher() -> RssFetcher {
    RssFetcher::new(&FetcherConfig::default()).unwrap()
}

/// Fetcher that always fails and records the URLs it was asked for.
#[derive(Default)]
pub struct FailingFetcher {
    calls: AtomicUsize,
    urls: Mutex<Vec<String>>,
}

impl FailingFetcher {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Requested URLs in call order.
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentFetcher for FailingFetcher {
    async fn fetch(&self, url: &str) -> Result<ParsedFeed, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(url.to_string());
        Err(FetchError::Transport("connection refused".to_string()))
    }
}

/// Open a fresh in-memory database.
#[cfg(feature = "sqlite")]
pub async fn setup_db() -> Database {
    Database::open_in_memory().await.unwrap()
}

/// Create a user.
#[cfg(feature = "sqlite")]
pub async fn create_user(db: &Database, name: &str) -> User {
    UserRepository::new(db.pool())
        .create(&NewUser::new(name))
        .await
        .unwrap()
}

/// Create a feed owned by `user`.
#[cfg(feature = "sqlite")]
pub async fn create_feed(db: &Database, user: &User, name: &str, url: &str) -> Feed {
    FeedRepository::new(db.pool())
        .create(&NewFeed::new(name, url, user.id))
        .await
        .unwrap()
}
