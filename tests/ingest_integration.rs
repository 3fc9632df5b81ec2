//! Integration tests for feed ingestion.
//!
//! These run the ingestor against an in-memory SQLite database and feeds
//! served over HTTP by a mock server.

#![cfg(feature = "sqlite")]

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use wiremock::MockServer;

use common::{
    capture_logs, capture_logs_at, create_feed, create_user, http_fetcher, mount_feed, mount_status, rss_document,
    setup_db, Item,
};
use gator::commands::{self, State};
use gator::feed::{FeedRepository, PostRepository};
use gator::{Config, GatorError, Ingestor, SqlFeedStore, TickOutcome};

fn ingestor(db: &gator::Database) -> Ingestor {
    Ingestor::new(
        Arc::new(SqlFeedStore::new(db.clone())),
        Arc::new(http_fetcher()),
    )
}

fn sample_items() -> Vec<Item<'static>> {
    vec![
        Item::new("First", "https://blog.example/first")
            .description("Hello")
            .pub_date("Mon, 02 Jan 2006 15:04:05 -0700"),
        Item::new("Second", "https://blog.example/second")
            .pub_date("Tue, 03 Jan 2006 10:00:00 +0000"),
        Item::new("Third", "https://blog.example/third"),
    ]
}

#[tokio::test]
async fn test_repeated_polls_insert_each_url_once() {
    let server = MockServer::start().await;
    let url = mount_feed(&server, "/feed.xml", rss_document("Blog", &sample_items())).await;
    let db = setup_db().await;
    let user = create_user(&db, "kahya").await;
    let feed = create_feed(&db, &user, "Blog", &url).await;
    let ingestor = ingestor(&db);
    let posts = PostRepository::new(db.pool());

    let TickOutcome::Refreshed(first) = ingestor.refresh_next().await.unwrap() else {
        panic!("expected a refresh");
    };
    assert_eq!(first.feed_id, feed.id);
    assert_eq!(first.channel_title, "Blog");
    assert_eq!(first.inserted, 3);
    let after_first = posts.count().await.unwrap();

    for _ in 0..5 {
        let TickOutcome::Refreshed(summary) = ingestor.refresh_next().await.unwrap() else {
            panic!("expected a refresh");
        };
        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.duplicates, 3);
    }

    assert_eq!(after_first, 3);
    assert_eq!(posts.count().await.unwrap(), after_first);
}

#[tokio::test]
async fn test_selection_prefers_never_fetched_then_oldest() {
    let server = MockServer::start().await;
    let body = rss_document("Empty", &[]);
    let url1 = mount_feed(&server, "/f1.xml", body.clone()).await;
    let url2 = mount_feed(&server, "/f2.xml", body.clone()).await;
    let url3 = mount_feed(&server, "/f3.xml", body).await;

    let db = setup_db().await;
    let user = create_user(&db, "kahya").await;
    let feeds = FeedRepository::new(db.pool());
    let now = Utc::now();

    let f3 = create_feed(&db, &user, "F3", &url3).await;
    let f2 = create_feed(&db, &user, "F2", &url2).await;
    let f1 = create_feed(&db, &user, "F1", &url1).await;
    feeds
        .mark_fetched(f2.id, now - ChronoDuration::minutes(10))
        .await
        .unwrap();
    feeds
        .mark_fetched(f3.id, now - ChronoDuration::minutes(1))
        .await
        .unwrap();

    let ingestor = ingestor(&db);
    let mut order = Vec::new();
    for _ in 0..3 {
        let TickOutcome::Refreshed(summary) = ingestor.refresh_next().await.unwrap() else {
            panic!("expected a refresh");
        };
        order.push(summary.feed_id);
    }

    assert_eq!(order, vec![f1.id, f2.id, f3.id]);
}

#[tokio::test]
async fn test_fetch_failure_still_advances_rotation() {
    let server = MockServer::start().await;
    let broken = mount_status(&server, "/broken.xml", 500).await;
    let healthy = mount_feed(&server, "/healthy.xml", rss_document("Ok", &sample_items())).await;

    let db = setup_db().await;
    let user = create_user(&db, "kahya").await;
    let broken_feed = create_feed(&db, &user, "Broken", &broken).await;
    let healthy_feed = create_feed(&db, &user, "Healthy", &healthy).await;
    let feeds = FeedRepository::new(db.pool());
    feeds
        .mark_fetched(healthy_feed.id, Utc::now() - ChronoDuration::hours(1))
        .await
        .unwrap();
    let ingestor = ingestor(&db);

    let result = ingestor.refresh_next().await;
    assert!(matches!(result, Err(GatorError::Fetch(_))));

    let claimed = feeds.get_by_id(broken_feed.id).await.unwrap().unwrap();
    assert!(claimed.last_fetched_at.is_some());

    let TickOutcome::Refreshed(summary) = ingestor.refresh_next().await.unwrap() else {
        panic!("expected a refresh");
    };
    assert_eq!(summary.feed_id, healthy_feed.id);
    assert_eq!(summary.inserted, 3);
}

#[tokio::test]
async fn test_unparseable_dates_are_stored_as_absent() {
    let server = MockServer::start().await;
    let items = vec![
        Item::new("Named zone", "https://dates.example/gmt")
            .pub_date("Mon, 02 Jan 2006 15:04:05 GMT"),
        Item::new("Garbage", "https://dates.example/garbage").pub_date("last tuesday"),
        Item::new("Missing", "https://dates.example/missing"),
        Item::new("Good", "https://dates.example/good").pub_date("Wed, 03 Aug 2022 12:00:17 +0200"),
    ];
    let url = mount_feed(&server, "/dates.xml", rss_document("Dates", &items)).await;

    let db = setup_db().await;
    let user = create_user(&db, "kahya").await;
    create_feed(&db, &user, "Dates", &url).await;

    let TickOutcome::Refreshed(summary) = ingestor(&db).refresh_next().await.unwrap() else {
        panic!("expected a refresh");
    };
    assert_eq!(summary.inserted, 4);
    assert_eq!(summary.failed, 0);

    let posts = PostRepository::new(db.pool());
    for url in [
        "https://dates.example/gmt",
        "https://dates.example/garbage",
        "https://dates.example/missing",
    ] {
        let post = posts.get_by_url(url).await.unwrap().unwrap();
        assert_eq!(post.published_at, None, "{url}");
    }
    let good = posts
        .get_by_url("https://dates.example/good")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        good.published_at,
        Some(Utc.with_ymd_and_hms(2022, 8, 3, 10, 0, 17).unwrap())
    );
}

#[tokio::test]
async fn test_description_absent_versus_present() {
    let server = MockServer::start().await;
    let items = vec![
        Item::new("With", "https://desc.example/with").description("Some text"),
        Item::new("Without", "https://desc.example/without"),
    ];
    let url = mount_feed(&server, "/desc.xml", rss_document("Desc", &items)).await;

    let db = setup_db().await;
    let user = create_user(&db, "kahya").await;
    create_feed(&db, &user, "Desc", &url).await;
    ingestor(&db).refresh_next().await.unwrap();

    let posts = PostRepository::new(db.pool());
    let with = posts
        .get_by_url("https://desc.example/with")
        .await
        .unwrap()
        .unwrap();
    let without = posts
        .get_by_url("https://desc.example/without")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(with.description.as_deref(), Some("Some text"));
    assert_eq!(without.description, None);
}

#[tokio::test]
async fn test_shared_item_url_stored_once_across_feeds() {
    let server = MockServer::start().await;
    let shared = vec![Item::new("Shared", "https://shared.example/post")];
    let url_a = mount_feed(&server, "/a.xml", rss_document("A", &shared)).await;
    let url_b = mount_feed(&server, "/b.xml", rss_document("B", &shared)).await;

    let db = setup_db().await;
    let user = create_user(&db, "kahya").await;
    create_feed(&db, &user, "A", &url_a).await;
    create_feed(&db, &user, "B", &url_b).await;
    let ingestor = ingestor(&db);

    ingestor.refresh_next().await.unwrap();
    let TickOutcome::Refreshed(second) = ingestor.refresh_next().await.unwrap() else {
        panic!("expected a refresh");
    };

    assert_eq!(second.duplicates, 1);
    assert_eq!(PostRepository::new(db.pool()).count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_duplicates_are_not_logged_as_errors() {
    let (logs, _guard) = capture_logs();

    let server = MockServer::start().await;
    let url = mount_feed(&server, "/feed.xml", rss_document("Blog", &sample_items())).await;
    let db = setup_db().await;
    let user = create_user(&db, "kahya").await;
    create_feed(&db, &user, "Blog", &url).await;
    let ingestor = ingestor(&db);

    ingestor.tick().await.unwrap();
    ingestor.tick().await.unwrap();

    let output = logs.contents();
    assert!(output.contains("already stored"), "{output}");
    assert!(!output.contains("ERROR"), "{output}");
    assert!(!output.contains("WARN"), "{output}");
}

#[tokio::test]
async fn test_fetch_failure_log_names_the_feed() {
    let (logs, _guard) = capture_logs_at("gator=info");

    let server = MockServer::start().await;
    let broken = mount_status(&server, "/broken.xml", 502).await;
    let db = setup_db().await;
    let user = create_user(&db, "kahya").await;
    let feed = create_feed(&db, &user, "Broken", &broken).await;

    assert_eq!(ingestor(&db).tick().await, None);

    let output = logs.contents();
    let line = output
        .lines()
        .find(|line| line.contains("ERROR"))
        .unwrap_or_else(|| panic!("no error logged: {output}"));
    assert!(line.contains(&broken), "{output}");
    assert!(line.contains(&feed.id.to_string()), "{output}");
    assert!(line.contains("HTTP status 502"), "{output}");
}

#[tokio::test]
async fn test_idle_when_no_feeds() {
    let db = setup_db().await;
    assert_eq!(ingestor(&db).refresh_next().await.unwrap(), TickOutcome::Idle);
}

#[tokio::test]
async fn test_agg_command_collects_posts_for_browse() {
    let server = MockServer::start().await;
    let url = mount_feed(&server, "/feed.xml", rss_document("Blog", &sample_items())).await;

    let dir = tempfile::tempdir().unwrap();
    let db = setup_db().await;
    let mut state = State::new(db, Config::default(), dir.path().join("gator.toml"));

    commands::register(&mut state, "kahya", &mut Vec::new())
        .await
        .unwrap();
    commands::add_feed(&state, "Blog", &url, &mut Vec::new())
        .await
        .unwrap();

    commands::agg(&state, "1h", tokio::time::sleep(Duration::from_millis(300)))
        .await
        .unwrap();

    let mut out = Vec::new();
    commands::browse(&state, 10, &mut out).await.unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.contains("* Second (https://blog.example/second)"), "{text}");
    assert!(text.contains("* First (https://blog.example/first)"), "{text}");
    assert!(text.contains("* Third (https://blog.example/third)"), "{text}");
    let second = text.find("Second").unwrap();
    let first = text.find("First").unwrap();
    let third = text.find("Third").unwrap();
    assert!(second < first && first < third, "{text}");
}
