//! Maps parsed feed items to storage-ready posts.

use uuid::Uuid;

use super::types::{NewPost, ParsedItem};
use crate::datetime::parse_pub_date;

/// Turn a parsed item into a post for `feed_id`.
///
/// Title and link are copied verbatim. An empty description becomes `None`,
/// and a publication date that is missing or not in the RFC1123 numeric-offset
/// layout is recorded as absent. Returns `None` when the item has no link,
/// since the link is the deduplication key.
pub fn normalize_item(item: &ParsedItem, feed_id: Uuid) -> Option<NewPost> {
    if item.link.trim().is_empty() {
        return None;
    }

    Some(NewPost {
        title: item.title.clone(),
        url: item.link.clone(),
        description: item.description.clone().filter(|d| !d.is_empty()),
        published_at: parse_pub_date(item.published_raw.as_deref()),
        feed_id,
    })
}
