//! Date/time utilities for Gator.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, SubsecRound, Utc};

/// Layout of an RSS `pubDate` with a numeric zone offset
/// (`Mon, 02 Jan 2006 15:04:05 -0700`).
pub const RFC1123Z_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// `RFC1123Z_FORMAT` after the weekday.
const RFC1123Z_DATE_FORMAT: &str = "%d %b %Y %H:%M:%S %z";

/// Format a timestamp for storage.
///
/// Every stored timestamp uses the same fixed-width UTC form, so ordering the
/// text column orders the instants.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The current time at storage precision.
///
/// Values built from this compare equal to what is read back.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Parse a stored timestamp.
///
/// Accepts RFC3339 and the bare `YYYY-MM-DD HH:MM:SS` form (assumed UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

/// Parse a feed item's publication date.
///
/// Only the RFC1123 layout with a numeric offset is accepted. Anything else,
/// including a missing date, yields `None`. The weekday name must be present
/// but is not checked against the date.
pub fn parse_pub_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let (weekday, rest) = raw?.trim().split_once(", ")?;
    if weekday.len() != 3 || !weekday.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    DateTime::parse_from_str(rest.trim(), RFC1123Z_DATE_FORMAT)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Render an instant in the RFC1123 numeric-offset layout.
pub fn format_pub_date(dt: &DateTime<Utc>) -> String {
    dt.format(RFC1123Z_FORMAT).to_string()
}
