//! Lenient parsing for the date strings the row decoder produces.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Formats the date annotation decoder emits, tried in order.
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S"];

/// Parses a decoded date string into a UTC timestamp.
///
/// Accepts `YYYY-MM-DD HH:MM[:SS]`, a bare `YYYY-MM-DD` (midnight), or a
/// full RFC 3339 timestamp. Anything else — including the empty string —
/// yields `None`; an unmapped or unparseable `updated` column is not an
/// error, the entry just falls back to generation time.
pub fn parse_flexible(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(naive.and_utc());
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }

    DateTime::parse_from_rfc3339(input)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
