//! Date header parsing.
//!
//! Accepts RFC 2822 date-times plus the common non-conforming shapes:
//! missing seconds, missing weekday, named timezones, trailing zone
//! comments. A date that still does not parse yields `None`; a bad date
//! must never fail the message it arrived in.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Fallback formats tried after strict RFC 2822, with a numeric zone.
const ZONED_FORMATS: &[&str] = &[
    "%a, %d %b %Y %H:%M:%S %z",
    "%a, %d %b %Y %H:%M %z",
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
];

/// Formats without any zone; UTC is assumed.
const NAIVE_FORMATS: &[&str] = &[
    "%a, %d %b %Y %H:%M:%S",
    "%a, %d %b %Y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Obsolete named zones from RFC 2822 §4.3, mapped to numeric offsets.
const NAMED_ZONES: &[(&str, &str)] = &[
    ("UT", "+0000"),
    ("GMT", "+0000"),
    ("UTC", "+0000"),
    ("EST", "-0500"),
    ("EDT", "-0400"),
    ("CST", "-0600"),
    ("CDT", "-0500"),
    ("MST", "-0700"),
    ("MDT", "-0600"),
    ("PST", "-0800"),
    ("PDT", "-0700"),
];

/// Parses a Date header value.
///
/// Returns `None` when no accepted form matches.
#[must_use]
pub fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let cleaned = clean(value);
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(&cleaned) {
        return Some(dt);
    }

    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&cleaned, format) {
            return Some(dt);
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&cleaned, format) {
            return Some(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }

    None
}

/// Strips trailing comments, collapses whitespace, and rewrites named
/// zones to their numeric offsets.
fn clean(value: &str) -> String {
    let mut s = value.trim().to_string();

    // Trailing zone comment: "... +0100 (CET)"
    if let Some(open) = s.find('(') {
        s.truncate(open);
    }

    let mut words: Vec<String> = s.split_whitespace().map(str::to_string).collect();

    if let Some(last) = words.last_mut() {
        let upper = last.to_ascii_uppercase();
        if let Some((_, offset)) = NAMED_ZONES.iter().find(|(name, _)| *name == upper) {
            *last = (*offset).to_string();
        }
    }

    words.join(" ")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_rfc2822() {
        let dt = parse_date("Tue, 1 Jul 2003 10:52:37 +0200").unwrap();
        assert_eq!(dt.to_rfc2822(), "Tue, 1 Jul 2003 10:52:37 +0200");
    }

    #[test]
    fn test_missing_weekday() {
        let dt = parse_date("1 Jul 2003 10:52:37 +0200").unwrap();
        assert_eq!(dt.timestamp(), 1057049557);
    }

    #[test]
    fn test_missing_seconds() {
        let dt = parse_date("Tue, 1 Jul 2003 10:52 +0200").unwrap();
        assert_eq!(dt.format("%H:%M:%S").to_string(), "10:52:00");
    }

    #[test]
    fn test_named_zone() {
        let dt = parse_date("Mon, 3 Jan 2022 09:00:00 EST").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), -5 * 3600);
    }

    #[test]
    fn test_zone_comment() {
        let dt = parse_date("Sat, 2 Mar 2024 18:00:00 +0100 (CET)").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn test_no_zone_assumes_utc() {
        let dt = parse_date("Tue, 1 Jul 2003 10:52:37").unwrap();
        assert_eq!(dt.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_unparseable_returns_none() {
        assert!(parse_date("not a date").is_none());
        assert!(parse_date("").is_none());
        assert!(parse_date("32 Foo 2024 99:99:99 +0000").is_none());
    }
}
