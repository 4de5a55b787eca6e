//! Best-effort publish-date parsing.
//!
//! Feeds and pages express dates in many shapes. [`parse_date`] tries the
//! common ones and returns `None` rather than failing; callers decide what an
//! unknown date means for them.

use crate::utils::head_chars;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// How much of a rendered page is scanned for a publish date.
pub const DATE_SCAN_CHARS: usize = 2000;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y.%m.%d",
    "%b %d, %Y",
    "%b %d %Y",
    "%B %d, %Y",
    "%B %d %Y",
];

static LABELED_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:Published|Date|작성일|배포일)[:\-\s]*([0-9]{4}[.\-][0-9]{2}[.\-][0-9]{2}|[A-Z][a-z]{2}\s\d{1,2},?\s\d{4})",
    )
    .unwrap()
});

static BARE_ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(20[2-9][0-9][.\-][0-1][0-9][.\-][0-3][0-9])\b").unwrap());

/// Parse a date string into a zone-aware timestamp.
///
/// Values without an offset are taken as UTC; date-only values land on
/// midnight UTC.
pub fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(n) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(n.and_utc().fixed_offset());
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d
                .and_hms_opt(0, 0, 0)
                .map(|n| n.and_utc().fixed_offset());
        }
    }
    None
}

/// Look for a publish date near the top of a rendered page.
///
/// Labeled dates ("Published: 2025-05-01", "Date Oct 12, 2023") win over a
/// bare ISO-looking date. Only the first [`DATE_SCAN_CHARS`] characters are
/// inspected. Never fails: no recognizable date is `None`.
pub fn extract_date_from_text(text: &str) -> Option<DateTime<FixedOffset>> {
    let head = head_chars(text, DATE_SCAN_CHARS);
    let found = LABELED_DATE
        .captures(head)
        .or_else(|| BARE_ISO_DATE.captures(head))
        .and_then(|c| c.get(1))?;
    parse_date(found.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn parses_rfc2822_and_rfc3339() {
        let a = parse_date("Fri, 02 May 2025 07:00:00 GMT").unwrap();
        let b = parse_date("2025-05-02T16:00:00+09:00").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn naive_values_are_utc() {
        let d = parse_date("2025-05-02 07:00:00").unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2025, 5, 2, 7, 0, 0).unwrap());
        let d = parse_date("2025.05.02").unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2025, 5, 2, 0, 0, 0).unwrap());
        let d = parse_date("Oct 12, 2023").unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2023, 10, 12, 0, 0, 0).unwrap());
    }

    #[test]
    fn garbage_and_empty_are_none() {
        assert!(parse_date("").is_none());
        assert!(parse_date("yesterday-ish").is_none());
    }

    #[test]
    fn labeled_date_is_preferred_over_bare_date() {
        let text = "See also 2024-01-01 archive\nPublished: 2025-05-01\nBody";
        let d = extract_date_from_text(text).unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn korean_label_is_recognized() {
        let d = extract_date_from_text("공지사항\n작성일 2025.04.30\n본문").unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2025, 4, 30, 0, 0, 0).unwrap());
    }

    #[test]
    fn bare_date_outside_leading_slice_is_ignored() {
        let text = format!("{}\n2025-05-01", "x".repeat(DATE_SCAN_CHARS + 10));
        assert!(extract_date_from_text(&text).is_none());
    }

    #[test]
    fn no_date_is_none() {
        assert!(extract_date_from_text("# Title\n\nNo dates here at all.").is_none());
    }
}
