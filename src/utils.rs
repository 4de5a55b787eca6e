//! Small string and filesystem helpers used across the pipeline.
//!
//! - Character-safe truncation for logging and length caps
//! - Title recovery from rendered markdown
//! - Output directory validation

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Longest title recovered from a plain first line.
const FALLBACK_TITLE_CHARS: usize = 140;

static ATX_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^#\s+(.+)$").unwrap());
static SETEXT_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(.+)\n[=\-]{3,}\s*$").unwrap());
static BARE_MD_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\[.*\]\(.*\)$").unwrap());
static LEADING_HASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#+\s*").unwrap());

/// The first `max` characters of `s`, never splitting a code point.
pub fn head_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Character count, the unit every length limit in the pipeline uses.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and the number
/// of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let head = head_chars(s, max);
    if head.len() == s.len() {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", head, s.len() - head.len())
    }
}

/// Recover a title from rendered markdown.
///
/// Tries an ATX `# Heading`, then a Setext heading, then the first plain line
/// that is neither a warning nor a bare link.
pub fn extract_title_from_md(md: &str) -> Option<String> {
    let not_warning = |t: &str| !t.to_lowercase().starts_with("warning: target url returned");

    for re in [&*ATX_HEADING, &*SETEXT_HEADING] {
        if let Some(m) = re.captures(md).and_then(|c| c.get(1)) {
            let t = m.as_str().trim();
            if !t.is_empty() && not_warning(t) {
                return Some(t.to_string());
            }
        }
    }

    md.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| !l.to_lowercase().starts_with("warning:"))
        .filter(|l| !BARE_MD_LINK.is_match(l))
        .map(|l| LEADING_HASHES.replace(l, "").trim().to_string())
        .find(|l| !l.is_empty())
        .map(|l| head_chars(&l, FALLBACK_TITLE_CHARS).to_string())
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then writes and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error + Send + Sync>> {
    fs::create_dir_all(path).await?;
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn truncate_for_log_respects_multibyte_boundaries() {
        let s = "한국어 본문".repeat(10);
        let result = truncate_for_log(&s, 3);
        assert!(result.starts_with("한국어"));
    }

    #[test]
    fn head_chars_counts_characters() {
        assert_eq!(head_chars("작성일 2025", 3), "작성일");
        assert_eq!(head_chars("abc", 10), "abc");
    }

    #[test]
    fn title_prefers_atx_heading() {
        let md = "Title: ignored\n\n# Real Heading\n\nBody";
        assert_eq!(extract_title_from_md(md).as_deref(), Some("Real Heading"));
    }

    #[test]
    fn title_falls_back_to_setext_heading() {
        let md = "Setext Title\n=====\n\nBody";
        assert_eq!(extract_title_from_md(md).as_deref(), Some("Setext Title"));
    }

    #[test]
    fn title_skips_warnings_and_bare_links() {
        let md = "Warning: Target URL returned error 403\n[Home](https://x.com)\nActual first line";
        assert_eq!(extract_title_from_md(md).as_deref(), Some("Actual first line"));
    }

    #[test]
    fn title_of_blank_text_is_none() {
        assert_eq!(extract_title_from_md("\n\n  \n"), None);
    }
}
