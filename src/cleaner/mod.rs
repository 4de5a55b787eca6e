//! Text cleaning for rendered pages and feed bodies.
//!
//! Cleaning runs in two stages plus a final gate:
//!
//! 1. **Generic rules**: always applied. Strip the renderer's
//!    `Published Time:` header, skip links, lone nav words, icon images,
//!    cookie/privacy banners and footer lines, then collapse blank lines.
//! 2. **Per-source rules** ([`rules::CleaningRegistry`]): declarative slicing
//!    for sites whose boilerplate needs site knowledge. They see the
//!    generic-cleaned text, so their anchors must survive stage 1.
//! 3. **Gate**: cap to `Max_Length` (appending [`TRUNCATION_MARKER`]) and
//!    reject anything shorter than the minimum text length.

pub mod html;
pub mod rules;

use crate::config::TRUNCATION_MARKER;
use crate::utils::{char_len, head_chars};
use once_cell::sync::Lazy;
use regex::Regex;
use rules::{CleaningRegistry, collapse_blank_lines};

pub use html::strip_html;

static PUBLISHED_TIME_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A\s*Published Time:.*\n+").unwrap());
static SKIP_TO_CONTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\[Skip to (?:main )?content\].*\n*").unwrap());
static NAV_WORD_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?:Log ?in|Sign ?up|Subscribe|Newsletter|Menu|Search)[ \t]*$\n*").unwrap()
});
static ICON_IMAGE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^!\[Image \d+[^\]]*\]\([^)]+\)[ \t]*$\n*").unwrap());
static NAV_LINK_BULLET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\*\s+\[[^\]]{1,20}\]\(https?://[^)]+\)[ \t]*$\n*").unwrap()
});
static CONSENT_BANNER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[^\n]{0,80}(?:cookie|privacy)[^\n]{0,100}(?:accept|decline|settings|policy)[^\n]{0,120}$\n*",
    )
    .unwrap()
});
static FOOTER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^(?:Follow us|Share this|©|\(c\)|All rights reserved).*$\n*").unwrap()
});

/// Result of pushing text through the cleaning gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanOutcome {
    /// Text that may be written.
    Accepted(String),
    /// Text shorter than the minimum after cleaning; never written.
    TooShort { len: usize },
}

/// Generic cleanup, applied to every strategy's text.
pub fn clean_generic(text: &str) -> String {
    let text = PUBLISHED_TIME_HEADER.replace(text, "");
    let text = SKIP_TO_CONTENT.replace_all(&text, "");
    let text = NAV_WORD_LINE.replace_all(&text, "");
    let text = ICON_IMAGE_LINE.replace_all(&text, "");
    let text = NAV_LINK_BULLET.replace_all(&text, "");
    let text = CONSENT_BANNER.replace_all(&text, "");
    let text = FOOTER_LINE.replace_all(&text, "");
    collapse_blank_lines(&text)
}

/// Cap `text` at `max_length` characters, appending the marker when cut.
pub fn truncate_with_marker(text: &str, max_length: usize) -> String {
    let head = head_chars(text, max_length);
    if head.len() == text.len() {
        text.to_string()
    } else {
        format!("{head}{TRUNCATION_MARKER}")
    }
}

/// Cleaning pipeline shared by all strategies.
#[derive(Debug, Clone)]
pub struct ContentCleaner {
    registry: CleaningRegistry,
    min_text_len: usize,
}

impl ContentCleaner {
    pub fn new(registry: CleaningRegistry, min_text_len: usize) -> Self {
        Self {
            registry,
            min_text_len,
        }
    }

    pub fn min_text_len(&self) -> usize {
        self.min_text_len
    }

    /// Run both cleaning stages without the length gate.
    pub fn clean(&self, source_id: &str, raw: &str) -> String {
        let generic = clean_generic(raw);
        collapse_blank_lines(&self.registry.apply(source_id, &generic))
    }

    /// Apply the length cap and minimum-length gate to already-cleaned text.
    pub fn gate(&self, cleaned: &str, max_length: usize) -> CleanOutcome {
        let text = truncate_with_marker(cleaned, max_length);
        let len = char_len(&text);
        if len < self.min_text_len {
            CleanOutcome::TooShort { len }
        } else {
            CleanOutcome::Accepted(text)
        }
    }

    /// Clean and gate in one step.
    pub fn prepare(&self, source_id: &str, raw: &str, max_length: usize) -> CleanOutcome {
        self.gate(&self.clean(source_id, raw), max_length)
    }
}
