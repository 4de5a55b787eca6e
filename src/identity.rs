//! URL canonicalization and content-addressed item identity.
//!
//! [`normalize_url`] produces the dedup key the store indexes on;
//! [`item_uuid`] derives the id used both as the row identity and as the
//! correlation id in the run log. Both are pure functions.

use sha2::{Digest, Sha256};
use url::Url;

/// Number of hex characters kept from the digest. Collisions across the
/// item table are possible and accepted.
const ID_HEX_CHARS: usize = 8;

/// Force an `https://` scheme onto a URL-ish string.
pub fn ensure_https(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() {
        return String::new();
    }
    if starts_with_ignore_case(url, "https://") {
        return format!("https://{}", &url[8..]);
    }
    if starts_with_ignore_case(url, "http://") {
        return format!("https://{}", &url[7..]);
    }
    format!("https://{url}")
}

/// Canonicalize a URL for de-duplication.
///
/// Forces an `https://` scheme (see [`ensure_https`]), strips the fragment,
/// and drops `utm_*`, `fbclid` and `gclid` query parameters while keeping the
/// rest in their original order and spelling. Blank input stays blank.
/// Idempotent.
pub fn normalize_url(raw: &str) -> String {
    let mut url = ensure_https(raw);
    if let Some(idx) = url.find('#') {
        url.truncate(idx);
    }

    let Some((base, query)) = url.split_once('?') else {
        return url;
    };
    let kept: Vec<&str> = query
        .split('&')
        .filter(|kv| !is_tracking_param(kv))
        .collect();
    if kept.is_empty() {
        base.to_string()
    } else {
        format!("{}?{}", base, kept.join("&"))
    }
}

fn is_tracking_param(kv: &str) -> bool {
    let key = kv.split('=').next().unwrap_or_default().to_lowercase();
    key.starts_with("utm_") || key == "fbclid" || key == "gclid"
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Stable identifier for a normalized URL: `ITEM_` plus a truncated SHA-256.
pub fn item_uuid(normalized_url: &str) -> String {
    let digest = Sha256::digest(normalized_url.as_bytes());
    let hex = format!("{digest:x}");
    format!("ITEM_{}", &hex[..ID_HEX_CHARS])
}

/// Lowercased host of an absolute http(s) URL, or `None`.
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .and_then(|u| u.host_str().map(str::to_lowercase))
}
