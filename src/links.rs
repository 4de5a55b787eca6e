//! Link discovery in rendered list pages.
//!
//! The renderer returns markdown with a links summary. Candidates come from
//! markdown links `[title](url)` first, then from bare URLs anywhere in the
//! text. When the same URL is linked twice, the longer title is kept.

use crate::models::Candidate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static MD_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\((https?://[^\s<>()\]]+)[^)]*\)").unwrap());
static BARE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s<>()\]]+").unwrap());
static TRAILING_PUNCT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[),.\]]+$").unwrap());
static JUNK_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:!\[|read more|click|here|link)").unwrap());

fn trim_url(raw: &str) -> String {
    TRAILING_PUNCT.replace(raw, "").into_owned()
}

/// Every http(s) URL in `text`, with trailing punctuation removed.
pub fn extract_urls(text: &str) -> Vec<String> {
    BARE_URL
        .find_iter(text)
        .map(|m| trim_url(m.as_str()))
        .collect()
}

/// Build the ordered URL → title map of a rendered list page.
///
/// URLs appear in first-seen order; URLs only found bare carry no title.
pub fn extract_links(text: &str) -> Vec<Candidate> {
    let mut out: Vec<Candidate> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for caps in MD_LINK.captures_iter(text) {
        let title = caps[1].trim();
        let url = trim_url(&caps[2]);
        if JUNK_TITLE.is_match(title) {
            continue;
        }
        match seen.get(&url) {
            Some(&idx) => {
                let current = out[idx].title.as_deref().unwrap_or_default();
                if title.chars().count() > current.chars().count() {
                    out[idx].title = Some(title.to_string());
                }
            }
            None => {
                seen.insert(url.clone(), out.len());
                out.push(Candidate {
                    url,
                    title: Some(title.to_string()),
                });
            }
        }
    }

    for url in extract_urls(text) {
        if url.is_empty() || seen.contains_key(&url) {
            continue;
        }
        seen.insert(url.clone(), out.len());
        out.push(Candidate { url, title: None });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_links_carry_titles() {
        let md = "Links:\n[Gemma 3 release](https://deepmind.google/blog/gemma-3/)\n";
        let links = extract_links(md);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://deepmind.google/blog/gemma-3/");
        assert_eq!(links[0].title.as_deref(), Some("Gemma 3 release"));
    }

    #[test]
    fn longer_title_wins_on_collision() {
        let md = "[Post](https://a.com/p) and [The full post title](https://a.com/p)";
        let links = extract_links(md);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title.as_deref(), Some("The full post title"));
    }

    #[test]
    fn junk_titles_are_skipped_but_url_survives_bare() {
        let md = "[Read more](https://a.com/p)";
        let links = extract_links(md);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].title, None);
    }

    #[test]
    fn bare_urls_are_trimmed_of_trailing_punctuation() {
        let urls = extract_urls("see https://a.com/x), and https://b.com/y.");
        assert_eq!(urls, vec!["https://a.com/x", "https://b.com/y"]);
    }

    #[test]
    fn order_is_first_seen() {
        let md = "[One](https://a.com/1)\n[Two](https://a.com/2)\nhttps://a.com/3";
        let urls: Vec<_> = extract_links(md).into_iter().map(|c| c.url).collect();
        assert_eq!(urls, vec!["https://a.com/1", "https://a.com/2", "https://a.com/3"]);
    }
}
