//! Markup stripping for feed bodies that arrive as HTML.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Reduce an HTML fragment to its visible text.
///
/// Script and style contents are dropped, entities are decoded by the HTML
/// parser, and runs of whitespace collapse to a single space.
pub fn strip_html(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len() / 2);
    for node in fragment.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element().map(|e| e.name().to_ascii_lowercase()))
            .is_some_and(|name| name == "script" || name == "style");
        if hidden {
            continue;
        }
        out.push_str(text);
        out.push(' ');
    }
    WHITESPACE.replace_all(&out, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_decodes_entities() {
        let html = "<p>Fish &amp; chips&nbsp;are <b>great</b></p><p>&lt;tag&gt; &#39;q&#39; &quot;d&quot;</p>";
        assert_eq!(strip_html(html), "Fish & chips are great <tag> 'q' \"d\"");
    }

    #[test]
    fn drops_script_and_style_bodies() {
        let html = "<style>p{color:red}</style><p>Visible</p><script>alert(1)</script>";
        assert_eq!(strip_html(html), "Visible");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(strip_html("  just   text \n here "), "just text here");
        assert_eq!(strip_html(""), "");
    }
}
