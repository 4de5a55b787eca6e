//! Minimal syndication feed reader for RSS 2.0, RSS 1.0 (RDF) and Atom.
//!
//! Only the fields the harvester needs are extracted: link/id, title,
//! published/updated dates and the body candidates. Markup inside bodies is
//! kept verbatim for later stripping.

use crate::error::FeedError;
use crate::identity::host_of;
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use std::borrow::Cow;

/// One `<item>` or `<entry>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    pub link: Option<String>,
    pub id: Option<String>,
    pub title: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
}

impl FeedEntry {
    /// The entry's URL: its link, falling back to its id/guid. Only absolute
    /// http(s) URLs qualify; opaque guids and relative links yield `None`.
    pub fn resolved_link(&self) -> Option<&str> {
        [&self.link, &self.id]
            .into_iter()
            .filter_map(|f| f.as_deref())
            .map(str::trim)
            .find(|u| host_of(u).is_some())
    }

    /// Raw publish date: published/pubDate/dc:date, else updated.
    pub fn raw_date(&self) -> &str {
        self.published
            .as_deref()
            .or(self.updated.as_deref())
            .unwrap_or_default()
    }

    /// Body markup: full content, else summary, else description.
    pub fn body(&self) -> &str {
        [&self.content, &self.summary, &self.description]
            .into_iter()
            .find_map(|f| f.as_deref())
            .unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Link,
    Id,
    Title,
    Published,
    Updated,
    Content,
    Summary,
    Description,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "link" => Self::Link,
            "guid" | "id" => Self::Id,
            "title" => Self::Title,
            "pubdate" | "published" | "dc:date" | "issued" => Self::Published,
            "updated" | "modified" => Self::Updated,
            "content:encoded" | "content" => Self::Content,
            "summary" => Self::Summary,
            "description" => Self::Description,
            _ => return None,
        })
    }

    fn slot<'a>(&self, entry: &'a mut FeedEntry) -> &'a mut Option<String> {
        match self {
            Self::Link => &mut entry.link,
            Self::Id => &mut entry.id,
            Self::Title => &mut entry.title,
            Self::Published => &mut entry.published,
            Self::Updated => &mut entry.updated,
            Self::Content => &mut entry.content,
            Self::Summary => &mut entry.summary,
            Self::Description => &mut entry.description,
        }
    }
}

/// A field being collected: which one, at what depth, text so far.
struct Capture {
    field: Field,
    depth: usize,
    text: String,
}

/// Partially built entry plus the Atom link preference state.
struct OpenEntry {
    entry: FeedEntry,
    depth: usize,
    has_alternate_link: bool,
}

fn qname(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_lowercase()
}

fn attr(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref().eq_ignore_ascii_case(key.as_bytes()))
        .map(|a| unescape_lossy(&String::from_utf8_lossy(&a.value)).into_owned())
}

fn unescape_lossy(raw: &str) -> Cow<'_, str> {
    if !raw.contains('&') {
        return Cow::Borrowed(raw);
    }
    unescape(raw).unwrap_or(Cow::Borrowed(raw))
}

fn resolve_reference(name: &str) -> String {
    if let Some(num) = name.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => num.parse::<u32>().ok(),
        };
        if let Some(c) = code.and_then(char::from_u32) {
            return c.to_string();
        }
    }
    match name {
        "amp" => "&".to_string(),
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "quot" => "\"".to_string(),
        "apos" => "'".to_string(),
        other => format!("&{other};"),
    }
}

/// Handle an Atom `<link href=.. rel=..>`; returns `false` for RSS text links.
fn take_atom_link(open: &mut OpenEntry, e: &BytesStart<'_>) -> bool {
    let Some(href) = attr(e, "href") else {
        return false;
    };
    let is_alternate = attr(e, "rel").is_none_or(|r| r.eq_ignore_ascii_case("alternate"));
    if is_alternate && !open.has_alternate_link {
        open.entry.link = Some(href);
        open.has_alternate_link = true;
    } else if open.entry.link.is_none() {
        open.entry.link = Some(href);
    }
    true
}

/// Parse a feed document into its entries, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, FeedError> {
    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();
    let mut depth = 0usize;
    let mut open: Option<OpenEntry> = None;
    let mut capture: Option<Capture> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                return Err(FeedError::Xml {
                    position: reader.error_position() as u64,
                    message: e.to_string(),
                });
            }
        };
        match event {
            Event::Start(e) => {
                depth += 1;
                if capture.is_some() {
                    continue;
                }
                let name = qname(&e);
                if open.is_none() {
                    if name == "item" || name == "entry" {
                        open = Some(OpenEntry {
                            entry: FeedEntry::default(),
                            depth,
                            has_alternate_link: false,
                        });
                    }
                    continue;
                }
                let Some(o) = open.as_mut() else { continue };
                if name == "link" && take_atom_link(o, &e) {
                    continue;
                }
                if let Some(field) = Field::from_name(&name) {
                    capture = Some(Capture {
                        field,
                        depth,
                        text: String::new(),
                    });
                }
            }
            Event::Empty(e) => {
                if capture.is_none() && qname(&e) == "link" {
                    if let Some(o) = open.as_mut() {
                        take_atom_link(o, &e);
                    }
                }
            }
            Event::End(_) => {
                if capture.as_ref().is_some_and(|c| c.depth == depth) {
                    if let (Some(c), Some(o)) = (capture.take(), open.as_mut()) {
                        let value = c.text.trim();
                        let slot = c.field.slot(&mut o.entry);
                        if !value.is_empty() && slot.is_none() {
                            *slot = Some(value.to_string());
                        }
                    }
                } else if capture.is_none() && open.as_ref().is_some_and(|o| o.depth == depth) {
                    if let Some(o) = open.take() {
                        entries.push(o.entry);
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(t) => {
                if let Some(c) = capture.as_mut() {
                    c.text.push_str(&unescape_lossy(&String::from_utf8_lossy(&t)));
                }
            }
            Event::CData(t) => {
                if let Some(c) = capture.as_mut() {
                    c.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::GeneralRef(r) => {
                if let Some(c) = capture.as_mut() {
                    c.text.push_str(&resolve_reference(&String::from_utf8_lossy(&r)));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}
