//! Two-hop harvesting of list pages: render the list, pick article links,
//! render each article.

use super::{HarvestContext, ItemOutcome, SourceOutcome, SourceReport, resolve_title};
use crate::config::ListRule;
use crate::dates::extract_date_from_text;
use crate::error::SourceError;
use crate::identity::{host_of, normalize_url};
use crate::links::extract_links;
use crate::models::{ActionType, Candidate, LogEntry, LogStatus, RawMeta, SourceConfig};
use crate::utils::truncate_for_log;
use crate::window::TimeWindow;
use futures::{StreamExt, stream};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use tracing::{debug, info};

static ASSET_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(?:jpg|jpeg|png|gif|webp|svg|css|js|pdf)(?:\?|#|$)").unwrap()
});
static NAV_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)/(?:tag|tags|category|categories|author|about|privacy|terms|login|subscribe)\b")
        .unwrap()
});

/// A [`ListRule`] with its patterns compiled (case-insensitive).
#[derive(Debug, Clone)]
pub struct CompiledListRule {
    pub host: Option<String>,
    allow: Vec<Regex>,
    deny: Vec<Regex>,
}

impl CompiledListRule {
    pub fn compile(rule: &ListRule) -> Result<Self, regex::Error> {
        let build = |patterns: &[String]| -> Result<Vec<Regex>, regex::Error> {
            patterns
                .iter()
                .map(|p| RegexBuilder::new(p).case_insensitive(true).build())
                .collect()
        };
        Ok(Self {
            host: rule
                .host
                .as_deref()
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_lowercase),
            allow: build(&rule.allow)?,
            deny: build(&rule.deny)?,
        })
    }

    fn denies(&self, url: &str) -> bool {
        self.deny.iter().any(|re| re.is_match(url))
    }

    fn allows(&self, url: &str) -> bool {
        self.allow.is_empty() || self.allow.iter().any(|re| re.is_match(url))
    }
}

/// Source id → compiled rule.
#[derive(Debug, Clone, Default)]
pub struct ListRules {
    rules: HashMap<String, CompiledListRule>,
}

impl ListRules {
    pub fn compile(rules: &HashMap<String, ListRule>) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|(id, rule)| Ok((id.clone(), CompiledListRule::compile(rule)?)))
            .collect::<Result<_, regex::Error>>()?;
        Ok(Self { rules })
    }

    pub fn get(&self, source_id: &str) -> Option<&CompiledListRule> {
        self.rules.get(source_id)
    }
}

/// Narrow a list page's links down to article candidates.
///
/// A candidate survives when it is not a static asset, its host equals the
/// rule's host (or the list page's host when the rule names none), it has no
/// navigation path segment, no deny pattern matches and, if the rule has
/// allow patterns, one of them matches. Survivors are deduplicated and capped
/// at `max_items`.
pub fn filter_candidates(
    list_url: &str,
    links: Vec<Candidate>,
    rule: Option<&CompiledListRule>,
    max_items: usize,
) -> Vec<Candidate> {
    let expected_host = rule
        .and_then(|r| r.host.clone())
        .or_else(|| host_of(list_url));

    links
        .into_iter()
        .filter(|c| !ASSET_EXTENSION.is_match(&c.url))
        .filter(|c| host_of(&c.url).is_some() && host_of(&c.url) == expected_host)
        .filter(|c| !NAV_SEGMENT.is_match(&c.url))
        .filter(|c| rule.is_none_or(|r| !r.denies(&c.url) && r.allows(&c.url)))
        .unique_by(|c| c.url.clone())
        .take(max_items)
        .collect()
}

pub(crate) async fn harvest(
    ctx: &HarvestContext,
    source: &SourceConfig,
    window: &TimeWindow,
) -> Result<SourceOutcome, SourceError> {
    let list_url = ctx.source_url(source);

    let list_md = match ctx.extraction.read_list_page(&list_url).await {
        Ok(md) => md,
        Err(e) => {
            ctx.log(LogEntry::new(
                ActionType::ListReadFail,
                &source.source_id,
                LogStatus::Fail,
                format!("{list_url} | {e}"),
            ))
            .await;
            return Ok(SourceOutcome::Ended);
        }
    };

    debug!(preview = %truncate_for_log(&list_md, 200), "Rendered list page");
    let links = extract_links(&list_md);
    let found = links.len();
    let candidates = filter_candidates(
        &list_url,
        links,
        ctx.list_rules.get(&source.source_id),
        source.max_items(),
    );
    info!(found, kept = candidates.len(), "Filtered list page links");

    if candidates.is_empty() {
        ctx.log(LogEntry::new(
            ActionType::ListNoCandidate,
            &source.source_id,
            LogStatus::Skip,
            format!("0 candidates: {list_url}"),
        ))
        .await;
        return Ok(SourceOutcome::Ended);
    }

    let outcomes: Vec<ItemOutcome> = stream::iter(candidates)
        .map(|c| process(ctx, source, window, &list_url, c))
        .buffer_unordered(ctx.settings.render_concurrency.max(1))
        .collect()
        .await;
    Ok(SourceOutcome::Completed(SourceReport::tally(outcomes)))
}

async fn process(
    ctx: &HarvestContext,
    source: &SourceConfig,
    window: &TimeWindow,
    list_url: &str,
    candidate: Candidate,
) -> ItemOutcome {
    let url = normalize_url(&candidate.url);
    if ctx.is_known(&url) {
        debug!(%url, "Already stored");
        return ItemOutcome::Known;
    }
    let Some(markdown) = ctx.render_article(source, &url).await else {
        return ItemOutcome::Failed;
    };

    // A date found in the page must be inside the window; no date is fine.
    if let Some(published) = extract_date_from_text(&markdown) {
        if !window.contains(&published) {
            debug!(%url, %published, "Outside window");
            return ItemOutcome::Skipped;
        }
    }

    let title = resolve_title(candidate.title.as_deref(), &markdown);
    ctx.finish_item(source, &url, title, &markdown, &url, None, |_| RawMeta::CrawlList {
        list_url: list_url.to_string(),
        link: url.clone(),
    })
    .await
}
