//! Feeds that only announce articles; each article is rendered separately.

use super::{HarvestContext, ItemOutcome, SourceOutcome, SourceReport, resolve_title};
use crate::dates::parse_date;
use crate::error::SourceError;
use crate::feed::parse_feed;
use crate::identity::{item_uuid, normalize_url};
use crate::models::{ActionType, Candidate, LogEntry, LogStatus, RawMeta, SourceConfig};
use crate::window::TimeWindow;
use futures::{StreamExt, stream};
use tracing::{debug, info};

pub(crate) async fn harvest(
    ctx: &HarvestContext,
    source: &SourceConfig,
    window: &TimeWindow,
) -> Result<SourceOutcome, SourceError> {
    let feed_url = ctx.source_url(source);
    let xml = ctx.fetch_document(&feed_url).await?;
    let entries = parse_feed(&xml)?;

    // Date filtering happens before any render call is spent.
    let mut candidates = Vec::new();
    for entry in &entries {
        let Some(link) = entry.resolved_link() else {
            continue;
        };
        let url = normalize_url(link);
        match parse_date(entry.raw_date()) {
            Some(published) if !window.contains(&published) => continue,
            Some(_) => {}
            None => {
                ctx.log(LogEntry::new(
                    ActionType::ItemNoDateWarn,
                    item_uuid(&url),
                    LogStatus::Warn,
                    format!("{} | Could not parse date: {}", source.source_id, entry.raw_date()),
                ))
                .await;
            }
        }
        candidates.push(Candidate {
            url,
            title: entry.title.clone(),
        });
    }
    info!(entries = entries.len(), in_window = candidates.len(), "Filtered feed entries");

    let outcomes: Vec<ItemOutcome> = stream::iter(candidates)
        .map(|c| process(ctx, source, &feed_url, c))
        .buffer_unordered(ctx.settings.render_concurrency.max(1))
        .collect()
        .await;
    Ok(SourceOutcome::Completed(SourceReport::tally(outcomes)))
}

async fn process(
    ctx: &HarvestContext,
    source: &SourceConfig,
    feed_url: &str,
    candidate: Candidate,
) -> ItemOutcome {
    let url = candidate.url;
    if ctx.is_known(&url) {
        debug!(%url, "Already stored");
        return ItemOutcome::Known;
    }
    let Some(markdown) = ctx.render_article(source, &url).await else {
        return ItemOutcome::Failed;
    };
    let label = candidate.title.clone().unwrap_or_default();
    let title = resolve_title(candidate.title.as_deref(), &markdown);
    ctx.finish_item(source, &url, title, &markdown, &label, None, |t| RawMeta::RssDeep {
        feed_url: feed_url.to_string(),
        title: t.to_string(),
        link: url.clone(),
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HarvestedItem;
    use crate::store::MemoryStore;
    use crate::strategies::testkit::{FakeRanked, FakeRenderer, TestBed, article, source};

    fn candidate(url: &str, title: Option<&str>) -> Candidate {
        Candidate {
            url: url.into(),
            title: title.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn renders_cleans_and_stores_article() {
        let bed = TestBed::with_renderer(
            FakeRenderer::default().page("https://news.x.com/a", article("Vector databases")),
        );
        let src = source("news", "RSS_DEEP", "https://news.x.com/rss");
        let outcome = process(
            &bed.ctx,
            &src,
            "https://news.x.com/rss",
            candidate("https://news.x.com/a", None),
        )
        .await;
        assert_eq!(outcome, ItemOutcome::Written);
        let row = &bed.store.rows()[0];
        assert_eq!(row.title_org, "Vector databases");
        assert!(row.raw_json.contains(r#""feedUrl":"https://news.x.com/rss""#));
        let calls = bed.renderer.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1.no_cache && !calls[0].1.with_links_summary);
    }

    #[tokio::test]
    async fn known_url_spends_no_render_call() {
        let existing = HarvestedItem {
            item_uuid: item_uuid("https://news.x.com/a"),
            collected_at: "2025-05-01 16:10:00".into(),
            source_id: "news".into(),
            title_org: "old".into(),
            raw_url: "https://news.x.com/a".into(),
            full_text: "old".into(),
            raw_json: "{}".into(),
            processed_yn: "Y".into(),
        };
        let bed = TestBed::build(
            MemoryStore::new(vec![]).with_rows(vec![existing]),
            FakeRenderer::default().page("https://news.x.com/a", article("x")),
            FakeRanked::default(),
        );
        let src = source("news", "RSS_DEEP", "https://news.x.com/rss");
        let outcome = process(&bed.ctx, &src, "", candidate("https://news.x.com/a", Some("A"))).await;
        assert_eq!(outcome, ItemOutcome::Known);
        assert!(bed.renderer.calls().is_empty());
        assert_eq!(bed.store.rows()[0].processed_yn, "Y");
    }

    #[tokio::test]
    async fn render_failure_is_logged_against_the_item() {
        let bed = TestBed::with_renderer(FakeRenderer::default().failing("https://news.x.com/b", 503));
        let src = source("news", "RSS_DEEP", "https://news.x.com/rss");
        let outcome = process(&bed.ctx, &src, "", candidate("https://news.x.com/b", Some("B"))).await;
        assert_eq!(outcome, ItemOutcome::Failed);
        let log = &bed.store.logs()[0];
        assert_eq!(log.action_type, ActionType::JinaReadFail);
        assert_eq!(log.target_id, item_uuid("https://news.x.com/b"));
        assert_eq!(
            log.message,
            "news | https://news.x.com/b | [JINA_HTTP_503] fake failure"
        );
    }
}
