//! Ranked-items API sources: list top ids, keep relevant in-window stories,
//! render each story's external link.

use super::{HarvestContext, ItemOutcome, SourceOutcome, SourceReport, resolve_title};
use crate::api::{HackerNewsApi, RankedItem};
use crate::error::SourceError;
use crate::identity::normalize_url;
use crate::models::{ActionType, LogEntry, LogStatus, RawMeta, SourceConfig};
use crate::relevance::is_relevant;
use crate::window::TimeWindow;
use chrono::DateTime;
use futures::{StreamExt, stream};
use tracing::{debug, info, warn};

const ACCEPTED_KIND: &str = "story";

/// Whether a ranked item qualifies for harvesting.
pub fn accepts(item: &RankedItem, window: &TimeWindow, min_score: i64) -> bool {
    item.kind == ACCEPTED_KIND
        && DateTime::from_timestamp(item.time, 0).is_some_and(|t| window.contains(&t))
        && item.score >= min_score
        && item.url.as_deref().is_some_and(|u| !u.trim().is_empty())
        && is_relevant(&item.title)
}

pub(crate) async fn harvest(
    ctx: &HarvestContext,
    source: &SourceConfig,
    window: &TimeWindow,
) -> Result<SourceOutcome, SourceError> {
    let settings = &ctx.settings;
    let min_score = source.min_score();
    let ids = ctx.ranked.list_ids().await?;

    // `buffered` keeps the ranking order of the listing.
    let accepted: Vec<RankedItem> = stream::iter(ids.into_iter().take(settings.ranked_scan_limit))
        .map(|id| async move {
            match ctx.ranked.get_item(id).await {
                Ok(item) => item,
                Err(e) => {
                    warn!(id, error = %e, "Ranked item lookup failed");
                    None
                }
            }
        })
        .buffered(settings.ranked_fetch_concurrency.max(1))
        .filter_map(|item| async move { item.filter(|i| accepts(i, window, min_score)) })
        .take(settings.ranked_max_items)
        .collect()
        .await;

    if accepted.is_empty() {
        ctx.log(LogEntry::new(
            ActionType::SourceEmpty,
            &source.source_id,
            LogStatus::Skip,
            format!("No relevant stories (min_score={min_score}, keyword_filter=ON)"),
        ))
        .await;
        return Ok(SourceOutcome::Ended);
    }
    info!(accepted = accepted.len(), min_score, "Relevant stories found");

    let outcomes: Vec<ItemOutcome> = stream::iter(accepted)
        .map(|item| process(ctx, source, item))
        .buffer_unordered(settings.render_concurrency.max(1))
        .collect()
        .await;
    Ok(SourceOutcome::Completed(SourceReport::tally(outcomes)))
}

async fn process(ctx: &HarvestContext, source: &SourceConfig, item: RankedItem) -> ItemOutcome {
    let url = normalize_url(item.url.as_deref().unwrap_or_default());
    if ctx.is_known(&url) {
        debug!(%url, "Already stored");
        return ItemOutcome::Known;
    }
    let Some(markdown) = ctx.render_article(source, &url).await else {
        return ItemOutcome::Failed;
    };
    let title = resolve_title(Some(&item.title), &markdown);
    let detail = Some(format!("score={}", item.score));
    ctx.finish_item(source, &url, title, &markdown, &item.title, detail, |t| RawMeta::ApiHn {
        hn_id: item.id,
        score: item.score,
        title: t.to_string(),
        link: url.clone(),
        hn_url: HackerNewsApi::discussion_url(item.id),
    })
    .await
}
