//! Feeds that carry the full article body inline. No render calls.

use super::{HarvestContext, ItemOutcome, SourceOutcome, SourceReport};
use crate::cleaner::strip_html;
use crate::dates::parse_date;
use crate::error::SourceError;
use crate::feed::{FeedEntry, parse_feed};
use crate::identity::{item_uuid, normalize_url};
use crate::models::{ActionType, LogEntry, LogStatus, RawMeta, SourceConfig};
use crate::window::TimeWindow;
use tracing::{debug, info};

pub(crate) async fn harvest(
    ctx: &HarvestContext,
    source: &SourceConfig,
    window: &TimeWindow,
) -> Result<SourceOutcome, SourceError> {
    let feed_url = ctx.source_url(source);
    let xml = ctx.fetch_document(&feed_url).await?;
    let entries = parse_feed(&xml)?;
    info!(entries = entries.len(), "Parsed feed");

    let mut outcomes = Vec::with_capacity(entries.len());
    for entry in &entries {
        if let Some(outcome) = harvest_entry(ctx, source, window, &feed_url, entry).await {
            outcomes.push(outcome);
        }
    }
    Ok(SourceOutcome::Completed(SourceReport::tally(outcomes)))
}

/// `None` for entries that were never candidates (no link).
async fn harvest_entry(
    ctx: &HarvestContext,
    source: &SourceConfig,
    window: &TimeWindow,
    feed_url: &str,
    entry: &FeedEntry,
) -> Option<ItemOutcome> {
    let link = entry.resolved_link()?;
    let url = normalize_url(link);

    match parse_date(entry.raw_date()) {
        Some(published) if !window.contains(&published) => {
            debug!(%url, %published, "Outside window");
            return Some(ItemOutcome::Skipped);
        }
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

    if ctx.is_known(&url) {
        return Some(ItemOutcome::Known);
    }

    let text = strip_html(entry.body());
    let title = entry.title().trim().to_string();
    let label = title.clone();
    let outcome = ctx
        .finish_item(source, &url, title, &text, &label, None, |t| RawMeta::RssFull {
            feed_url: feed_url.to_string(),
            title: t.to_string(),
            link: url.clone(),
        })
        .await;
    Some(outcome)
}
