//! Candidate discovery strategies.
//!
//! A source's fetch type selects one [`Strategy`] variant. Each variant
//! discovers candidates, filters them by window (and relevance, for ranked
//! lists), renders and cleans their text and writes them through the store.
//!
//! Failure isolation:
//!
//! - a primary-document failure (feed, list page, ranked listing) ends only
//!   that source and is logged `FAIL`
//! - a failure on one candidate is logged at the item boundary and never
//!   affects its siblings
//! - [`Strategy::harvest`] itself never fails

pub mod api_list;
pub mod deep_feed;
pub mod full_feed;
pub mod list_page;

#[cfg(test)]
pub(crate) mod testkit;

use crate::api::RankedItemsApi;
use crate::cleaner::{CleanOutcome, ContentCleaner};
use crate::config::Settings;
use crate::error::SourceError;
use crate::extraction::ExtractionClient;
use crate::identity::{ensure_https, item_uuid};
use crate::models::{
    ActionType, FetchType, HarvestedItem, LogEntry, LogStatus, RawMeta, SourceConfig,
};
use crate::store::{Store, UrlIndex};
use crate::utils::{extract_title_from_md, head_chars};
use crate::window::TimeWindow;
use chrono::{FixedOffset, Utc};
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

pub use list_page::{CompiledListRule, ListRules, filter_candidates};

/// Longest message written to the run log.
const LOG_MESSAGE_CHARS: usize = 1000;
const COLLECTED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Everything a strategy needs for one run.
///
/// `index` is built once per run; `extraction` carries the run-wide rate gate.
#[derive(Clone)]
pub struct HarvestContext {
    pub store: Arc<dyn Store>,
    pub index: Arc<UrlIndex>,
    pub extraction: ExtractionClient,
    pub cleaner: Arc<ContentCleaner>,
    pub ranked: Arc<dyn RankedItemsApi>,
    pub list_rules: Arc<ListRules>,
    pub http: Client,
    pub settings: Arc<Settings>,
    pub offset: FixedOffset,
}

/// What happened to one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    Written,
    /// Already present in the index; no render call was spent.
    Known,
    /// Outside the window or too short after cleaning.
    Skipped,
    Failed,
}

/// Per-source tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceReport {
    pub written: usize,
    pub known: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl SourceReport {
    pub fn tally(outcomes: impl IntoIterator<Item = ItemOutcome>) -> Self {
        outcomes.into_iter().fold(Self::default(), |mut r, o| {
            match o {
                ItemOutcome::Written => r.written += 1,
                ItemOutcome::Known => r.known += 1,
                ItemOutcome::Skipped => r.skipped += 1,
                ItemOutcome::Failed => r.failed += 1,
            }
            r
        })
    }

    pub fn processed(&self) -> usize {
        self.written + self.known + self.skipped + self.failed
    }
}

/// How a strategy body ended when it did not fail outright.
#[derive(Debug)]
pub(crate) enum SourceOutcome {
    /// Ran to the end; the source is logged `SOURCE_DONE`.
    Completed(SourceReport),
    /// Stopped early after logging its own reason.
    Ended,
}

/// The closed set of harvesting strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    FullFeed,
    DeepFeed,
    ListPage,
    ApiList,
}

impl From<FetchType> for Strategy {
    fn from(fetch_type: FetchType) -> Self {
        match fetch_type {
            FetchType::RssFull => Self::FullFeed,
            FetchType::RssDeep => Self::DeepFeed,
            FetchType::CrawlList => Self::ListPage,
            FetchType::Api => Self::ApiList,
        }
    }
}

impl Strategy {
    /// Harvest one source. Every failure is logged; none escapes.
    #[instrument(level = "info", skip_all, fields(source_id = %source.source_id, strategy = ?self))]
    pub async fn harvest(
        &self,
        ctx: &HarvestContext,
        source: &SourceConfig,
        window: &TimeWindow,
    ) -> SourceReport {
        let result = match self {
            Self::FullFeed => full_feed::harvest(ctx, source, window).await,
            Self::DeepFeed => deep_feed::harvest(ctx, source, window).await,
            Self::ListPage => list_page::harvest(ctx, source, window).await,
            Self::ApiList => api_list::harvest(ctx, source, window).await,
        };

        match result {
            Ok(SourceOutcome::Completed(report)) => {
                let site = if source.site_name.trim().is_empty() {
                    source.source_id.as_str()
                } else {
                    source.site_name.as_str()
                };
                let message = match self {
                    Self::ApiList => format!("{site} | {} stories processed", report.processed()),
                    _ => format!("{site} done"),
                };
                ctx.log(LogEntry::new(
                    ActionType::SourceDone,
                    &source.source_id,
                    LogStatus::Ok,
                    message,
                ))
                .await;
                info!(
                    written = report.written,
                    known = report.known,
                    skipped = report.skipped,
                    failed = report.failed,
                    "Source done"
                );
                report
            }
            Ok(SourceOutcome::Ended) => SourceReport::default(),
            Err(e) => {
                let action = match &e {
                    SourceError::Status { .. } => ActionType::SourceHttpFail,
                    _ => ActionType::SourceError,
                };
                ctx.log(LogEntry::new(
                    action,
                    &source.source_id,
                    LogStatus::Fail,
                    e.to_string(),
                ))
                .await;
                SourceReport::default()
            }
        }
    }
}

/// Title from the discovery context, else one derived from the markdown.
pub(crate) fn resolve_title(context: Option<&str>, markdown: &str) -> String {
    context
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .or_else(|| extract_title_from_md(markdown))
        .unwrap_or_default()
}

impl HarvestContext {
    /// Append to the run log and mirror the event into tracing. A log write
    /// failure is only traced.
    pub async fn log(&self, mut entry: LogEntry) {
        entry.message = head_chars(&entry.message, LOG_MESSAGE_CHARS).to_string();
        match entry.status {
            LogStatus::Ok => debug!(action = ?entry.action_type, target = %entry.target_id, detail = %entry.message, "run log"),
            LogStatus::Skip => info!(action = ?entry.action_type, target = %entry.target_id, detail = %entry.message, "run log"),
            LogStatus::Warn => warn!(action = ?entry.action_type, target = %entry.target_id, detail = %entry.message, "run log"),
            LogStatus::Fail => error!(action = ?entry.action_type, target = %entry.target_id, detail = %entry.message, "run log"),
        }
        if let Err(e) = self.store.append_log(&entry).await {
            warn!(error = %e, "Failed to append run log entry");
        }
    }

    /// Whether a row already exists for the normalized `url`.
    pub fn is_known(&self, url: &str) -> bool {
        self.index.contains(url)
    }

    pub fn collected_at(&self) -> String {
        Utc::now()
            .with_timezone(&self.offset)
            .format(COLLECTED_AT_FORMAT)
            .to_string()
    }

    /// The source's primary URL, upgraded to https unless disabled.
    pub fn source_url(&self, source: &SourceConfig) -> String {
        let url = source.target_url.trim();
        if self.settings.force_https_sources {
            ensure_https(url)
        } else {
            url.to_string()
        }
    }

    /// GET a source's primary document (feed XML).
    #[instrument(level = "info", skip(self))]
    pub async fn fetch_document(&self, url: &str) -> Result<String, SourceError> {
        let network = |source: reqwest::Error| SourceError::Network {
            url: url.to_string(),
            source,
        };
        let resp = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, &self.settings.user_agent)
            .send()
            .await
            .map_err(network)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        resp.text().await.map_err(network)
    }

    /// Render an article through the rate-limited extraction client. A
    /// failure is logged against the item and yields `None`.
    pub(crate) async fn render_article(&self, source: &SourceConfig, url: &str) -> Option<String> {
        match self.extraction.read_article(url).await {
            Ok(md) => Some(md),
            Err(e) => {
                self.log(LogEntry::new(
                    ActionType::JinaReadFail,
                    item_uuid(url),
                    LogStatus::Fail,
                    format!("{} | {} | {}", source.source_id, url, e),
                ))
                .await;
                None
            }
        }
    }

    /// Clean, gate and write one candidate's text.
    ///
    /// `label` names the item in a short-text skip message; `detail` is an
    /// extra segment of the upsert message.
    pub(crate) async fn finish_item(
        &self,
        source: &SourceConfig,
        url: &str,
        title: String,
        raw_text: &str,
        label: &str,
        detail: Option<String>,
        meta: impl FnOnce(&str) -> RawMeta + Send,
    ) -> ItemOutcome {
        let uuid = item_uuid(url);
        let text = match self
            .cleaner
            .prepare(&source.source_id, raw_text, source.max_length())
        {
            CleanOutcome::Accepted(text) => text,
            CleanOutcome::TooShort { len } => {
                debug!(%url, len, "Cleaned text too short");
                self.log(LogEntry::new(
                    ActionType::ItemSkipShort,
                    uuid,
                    LogStatus::Skip,
                    format!("{} | {}", source.source_id, label),
                ))
                .await;
                return ItemOutcome::Skipped;
            }
        };

        let raw_json = meta(&title).to_json();
        let len = text.chars().count();
        let item = HarvestedItem {
            item_uuid: uuid.clone(),
            collected_at: self.collected_at(),
            source_id: source.source_id.clone(),
            title_org: title,
            raw_url: url.to_string(),
            full_text: text,
            raw_json,
            processed_yn: "N".to_string(),
        };

        match self.store.upsert(&self.index, &item).await {
            Ok(outcome) => {
                debug!(%url, ?outcome, "Item stored");
                let message = match detail {
                    Some(d) => format!("{} | {} | len={}", source.source_id, d, len),
                    None => format!("{} | len={}", source.source_id, len),
                };
                self.log(LogEntry::new(ActionType::ItemUpsert, uuid, LogStatus::Ok, message))
                    .await;
                ItemOutcome::Written
            }
            Err(e) => {
                self.log(LogEntry::new(
                    ActionType::ItemUpsert,
                    uuid,
                    LogStatus::Fail,
                    format!("{} | {} | {}", source.source_id, url, e),
                ))
                .await;
                ItemOutcome::Failed
            }
        }
    }
}
