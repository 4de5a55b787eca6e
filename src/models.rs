//! Data models shared by the strategies, the dispatcher and the store.
//!
//! - [`SourceConfig`]: one configured source row, read-only for a run
//! - [`FetchType`]: the closed set of harvesting strategies a source can name
//! - [`Candidate`]: a discovered URL that has not been fetched yet
//! - [`HarvestedItem`]: the cleaned, identity-tagged record handed to storage
//! - [`RawMeta`]: the mode-tagged metadata serialized into `Raw_JSON`
//! - [`LogEntry`]: one append-only run-log event
//!
//! Field names follow the storage columns (`Source_ID`, `Raw_Url`, ...), hence
//! the serde renames.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default cap on cleaned text length when a source leaves `Max_Length` blank.
pub const DEFAULT_MAX_LENGTH: usize = 4000;
/// Default cap on list-page candidates when `Max_Items` is blank.
pub const DEFAULT_MAX_ITEMS: usize = 8;
/// Default ranked-item score threshold when `Min_Score` is blank.
pub const DEFAULT_MIN_SCORE: i64 = 150;
/// Phase assigned to sources that do not declare one; never selected by default.
pub const DEFAULT_PHASE: u32 = 999;

/// One configured source.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SourceConfig {
    #[serde(rename = "Source_ID")]
    pub source_id: String,
    /// Kept as text so an unknown type can be logged and skipped instead of
    /// failing the whole source list.
    #[serde(rename = "Fetch_Type", default)]
    pub fetch_type: String,
    #[serde(rename = "Target_URL", default)]
    pub target_url: String,
    #[serde(rename = "Max_Length", default)]
    pub max_length: Option<usize>,
    #[serde(rename = "Max_Items", default)]
    pub max_items: Option<usize>,
    #[serde(rename = "Min_Score", default)]
    pub min_score: Option<i64>,
    #[serde(rename = "Status", default)]
    pub status: String,
    #[serde(rename = "Phase", default)]
    pub phase: Option<u32>,
    #[serde(rename = "Site_Name", default)]
    pub site_name: String,
}

impl SourceConfig {
    pub fn max_length(&self) -> usize {
        self.max_length.unwrap_or(DEFAULT_MAX_LENGTH)
    }

    pub fn max_items(&self) -> usize {
        self.max_items.unwrap_or(DEFAULT_MAX_ITEMS)
    }

    pub fn min_score(&self) -> i64 {
        self.min_score.unwrap_or(DEFAULT_MIN_SCORE)
    }

    pub fn phase(&self) -> u32 {
        self.phase.unwrap_or(DEFAULT_PHASE)
    }

    /// Whether the source should run in a pass targeting `target_phase`.
    pub fn is_selected(&self, target_phase: u32) -> bool {
        self.status.trim().eq_ignore_ascii_case("active") && self.phase() <= target_phase
    }

    /// The declared fetch type, or `None` when it names no known strategy.
    pub fn parsed_fetch_type(&self) -> Option<FetchType> {
        FetchType::parse(&self.fetch_type)
    }
}

/// The fetch types a source may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchType {
    RssFull,
    RssDeep,
    CrawlList,
    Api,
}

impl FetchType {
    /// Parse the configured label, tolerating surrounding whitespace and case.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "RSS_FULL" => Some(Self::RssFull),
            "RSS_DEEP" => Some(Self::RssDeep),
            "CRAWL_LIST" => Some(Self::CrawlList),
            "API" => Some(Self::Api),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RssFull => "RSS_FULL",
            Self::RssDeep => "RSS_DEEP",
            Self::CrawlList => "CRAWL_LIST",
            Self::Api => "API",
        }
    }
}

impl fmt::Display for FetchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discovered URL plus whatever title the discovery context offered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub url: String,
    pub title: Option<String>,
}

/// The final record written through the upsert contract.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HarvestedItem {
    #[serde(rename = "Item_UUID")]
    pub item_uuid: String,
    #[serde(rename = "Collected_At")]
    pub collected_at: String,
    #[serde(rename = "Source_ID")]
    pub source_id: String,
    #[serde(rename = "Title_Org")]
    pub title_org: String,
    #[serde(rename = "Raw_Url")]
    pub raw_url: String,
    #[serde(rename = "Full_Text")]
    pub full_text: String,
    #[serde(rename = "Raw_JSON")]
    pub raw_json: String,
    #[serde(rename = "Processed_YN")]
    pub processed_yn: String,
}

/// Column order of the item table.
pub const ITEM_COLUMNS: [&str; 8] = [
    "Item_UUID",
    "Collected_At",
    "Source_ID",
    "Title_Org",
    "Raw_Url",
    "Full_Text",
    "Raw_JSON",
    "Processed_YN",
];

/// Mode-tagged metadata stored as the `Raw_JSON` column.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "mode")]
pub enum RawMeta {
    #[serde(rename = "RSS_FULL")]
    RssFull {
        #[serde(rename = "feedUrl")]
        feed_url: String,
        title: String,
        link: String,
    },
    #[serde(rename = "RSS_DEEP")]
    RssDeep {
        #[serde(rename = "feedUrl")]
        feed_url: String,
        title: String,
        link: String,
    },
    #[serde(rename = "CRAWL_LIST_2HOP")]
    CrawlList {
        #[serde(rename = "listUrl")]
        list_url: String,
        link: String,
    },
    #[serde(rename = "API_HN")]
    ApiHn {
        hn_id: u64,
        score: i64,
        title: String,
        link: String,
        hn_url: String,
    },
}

impl RawMeta {
    pub fn to_json(&self) -> String {
        // Serializing a fieldset of plain strings and integers cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Status column of the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogStatus {
    Ok,
    Warn,
    Skip,
    Fail,
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ok => "OK",
            Self::Warn => "WARN",
            Self::Skip => "SKIP",
            Self::Fail => "FAIL",
        })
    }
}

/// Action types written to the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    SourceHttpFail,
    SourceError,
    SourceEmpty,
    SourceDone,
    ListReadFail,
    ListNoCandidate,
    ItemNoDateWarn,
    ItemSkipShort,
    ItemUpsert,
    JinaReadFail,
}

/// One event for the append-only run log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub actor: String,
    pub action_type: ActionType,
    pub target_id: String,
    pub status: LogStatus,
    pub message: String,
}

impl LogEntry {
    pub fn new(
        action_type: ActionType,
        target_id: impl Into<String>,
        status: LogStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            actor: "Crawler".to_string(),
            action_type,
            target_id: target_id.into(),
            status,
            message: message.into(),
        }
    }
}
