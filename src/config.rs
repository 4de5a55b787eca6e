//! Run settings and the built-in list-page host rules.
//!
//! Every setting has a default so an empty (or absent) settings file yields a
//! working configuration. Settings are read from YAML with `serde_yaml`, the
//! same way the rest of the configuration surface is.

use crate::error::{StoreError, StoreResult};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, instrument};

/// Marker appended to text that was cut at `Max_Length`.
pub const TRUNCATION_MARKER: &str = "\n...[Max_Length cut]";

/// Tunables for one harvest run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Local hour at which the daily acceptance window closes.
    pub cutover_hour: u32,
    /// Offset of the local zone from UTC, in hours.
    pub utc_offset_hours: i32,
    /// Cleaned text shorter than this is never written.
    pub min_text_len: usize,
    pub render_base_url: String,
    pub render_timeout_secs: u64,
    /// Mandatory pause before every render call.
    pub render_delay_ms: u64,
    /// Ceiling on simultaneous render calls across the whole run.
    pub render_concurrency: usize,
    pub ranked_api_base: String,
    /// How many of the top-ranked ids are inspected.
    pub ranked_scan_limit: usize,
    pub ranked_fetch_concurrency: usize,
    pub ranked_max_items: usize,
    pub target_phase: u32,
    pub user_agent: String,
    /// Upgrade source feed and list URLs to https before fetching.
    pub force_https_sources: bool,
    pub list_rules: HashMap<String, ListRule>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cutover_hour: 16,
            utc_offset_hours: 9,
            min_text_len: 120,
            render_base_url: "https://r.jina.ai/".to_string(),
            render_timeout_secs: 25,
            render_delay_ms: 650,
            render_concurrency: 5,
            ranked_api_base: "https://hacker-news.firebaseio.com/v0".to_string(),
            ranked_scan_limit: 200,
            ranked_fetch_concurrency: 10,
            ranked_max_items: 30,
            target_phase: 1,
            user_agent: format!("Mozilla/5.0 (compatible; topic_harvester/{})", env!("CARGO_PKG_VERSION")),
            force_https_sources: true,
            list_rules: default_list_rules(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file, falling back to defaults when `path` is `None`.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&str>) -> StoreResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !Path::new(path).exists() {
            return Err(StoreError::Configuration(format!(
                "settings file not found: {path}"
            )));
        }
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| StoreError::Io {
                path: path.to_string(),
                source,
            })?;
        let settings: Settings = serde_yaml::from_str(&raw)?;
        info!(path, "Loaded settings");
        Ok(settings)
    }

    /// The local zone windows and log timestamps are expressed in.
    pub fn local_offset(&self) -> StoreResult<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            StoreError::Configuration(format!(
                "utc_offset_hours out of range: {}",
                self.utc_offset_hours
            ))
        })
    }
}

/// Host/allow/deny rule set for one list-page source.
///
/// `host` must match the candidate host exactly; `deny` patterns remove
/// candidates; when `allow` is non-empty a candidate must match one of them.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListRule {
    pub host: Option<String>,
    pub allow: Vec<String>,
    pub deny: Vec<String>,
}

fn rule(host: &str, allow: &[&str], deny: &[&str]) -> ListRule {
    ListRule {
        host: Some(host.to_string()),
        allow: allow.iter().map(|s| s.to_string()).collect(),
        deny: deny.iter().map(|s| s.to_string()).collect(),
    }
}

/// Rules for the list-page sources known to need more than same-host filtering.
pub fn default_list_rules() -> HashMap<String, ListRule> {
    let spri = rule(
        "spri.kr",
        &[r"^https://spri\.kr/posts/view/\d+(?:\?code=[^#]+)?$"],
        &[],
    );
    HashMap::from([
        (
            "deepmind_blog".to_string(),
            rule(
                "deepmind.google",
                &[
                    r"^https://deepmind\.google/discover/blog/.*",
                    r"^https://deepmind\.google/blog/[^/?#]+/?$",
                ],
                &[
                    r"^https://deepmind\.google/blog/?$",
                    r"^https://deepmind\.google/blog/(?:tags?|topics?|authors?|search)/?$",
                    r"/feed/?$",
                ],
            ),
        ),
        (
            "hf_daily_papers".to_string(),
            rule(
                "huggingface.co",
                &[r"^https://huggingface\.co/papers/\d{4}\.\d{5}(?:v\d+)?/?$"],
                &[r"^https://huggingface\.co/papers/?$", r"/login", r"/settings"],
            ),
        ),
        ("spri_reports".to_string(), spri.clone()),
        ("spri_research".to_string(), spri),
        (
            "nia_aihub".to_string(),
            rule(
                "www.nia.or.kr",
                &[r"^https://www\.nia\.or\.kr/site/nia_kor/ex/bbs/View\.do\?cbIdx=99953&bcIdx=\d+.*$"],
                &[],
            ),
        ),
    ])
}
