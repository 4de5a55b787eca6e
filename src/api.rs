//! Ranked-items API client.
//!
//! The ranked-items source is the Hacker News Firebase API: one call lists
//! the current top story ids in rank order, one call per id returns the
//! item's metadata. This module only talks HTTP; filtering lives in the
//! ranked-list strategy.

use crate::error::SourceError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

/// Metadata of one ranked item.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RankedItem {
    pub id: u64,
    /// Item kind; only `"story"` items are harvested.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Unix seconds.
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: String,
}

/// Listing and lookup of ranked items.
#[async_trait]
pub trait RankedItemsApi: Send + Sync {
    /// Ids in rank order.
    async fn list_ids(&self) -> Result<Vec<u64>, SourceError>;

    /// One item's metadata; `None` when the API has nothing for the id.
    async fn get_item(&self, id: u64) -> Result<Option<RankedItem>, SourceError>;
}

/// [`RankedItemsApi`] over the Hacker News Firebase endpoints.
#[derive(Debug, Clone)]
pub struct HackerNewsApi {
    client: Client,
    base_url: String,
}

impl HackerNewsApi {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Public discussion page of an item.
    pub fn discussion_url(id: u64) -> String {
        format!("https://news.ycombinator.com/item?id={id}")
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| SourceError::Network {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        resp.json::<T>().await.map_err(|e| SourceError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl RankedItemsApi for HackerNewsApi {
    #[instrument(level = "info", skip(self))]
    async fn list_ids(&self) -> Result<Vec<u64>, SourceError> {
        let url = format!("{}/topstories.json", self.base_url);
        let ids: Vec<u64> = self.get_json(&url).await?;
        debug!(count = ids.len(), "Listed top story ids");
        Ok(ids)
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_item(&self, id: u64) -> Result<Option<RankedItem>, SourceError> {
        let url = format!("{}/item/{}.json", self.base_url, id);
        // The API answers `null` for deleted or unknown ids.
        self.get_json::<Option<RankedItem>>(&url).await
    }
}
