//! File-backed [`Store`].
//!
//! Layout:
//! ```text
//! sources.yaml   list of SourceConfig rows (read-only)
//! items.json     JSON array of HarvestedItem rows, addressed by position
//! run_log.jsonl  one JSON object per log event, append-only
//! ```
//!
//! The item file is rewritten after every upsert (temp file + rename) while
//! the row lock is held, so concurrent upserts serialize on disk as well. A
//! write only becomes visible in memory and in the URL index once the file
//! has been replaced.
//!
//! Each rewrite serializes the whole table, so a run costs O(items x rows).
//! That is fine at the table sizes one daily window produces; batching the
//! writes per source would be the next step if the table grows large.

use super::{Store, UpsertOutcome, UrlIndex, index_rows, stage_upsert};
use crate::error::{StoreError, StoreResult};
use crate::models::{HarvestedItem, ITEM_COLUMNS, LogEntry, SourceConfig};
use crate::utils::ensure_writable_dir;
use async_trait::async_trait;
use chrono::{FixedOffset, Utc};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

/// Where the three tables live.
#[derive(Debug, Clone)]
pub struct StorePaths {
    pub sources: PathBuf,
    pub items: PathBuf,
    pub log: PathBuf,
}

#[derive(Debug)]
pub struct JsonStore {
    paths: StorePaths,
    offset: FixedOffset,
    /// `None` until [`Store::build_index`] has loaded the item file.
    rows: Mutex<Option<Vec<HarvestedItem>>>,
    log_lock: Mutex<()>,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Random run-log row id.
fn log_uuid() -> String {
    format!("LOG_{:08x}", rand::random::<u32>())
}

impl JsonStore {
    /// `offset` is the zone log timestamps are written in.
    pub fn new(paths: StorePaths, offset: FixedOffset) -> Self {
        Self {
            paths,
            offset,
            rows: Mutex::new(None),
            log_lock: Mutex::new(()),
        }
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    async fn load_rows(&self) -> StoreResult<Vec<HarvestedItem>> {
        let path = &self.paths.items;
        ensure_writable_dir(parent_dir(path)).await.map_err(|e| {
            StoreError::Configuration(format!(
                "item directory for {} is not writable: {e}",
                path.display()
            ))
        })?;
        if !fs::try_exists(path).await.map_err(io_err(path))? {
            info!(path = %path.display(), "Item file absent; starting empty");
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(path).await.map_err(io_err(path))?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let value: Value = serde_json::from_str(&raw)?;
        let Value::Array(_) = value else {
            return Err(StoreError::Configuration(format!(
                "item file {} is not a JSON array",
                path.display()
            )));
        };
        Ok(serde_json::from_value(value)?)
    }

    async fn persist(&self, rows: &[HarvestedItem]) -> StoreResult<()> {
        let path = &self.paths.items;
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(rows)?;
        fs::write(&tmp, body).await.map_err(io_err(&tmp))?;
        fs::rename(&tmp, path).await.map_err(io_err(path))?;
        Ok(())
    }
}

#[async_trait]
impl Store for JsonStore {
    #[instrument(level = "info", skip(self), fields(path = %self.paths.sources.display()))]
    async fn read_sources(&self) -> StoreResult<Vec<SourceConfig>> {
        let path = &self.paths.sources;
        if !fs::try_exists(path).await.map_err(io_err(path))? {
            return Err(StoreError::Configuration(format!(
                "sources file not found: {}",
                path.display()
            )));
        }
        let raw = fs::read_to_string(path).await.map_err(io_err(path))?;
        let sources: Vec<SourceConfig> = serde_yaml::from_str(&raw)?;
        info!(count = sources.len(), "Loaded sources");
        Ok(sources)
    }

    #[instrument(level = "info", skip(self), fields(path = %self.paths.items.display()))]
    async fn build_index(&self) -> StoreResult<UrlIndex> {
        let loaded = self.load_rows().await?;
        let index = UrlIndex::new(
            ITEM_COLUMNS.iter().map(|c| c.to_string()).collect(),
            index_rows(&loaded),
        );
        info!(rows = loaded.len(), indexed = index.len(), "Built URL index");
        *self.rows.lock().await = Some(loaded);
        Ok(index)
    }

    async fn upsert(&self, index: &UrlIndex, item: &HarvestedItem) -> StoreResult<UpsertOutcome> {
        let mut guard = self.rows.lock().await;
        let Some(rows) = guard.as_mut() else {
            return Err(StoreError::Configuration(
                "upsert before the URL index was built".into(),
            ));
        };
        let staged = stage_upsert(rows, index, item);
        if let Err(e) = self.persist(rows).await {
            staged.rollback(rows);
            return Err(e);
        }
        let outcome = staged.commit(index, &item.raw_url);
        debug!(url = %item.raw_url, ?outcome, "Upserted item");
        Ok(outcome)
    }

    async fn append_log(&self, entry: &LogEntry) -> StoreResult<()> {
        let record = json!({
            "Log_UUID": log_uuid(),
            "Timestamp": Utc::now().with_timezone(&self.offset).format("%Y-%m-%d %H:%M:%S").to_string(),
            "Module": entry.actor,
            "Action_Type": entry.action_type,
            "Target_UUID": entry.target_id,
            "Status": entry.status,
            "Message": entry.message,
        });
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let path = &self.paths.log;
        let _guard = self.log_lock.lock().await;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(io_err(path))?;
        file.write_all(line.as_bytes()).await.map_err(io_err(path))?;
        file.flush().await.map_err(io_err(path))?;
        Ok(())
    }
}
