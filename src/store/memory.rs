//! In-memory [`Store`] for tests and dry runs.

use super::{Store, UpsertOutcome, UrlIndex, index_rows, upsert_rows};
use crate::error::{StoreError, StoreResult};
use crate::models::{HarvestedItem, ITEM_COLUMNS, LogEntry, SourceConfig};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct MemoryStore {
    sources: Vec<SourceConfig>,
    rows: Mutex<Vec<HarvestedItem>>,
    logs: Mutex<Vec<LogEntry>>,
    item_table_missing: bool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStore {
    pub fn new(sources: Vec<SourceConfig>) -> Self {
        Self {
            sources,
            ..Self::default()
        }
    }

    /// Seed the item table with existing rows.
    pub fn with_rows(self, rows: Vec<HarvestedItem>) -> Self {
        *lock(&self.rows) = rows;
        self
    }

    /// A store whose item table does not exist; index building fails.
    pub fn without_item_table(sources: Vec<SourceConfig>) -> Self {
        Self {
            item_table_missing: true,
            ..Self::new(sources)
        }
    }

    pub fn rows(&self) -> Vec<HarvestedItem> {
        lock(&self.rows).clone()
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        lock(&self.logs).clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn read_sources(&self) -> StoreResult<Vec<SourceConfig>> {
        Ok(self.sources.clone())
    }

    async fn build_index(&self) -> StoreResult<UrlIndex> {
        if self.item_table_missing {
            return Err(StoreError::Configuration("item table does not exist".into()));
        }
        let headers = ITEM_COLUMNS.iter().map(|c| c.to_string()).collect();
        Ok(UrlIndex::new(headers, index_rows(&lock(&self.rows))))
    }

    async fn upsert(&self, index: &UrlIndex, item: &HarvestedItem) -> StoreResult<UpsertOutcome> {
        let mut rows = lock(&self.rows);
        Ok(upsert_rows(&mut rows, index, item))
    }

    async fn append_log(&self, entry: &LogEntry) -> StoreResult<()> {
        lock(&self.logs).push(entry.clone());
        Ok(())
    }
}
