//! Storage collaborator contract.
//!
//! The harvester reads its sources from, writes its items to, and logs its
//! events into a [`Store`]. Items are keyed by normalized URL through a
//! [`UrlIndex`] built once per run.
//!
//! # Concurrency
//!
//! Many item tasks of one source read the index and upsert concurrently.
//! Implementations update the index inside the same critical section as the
//! row write, so two upserts of one URL never produce two rows; the later
//! write wins.

pub mod json;
pub mod memory;

use crate::error::StoreResult;
use crate::models::{HarvestedItem, LogEntry, SourceConfig};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

pub use json::{JsonStore, StorePaths};
pub use memory::MemoryStore;

/// Normalized URL → row position, plus the item table's column headers.
#[derive(Debug, Default)]
pub struct UrlIndex {
    headers: Vec<String>,
    rows: RwLock<HashMap<String, usize>>,
}

impl UrlIndex {
    pub fn new(headers: Vec<String>, rows: HashMap<String, usize>) -> Self {
        Self {
            headers,
            rows: RwLock::new(rows),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Whether a row already exists for `url`.
    pub fn contains(&self, url: &str) -> bool {
        self.read().contains_key(url)
    }

    pub fn position(&self, url: &str) -> Option<usize> {
        self.read().get(url).copied()
    }

    /// Record that `url` lives at `row`.
    pub fn record(&self, url: &str, row: usize) {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string(), row);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    // The map is valid after any panic: every write is a single insert.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, usize>> {
        self.rows.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether an upsert overwrote a row or appended one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Updated(usize),
    Inserted(usize),
}

/// Tabular storage for sources, harvested items and the run log.
#[async_trait]
pub trait Store: Send + Sync {
    /// All configured sources, selected or not.
    async fn read_sources(&self) -> StoreResult<Vec<SourceConfig>>;

    /// Build the normalized-URL index of the item table.
    async fn build_index(&self) -> StoreResult<UrlIndex>;

    /// Overwrite the row whose `Raw_Url` matches, else append.
    async fn upsert(&self, index: &UrlIndex, item: &HarvestedItem) -> StoreResult<UpsertOutcome>;

    /// Append one event to the run log.
    async fn append_log(&self, entry: &LogEntry) -> StoreResult<()>;
}

/// A row write applied to the table but not yet visible in the index.
#[derive(Debug)]
#[must_use]
pub(crate) struct StagedUpsert {
    outcome: UpsertOutcome,
    previous: Option<HarvestedItem>,
}

impl StagedUpsert {
    /// Publish the write to the index.
    pub(crate) fn commit(self, index: &UrlIndex, url: &str) -> UpsertOutcome {
        if let UpsertOutcome::Inserted(pos) = self.outcome {
            index.record(url, pos);
        }
        self.outcome
    }

    /// Undo the row write. The index never saw it.
    pub(crate) fn rollback(self, rows: &mut Vec<HarvestedItem>) {
        match (self.outcome, self.previous) {
            (UpsertOutcome::Updated(pos), Some(previous)) => rows[pos] = previous,
            (UpsertOutcome::Inserted(_), _) => {
                rows.pop();
            }
            (UpsertOutcome::Updated(_), None) => {}
        }
    }
}

/// Write `item` into `rows` by index position, leaving the index untouched.
/// Callers hold the row lock until they commit or roll back.
pub(crate) fn stage_upsert(
    rows: &mut Vec<HarvestedItem>,
    index: &UrlIndex,
    item: &HarvestedItem,
) -> StagedUpsert {
    match index.position(&item.raw_url) {
        Some(pos) if pos < rows.len() => StagedUpsert {
            outcome: UpsertOutcome::Updated(pos),
            previous: Some(std::mem::replace(&mut rows[pos], item.clone())),
        },
        _ => {
            rows.push(item.clone());
            StagedUpsert {
                outcome: UpsertOutcome::Inserted(rows.len() - 1),
                previous: None,
            }
        }
    }
}

/// Stage and commit in one step, for stores whose write cannot fail.
pub(crate) fn upsert_rows(
    rows: &mut Vec<HarvestedItem>,
    index: &UrlIndex,
    item: &HarvestedItem,
) -> UpsertOutcome {
    stage_upsert(rows, index, item).commit(index, &item.raw_url)
}

/// Build index entries from existing rows; blank URLs are skipped.
pub(crate) fn index_rows(rows: &[HarvestedItem]) -> HashMap<String, usize> {
    rows.iter()
        .enumerate()
        .filter(|(_, r)| !r.raw_url.trim().is_empty())
        .map(|(i, r)| (r.raw_url.trim().to_string(), i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(url: &str, text: &str) -> HarvestedItem {
        HarvestedItem {
            item_uuid: crate::identity::item_uuid(url),
            collected_at: "2025-05-02 16:10:00".into(),
            source_id: "s".into(),
            title_org: "t".into(),
            raw_url: url.into(),
            full_text: text.into(),
            raw_json: "{}".into(),
            processed_yn: "N".into(),
        }
    }

    #[test]
    fn upsert_rows_overwrites_matching_url() {
        let index = UrlIndex::default();
        let mut rows = Vec::new();
        assert_eq!(upsert_rows(&mut rows, &index, &item("https://a.com", "one")), UpsertOutcome::Inserted(0));
        assert_eq!(upsert_rows(&mut rows, &index, &item("https://a.com", "two")), UpsertOutcome::Updated(0));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].full_text, "two");
        assert!(index.contains("https://a.com"));
    }

    #[test]
    fn rolled_back_insert_is_invisible() {
        let index = UrlIndex::default();
        let mut rows = vec![item("https://a.com", "one")];
        index.record("https://a.com", 0);

        stage_upsert(&mut rows, &index, &item("https://b.com", "new")).rollback(&mut rows);
        assert_eq!(rows.len(), 1);
        assert!(!index.contains("https://b.com"));

        stage_upsert(&mut rows, &index, &item("https://a.com", "two")).rollback(&mut rows);
        assert_eq!(rows[0].full_text, "one");
        assert_eq!(index.position("https://a.com"), Some(0));
    }

    #[test]
    fn poisoned_index_still_records() {
        let index = std::sync::Arc::new(UrlIndex::default());
        let poisoner = index.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.rows.write().unwrap();
            panic!("poison the index lock");
        })
        .join();
        index.record("https://a.com", 3);
        assert_eq!(index.position("https://a.com"), Some(3));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn index_rows_skips_blank_urls() {
        let rows = vec![item("https://a.com", "x"), item("  ", "y"), item("https://b.com", "z")];
        let map = index_rows(&rows);
        assert_eq!(map.len(), 2);
        assert_eq!(map["https://b.com"], 2);
    }
}
