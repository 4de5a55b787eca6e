//! In-memory fakes shared by the strategy and dispatcher tests.

use super::{HarvestContext, ListRules};
use crate::api::{RankedItem, RankedItemsApi};
use crate::cleaner::ContentCleaner;
use crate::cleaner::rules::CleaningRegistry;
use crate::config::Settings;
use crate::error::{RenderError, RenderResult, SourceError};
use crate::extraction::{ExtractionClient, RateGate, RenderOptions, Renderer};
use crate::models::SourceConfig;
use crate::store::{MemoryStore, Store};
use crate::window::TimeWindow;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) fn kst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).unwrap()
}

pub(crate) fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<FixedOffset> {
    kst().with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

/// Window of a run at 2025-05-02 17:00 local:
/// 2025-05-01 16:00 to 2025-05-02 16:00.
pub(crate) fn window() -> TimeWindow {
    TimeWindow::compute(&at(2025, 5, 2, 17, 0), kst(), 16)
}

pub(crate) fn source(id: &str, fetch_type: &str, url: &str) -> SourceConfig {
    SourceConfig {
        source_id: id.into(),
        fetch_type: fetch_type.into(),
        target_url: url.into(),
        status: "active".into(),
        phase: Some(1),
        site_name: format!("{id} site"),
        ..SourceConfig::default()
    }
}

/// Article text comfortably over the minimum length.
pub(crate) fn article(topic: &str) -> String {
    format!("# {topic}\n\n{}", format!("Paragraph about {topic}. ").repeat(12))
}

/// Renderer answering from a fixed URL → response table.
#[derive(Default)]
pub(crate) struct FakeRenderer {
    pages: HashMap<String, Result<String, u16>>,
    delay: Duration,
    calls: Mutex<Vec<(String, RenderOptions)>>,
}

impl FakeRenderer {
    pub fn page(mut self, url: &str, body: impl Into<String>) -> Self {
        self.pages.insert(url.to_string(), Ok(body.into()));
        self
    }

    pub fn failing(mut self, url: &str, status: u16) -> Self {
        self.pages.insert(url.to_string(), Err(status));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<(String, RenderOptions)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn render(&self, url: &str, options: RenderOptions) -> RenderResult<String> {
        self.calls.lock().unwrap().push((url.to_string(), options));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.pages.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(RenderError::Status {
                status: *status,
                snippet: "fake failure".into(),
            }),
            None => Err(RenderError::Status {
                status: 404,
                snippet: format!("no page for {url}"),
            }),
        }
    }
}

/// Ranked API over fixed data.
#[derive(Default)]
pub(crate) struct FakeRanked {
    pub ids: Vec<u64>,
    pub items: HashMap<u64, RankedItem>,
    pub listing_status: Option<u16>,
}

impl FakeRanked {
    pub fn with_items(items: Vec<RankedItem>) -> Self {
        Self {
            ids: items.iter().map(|i| i.id).collect(),
            items: items.into_iter().map(|i| (i.id, i)).collect(),
            listing_status: None,
        }
    }
}

#[async_trait]
impl RankedItemsApi for FakeRanked {
    async fn list_ids(&self) -> Result<Vec<u64>, SourceError> {
        match self.listing_status {
            Some(status) => Err(SourceError::Status {
                status,
                url: "fake://topstories".into(),
            }),
            None => Ok(self.ids.clone()),
        }
    }

    async fn get_item(&self, id: u64) -> Result<Option<RankedItem>, SourceError> {
        Ok(self.items.get(&id).cloned())
    }
}

/// A context wired to fakes, plus handles to inspect them.
pub(crate) struct TestBed {
    pub ctx: HarvestContext,
    pub store: Arc<MemoryStore>,
    pub renderer: Arc<FakeRenderer>,
}

impl TestBed {
    pub fn new() -> Self {
        Self::build(MemoryStore::new(vec![]), FakeRenderer::default(), FakeRanked::default())
    }

    pub fn with_renderer(renderer: FakeRenderer) -> Self {
        Self::build(MemoryStore::new(vec![]), renderer, FakeRanked::default())
    }

    pub fn build(store: MemoryStore, renderer: FakeRenderer, ranked: FakeRanked) -> Self {
        let settings = Settings {
            render_delay_ms: 0,
            ..Settings::default()
        };
        let store = Arc::new(store);
        let renderer = Arc::new(renderer);
        let index = futures::executor::block_on(store.build_index()).unwrap();
        let ctx = HarvestContext {
            store: store.clone(),
            index: Arc::new(index),
            extraction: ExtractionClient::new(
                renderer.clone(),
                RateGate::new(settings.render_concurrency, Duration::ZERO),
                settings.render_timeout_secs,
            ),
            cleaner: Arc::new(ContentCleaner::new(
                CleaningRegistry::builtin().unwrap(),
                settings.min_text_len,
            )),
            ranked: Arc::new(ranked),
            list_rules: Arc::new(ListRules::compile(&settings.list_rules).unwrap()),
            http: reqwest::Client::new(),
            offset: kst(),
            settings: Arc::new(settings),
        };
        Self {
            ctx,
            store,
            renderer,
        }
    }
}
