//! Run driver: selects sources, maps each to a strategy and harvests them one
//! after another.
//!
//! Sources run strictly in configured order; the next source starts only
//! once the previous one's whole fan-out has resolved. The URL index is built
//! once per run. A missing storage resource is the only failure that ends a
//! run; everything else is isolated to a source or an item.

use crate::api::{HackerNewsApi, RankedItemsApi};
use crate::cleaner::ContentCleaner;
use crate::cleaner::rules::CleaningRegistry;
use crate::config::Settings;
use crate::error::HarvestError;
use crate::extraction::{ExtractionClient, JinaRenderer, RateGate, Renderer};
use crate::models::SourceConfig;
use crate::store::Store;
use crate::strategies::{HarvestContext, ListRules, SourceReport, Strategy};
use crate::window::TimeWindow;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Totals of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub sources: usize,
    pub written: usize,
    pub known: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed_ms: u128,
}

impl RunSummary {
    fn add(&mut self, r: &SourceReport) {
        self.sources += 1;
        self.written += r.written;
        self.known += r.known;
        self.skipped += r.skipped;
        self.failed += r.failed;
    }
}

/// Keep active sources up to `target_phase`, paired with their strategy.
/// Unknown fetch types are warned about and dropped.
pub fn select_sources(sources: Vec<SourceConfig>, target_phase: u32) -> Vec<(SourceConfig, Strategy)> {
    sources
        .into_iter()
        .filter(|s| s.is_selected(target_phase))
        .filter_map(|s| match s.parsed_fetch_type() {
            Some(ft) => Some((s, Strategy::from(ft))),
            None => {
                warn!(source_id = %s.source_id, fetch_type = %s.fetch_type, "Unknown Fetch_Type; skipping source");
                None
            }
        })
        .collect()
}

pub struct Harvester {
    store: Arc<dyn Store>,
    extraction: ExtractionClient,
    cleaner: Arc<ContentCleaner>,
    ranked: Arc<dyn RankedItemsApi>,
    list_rules: Arc<ListRules>,
    http: Client,
    settings: Arc<Settings>,
}

impl Harvester {
    /// Wire a harvester from explicit collaborators.
    pub fn new(
        store: Arc<dyn Store>,
        renderer: Arc<dyn Renderer>,
        ranked: Arc<dyn RankedItemsApi>,
        http: Client,
        settings: Settings,
    ) -> Result<Self, HarvestError> {
        let gate = RateGate::new(
            settings.render_concurrency,
            Duration::from_millis(settings.render_delay_ms),
        );
        Ok(Self {
            extraction: ExtractionClient::new(renderer, gate, settings.render_timeout_secs),
            cleaner: Arc::new(ContentCleaner::new(
                CleaningRegistry::builtin()?,
                settings.min_text_len,
            )),
            list_rules: Arc::new(ListRules::compile(&settings.list_rules)?),
            store,
            ranked,
            http,
            settings: Arc::new(settings),
        })
    }

    /// Wire the production collaborators: the Jina renderer and the Hacker
    /// News API over one shared HTTP client.
    pub fn from_settings(
        store: Arc<dyn Store>,
        settings: Settings,
        render_api_key: Option<String>,
    ) -> Result<Self, HarvestError> {
        let http = Client::builder()
            .user_agent(settings.user_agent.clone())
            .timeout(Duration::from_secs(settings.render_timeout_secs + 5))
            .build()?;
        let renderer = Arc::new(JinaRenderer::new(
            http.clone(),
            settings.render_base_url.clone(),
            render_api_key,
        ));
        let ranked = Arc::new(HackerNewsApi::new(http.clone(), settings.ranked_api_base.clone()));
        Self::new(store, renderer, ranked, http, settings)
    }

    /// Harvest every selected source for the window containing `now`.
    #[instrument(level = "info", skip(self))]
    pub async fn run(&self, now: DateTime<Utc>) -> Result<RunSummary, HarvestError> {
        let t0 = Instant::now();
        let offset = self.settings.local_offset()?;
        let window = TimeWindow::compute(&now, offset, self.settings.cutover_hour);
        info!(%window, "Computed acceptance window");

        let sources = self.store.read_sources().await?;
        let total = sources.len();
        let selected = select_sources(sources, self.settings.target_phase);
        info!(total, selected = selected.len(), target_phase = self.settings.target_phase, "Selected sources");
        let mut summary = RunSummary::default();
        if selected.is_empty() {
            info!("No target sources for this run");
            return Ok(summary);
        }

        let index = self.store.build_index().await?;
        let ctx = HarvestContext {
            store: self.store.clone(),
            index: Arc::new(index),
            extraction: self.extraction.clone(),
            cleaner: self.cleaner.clone(),
            ranked: self.ranked.clone(),
            list_rules: self.list_rules.clone(),
            http: self.http.clone(),
            settings: self.settings.clone(),
            offset,
        };

        for (source, strategy) in &selected {
            info!(source_id = %source.source_id, ?strategy, "Harvesting source");
            let report = strategy.harvest(&ctx, source, &window).await;
            summary.add(&report);
        }

        summary.elapsed_ms = t0.elapsed().as_millis();
        info!(
            sources = summary.sources,
            written = summary.written,
            known = summary.known,
            skipped = summary.skipped,
            failed = summary.failed,
            elapsed_ms = summary.elapsed_ms as u64,
            "Harvest run complete"
        );
        Ok(summary)
    }
}
