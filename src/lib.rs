//! # Topic Harvester
//!
//! Harvests newly published articles about a topic domain from syndication
//! feeds, list pages and a ranked-items API, restricted to a daily acceptance
//! window. Items are deduplicated by canonical URL, cleaned of site
//! boilerplate and written to a tabular store.
//!
//! ## Architecture
//!
//! 1. **Window**: [`window::TimeWindow`] fixes the 24h interval for the run
//! 2. **Dispatch**: [`orchestrator::Harvester`] selects sources and maps each
//!    fetch type to a [`strategies::Strategy`]
//! 3. **Discovery**: each strategy finds candidates, filters them and renders
//!    article text through the rate-limited [`extraction::ExtractionClient`]
//! 4. **Cleaning**: [`cleaner::ContentCleaner`] strips boilerplate and gates length
//! 5. **Storage**: items are upserted by normalized URL through [`store::Store`]

pub mod api;
pub mod cleaner;
pub mod cli;
pub mod config;
pub mod dates;
pub mod error;
pub mod extraction;
pub mod feed;
pub mod identity;
pub mod links;
pub mod models;
pub mod orchestrator;
pub mod relevance;
pub mod store;
pub mod strategies;
pub mod utils;
pub mod window;

pub use error::HarvestError;
pub use orchestrator::{Harvester, RunSummary};
