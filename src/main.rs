//! Harvester binary: parse arguments, initialize tracing, run one harvest.
//!
//! ```sh
//! topic_harvester -s sources.yaml -d data/items.json -l data/run_log.jsonl
//! ```

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use topic_harvester::cli::Cli;
use topic_harvester::config::Settings;
use topic_harvester::store::{JsonStore, StorePaths};
use topic_harvester::Harvester;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("topic_harvester starting up");

    let args = Cli::parse();
    debug!(sources = %args.sources, data = %args.data, log = %args.log, "Parsed CLI arguments");

    let settings = Settings::load(args.config.as_deref()).await?;
    let offset = settings.local_offset()?;
    let store = Arc::new(JsonStore::new(
        StorePaths {
            sources: args.sources.into(),
            items: args.data.into(),
            log: args.log.into(),
        },
        offset,
    ));

    let harvester = Harvester::from_settings(store, settings, args.jina_api_key)?;
    match harvester.run(Utc::now()).await {
        Ok(summary) => {
            info!(
                sources = summary.sources,
                written = summary.written,
                elapsed_ms = summary.elapsed_ms as u64,
                "topic_harvester finished"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Harvest run aborted");
            Err(e.into())
        }
    }
}
