//! Command-line interface definitions.
//!
//! All arguments can be provided via command-line flags or environment variables.

use clap::Parser;

/// Command-line arguments for one harvest run.
///
/// # Examples
///
/// ```sh
/// # Harvest with default settings
/// topic_harvester -s sources.yaml -d data/items.json -l data/run_log.jsonl
///
/// # With a settings file and an authenticated renderer
/// topic_harvester -s sources.yaml -d items.json -l log.jsonl -c settings.yaml --jina-api-key KEY
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// YAML list of configured sources
    #[arg(short, long, env = "HARVEST_SOURCES")]
    pub sources: String,

    /// JSON file holding harvested items
    #[arg(short, long, env = "HARVEST_DATA")]
    pub data: String,

    /// JSON-lines run log
    #[arg(short, long, env = "HARVEST_LOG")]
    pub log: String,

    /// Optional path to a settings YAML file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Bearer token for the rendering service
    #[arg(long, env = "JINA_API_KEY", hide_env_values = true)]
    pub jina_api_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "topic_harvester",
            "--sources",
            "./sources.yaml",
            "--data",
            "./items.json",
            "--log",
            "./run_log.jsonl",
        ]);

        assert_eq!(cli.sources, "./sources.yaml");
        assert_eq!(cli.data, "./items.json");
        assert_eq!(cli.log, "./run_log.jsonl");
        assert_eq!(cli.config, None);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "topic_harvester",
            "-s",
            "/tmp/sources.yaml",
            "-d",
            "/tmp/items.json",
            "-l",
            "/tmp/log.jsonl",
            "-c",
            "/tmp/settings.yaml",
            "--jina-api-key",
            "secret",
        ]);

        assert_eq!(cli.sources, "/tmp/sources.yaml");
        assert_eq!(cli.config.as_deref(), Some("/tmp/settings.yaml"));
        assert_eq!(cli.jina_api_key.as_deref(), Some("secret"));
    }
}
