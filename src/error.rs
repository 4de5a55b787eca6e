//! Typed errors for the harvesting pipeline.
//!
//! Each enum maps onto one unit of failure: a render call for one candidate,
//! the primary document of one source, or the storage collaborator. Only
//! [`StoreError::Configuration`] is allowed to end a whole run.

use thiserror::Error;

/// Errors raised by the remote rendering capability.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The service answered with a non-2xx status.
    #[error("[JINA_HTTP_{status}] {snippet}")]
    Status { status: u16, snippet: String },

    /// Transport failure (DNS, TLS, connection reset, body read).
    #[error("render request failed for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The per-call timeout elapsed.
    #[error("render timed out for {url}")]
    Timeout { url: String },

    /// The shared rate gate was closed; no further calls are admitted.
    #[error("render gate closed")]
    GateClosed(#[from] tokio::sync::AcquireError),
}

/// Errors fetching or decoding the primary document of a source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP {status} - {url}")]
    Status { status: u16, url: String },

    #[error("request failed for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("malformed feed: {0}")]
    Feed(#[from] FeedError),

    #[error("malformed response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Errors from the feed parser.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("XML error at byte {position}: {message}")]
    Xml { position: u64, message: String },
}

/// Errors from the storage collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A resource the run cannot proceed without is missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("storage I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Errors that end a harvest run.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid rule pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type RenderResult<T> = Result<T, RenderError>;
pub type StoreResult<T> = Result<T, StoreError>;
