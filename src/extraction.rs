//! Access to the remote rendering service.
//!
//! The renderer turns any URL into clean markdown. Its provider enforces a
//! rate policy, so every call, whichever strategy or source issues it, goes
//! through one shared [`RateGate`]: a global concurrency ceiling plus a fixed
//! pause before each call.
//!
//! # Architecture
//!
//! - [`Renderer`]: the capability itself (one HTTP call, no limiting)
//! - [`JinaRenderer`]: the reqwest-backed implementation
//! - [`RateGate`]: the shared limiter handle
//! - [`ExtractionClient`]: a renderer paired with the gate; what strategies use

use crate::error::{RenderError, RenderResult};
use crate::identity::ensure_https;
use crate::utils::head_chars;
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

/// Characters of an error body kept in a [`RenderError::Status`].
const ERROR_SNIPPET_CHARS: usize = 250;
/// Slack added to the service-side timeout for the network round trip.
const NETWORK_SLACK_SECS: u64 = 5;

/// Per-call options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub no_cache: bool,
    pub with_links_summary: bool,
    pub timeout_secs: u64,
}

impl RenderOptions {
    /// Uncached article render.
    pub fn article(timeout_secs: u64) -> Self {
        Self {
            no_cache: true,
            with_links_summary: false,
            timeout_secs,
        }
    }

    /// Uncached render of a list page, including the links summary.
    pub fn list_page(timeout_secs: u64) -> Self {
        Self {
            with_links_summary: true,
            ..Self::article(timeout_secs)
        }
    }
}

/// Render a URL to markdown text.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str, options: RenderOptions) -> RenderResult<String>;
}

/// Renderer backed by the Jina reader HTTP API.
#[derive(Clone)]
pub struct JinaRenderer {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl fmt::Debug for JinaRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JinaRenderer")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.api_key.is_some())
            .finish()
    }
}

impl JinaRenderer {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            client,
            base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }
}

#[async_trait]
impl Renderer for JinaRenderer {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn render(&self, url: &str, options: RenderOptions) -> RenderResult<String> {
        let final_url = format!("{}{}", self.base_url, ensure_https(url));
        let mut req = self
            .client
            .get(&final_url)
            .header("x-respond-with", "markdown")
            .header("x-timeout", options.timeout_secs.to_string())
            .timeout(Duration::from_secs(options.timeout_secs + NETWORK_SLACK_SECS));
        if options.no_cache {
            req = req.header("x-no-cache", "true");
        }
        if options.with_links_summary {
            req = req.header("X-With-Links-Summary", "true");
        }
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let network = |source: reqwest::Error| {
            if source.is_timeout() {
                RenderError::Timeout {
                    url: url.to_string(),
                }
            } else {
                RenderError::Network {
                    url: url.to_string(),
                    source,
                }
            }
        };

        let resp = req.send().await.map_err(network)?;
        let status = resp.status();
        let body = resp.text().await.map_err(network)?;
        if !status.is_success() {
            return Err(RenderError::Status {
                status: status.as_u16(),
                snippet: head_chars(&body, ERROR_SNIPPET_CHARS).to_string(),
            });
        }
        debug!(bytes = body.len(), "Rendered page");
        Ok(body)
    }
}

/// Shared limiter for render calls: at most `concurrency` calls in flight,
/// each preceded by `delay`.
///
/// Cloning yields another handle onto the same limiter.
#[derive(Debug, Clone)]
pub struct RateGate {
    permits: Arc<Semaphore>,
    delay: Duration,
}

impl RateGate {
    pub fn new(concurrency: usize, delay: Duration) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            delay,
        }
    }

    /// Wait for a slot, then serve the mandatory delay while holding it.
    /// The slot is released when the returned permit is dropped.
    pub async fn acquire(&self) -> RenderResult<SemaphorePermit<'_>> {
        let permit = self.permits.acquire().await?;
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
        Ok(permit)
    }

    /// Stop admitting calls. Waiting and later callers get
    /// [`RenderError::GateClosed`]; calls already in flight finish.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

/// A renderer whose every call passes through the shared [`RateGate`].
#[derive(Clone)]
pub struct ExtractionClient {
    renderer: Arc<dyn Renderer>,
    gate: RateGate,
    timeout_secs: u64,
}

impl fmt::Debug for ExtractionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionClient")
            .field("gate", &self.gate)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ExtractionClient {
    pub fn new(renderer: Arc<dyn Renderer>, gate: RateGate, timeout_secs: u64) -> Self {
        Self {
            renderer,
            gate,
            timeout_secs,
        }
    }

    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    /// Render an article page.
    pub async fn read_article(&self, url: &str) -> RenderResult<String> {
        self.render(url, RenderOptions::article(self.timeout_secs)).await
    }

    /// Render a list page with its links summary.
    pub async fn read_list_page(&self, url: &str) -> RenderResult<String> {
        self.render(url, RenderOptions::list_page(self.timeout_secs)).await
    }

    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn render(&self, url: &str, options: RenderOptions) -> RenderResult<String> {
        let _permit = self.gate.acquire().await?;
        let t0 = Instant::now();
        let res = self.renderer.render(url, options).await;
        if let Err(e) = &res {
            warn!(elapsed_ms = t0.elapsed().as_millis() as u64, error = %e, "Render call failed");
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingRenderer {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Renderer for CountingRenderer {
        async fn render(&self, url: &str, _options: RenderOptions) -> RenderResult<String> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(format!("rendered {url}"))
        }
    }

    #[tokio::test]
    async fn concurrency_ceiling_holds_across_callers() {
        let renderer = Arc::new(CountingRenderer {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let client = ExtractionClient::new(renderer.clone(), RateGate::new(2, Duration::ZERO), 5);
        let calls = (0..8).map(|i| {
            let client = client.clone();
            async move { client.read_article(&format!("https://x.com/{i}")).await }
        });
        let results = futures::future::join_all(calls).await;
        assert!(results.iter().all(|r| r.is_ok()));
        assert!(renderer.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(client.gate().available(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn every_call_waits_the_mandatory_delay() {
        let gate = RateGate::new(1, Duration::from_millis(650));
        let t0 = tokio::time::Instant::now();
        drop(gate.acquire().await.unwrap());
        drop(gate.acquire().await.unwrap());
        assert!(t0.elapsed() >= Duration::from_millis(1300));
    }

    #[tokio::test]
    async fn closed_gate_fails_calls_instead_of_panicking() {
        let renderer = Arc::new(CountingRenderer {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let client = ExtractionClient::new(renderer.clone(), RateGate::new(1, Duration::ZERO), 5);
        client.gate().close();
        let err = client.read_article("https://x.com/a").await.unwrap_err();
        assert!(matches!(err, RenderError::GateClosed(_)));
        assert_eq!(renderer.peak.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn list_page_options_request_links_summary() {
        let o = RenderOptions::list_page(25);
        assert!(o.with_links_summary && o.no_cache);
        assert!(!RenderOptions::article(25).with_links_summary);
    }
}
