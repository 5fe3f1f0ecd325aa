//! Headless rendering fallback
//!
//! Pages whose static HTML yields too few links are re-rendered in a headless
//! browser leased from a bounded [`BrowserPool`]. The browser itself sits
//! behind the [`RenderingEngine`], [`BrowserInstance`] and [`BrowserPage`]
//! traits; the `chromium` feature provides a binding to a real Chromium.

#[cfg(feature = "chromium")]
mod chromium;
mod pool;

#[cfg(feature = "chromium")]
pub use chromium::ChromiumEngine;
pub use pool::{BrowserLease, BrowserPool, PoolSettings};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Launch arguments applied to every browser instance
pub const HARDENING_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
    "--disable-extensions",
    "--disable-background-networking",
    "--js-flags=--max-old-space-size=512",
    "--mute-audio",
    "--no-first-run",
];

/// Rendering failures
///
/// These never fail a page: the fallback call site logs them and keeps the
/// static extraction.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Page operation failed: {0}")]
    Page(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Navigation to {0} timed out")]
    Timeout(String),

    #[error("Browser disconnected")]
    Disconnected,

    #[error("No browser available within {0:?}")]
    AcquireTimeout(Duration),

    #[error("Browser pool is shut down")]
    PoolClosed,
}

/// Launches browser processes
#[async_trait]
pub trait RenderingEngine: Send + Sync {
    async fn launch(&self, args: &[String]) -> Result<Arc<dyn BrowserInstance>, RenderError>;
}

/// A running browser process
#[async_trait]
pub trait BrowserInstance: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, RenderError>;

    /// Whether the instance is still reachable
    fn is_connected(&self) -> bool;

    async fn close(&self) -> Result<(), RenderError>;
}

/// A single browser tab
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigates and waits for the network to settle, bounded by `timeout`
    async fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), RenderError>;

    /// Serialized DOM after scripts have run
    async fn content(&self) -> Result<String, RenderError>;

    async fn close(&mut self) -> Result<(), RenderError>;
}

/// Renders `url` in a fresh tab and returns the resulting DOM
///
/// The tab is closed whether or not rendering succeeded.
pub async fn render_page(
    instance: &dyn BrowserInstance,
    url: &str,
    timeout: Duration,
) -> Result<String, RenderError> {
    if !instance.is_connected() {
        return Err(RenderError::Disconnected);
    }

    let mut page = instance.new_page().await?;

    let rendered = match page.goto(url, timeout).await {
        Ok(()) => page.content().await,
        Err(e) => Err(e),
    };

    if let Err(e) = page.close().await {
        tracing::debug!("Failed to close tab for {}: {}", url, e);
    }

    rendered
}

/// The launch arguments as owned strings
pub fn hardening_args() -> Vec<String> {
    HARDENING_ARGS.iter().map(|a| a.to_string()).collect()
}
