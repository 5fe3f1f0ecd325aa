//! SiteSweep: a polite, concurrent single-site crawl engine
//!
//! This crate discovers a site's pages through robots.txt, sitemaps and
//! link-following, fetches them with a bounded pool of workers that honour
//! crawl-delay and back off under host instability, and falls back to a pooled
//! headless browser when static HTML under-discovers links.

pub mod config;
pub mod crawler;
pub mod output;
pub mod render;
pub mod robots;
pub mod sitemap;
pub mod state;
pub mod url;

use thiserror::Error;

/// Run-fatal errors
///
/// Per-page failures never surface here; they are recorded on the affected
/// [`state::PageResult`]. Anything of this type aborts the whole crawl.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Frontier failure: {0}")]
    Frontier(String),

    #[error("Crawl worker failed: {0}")]
    Worker(String),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for crawl-level operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{crawl, Coordinator};
pub use state::PageResult;
pub use crate::url::{is_internal, normalize_url};
