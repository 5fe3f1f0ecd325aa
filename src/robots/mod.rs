//! Robots.txt handling module
//!
//! This module fetches and parses the site's robots.txt once per run. A missing
//! or unreachable robots.txt yields `None`, which callers treat as "allow
//! everything" with the configured default crawl delay.

mod parser;

pub use parser::ParsedRobots;

use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Longest crawl delay honoured from robots.txt; larger values are clamped
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(60);

/// Fetches robots.txt for the site that `base_url` belongs to
///
/// Any failure (timeout, network error, non-2xx status, unreadable body) is
/// logged and reported as `None`; it never aborts the crawl.
///
/// # Arguments
///
/// * `client` - The shared HTTP client
/// * `base_url` - Any URL on the site; only its origin is used
/// * `timeout` - Request timeout for the robots.txt fetch
pub async fn fetch_robots(client: &Client, base_url: &Url, timeout: Duration) -> Option<ParsedRobots> {
    let robots_url = match base_url.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!("Cannot build robots.txt URL from {}: {}", base_url, e);
            return None;
        }
    };

    tracing::debug!("Fetching {}", robots_url);

    let response = match client.get(robots_url.as_str()).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::info!("robots.txt unavailable at {}: {}", robots_url, e);
            return None;
        }
    };

    let status = response.status();
    if !status.is_success() {
        tracing::info!("robots.txt at {} returned HTTP {}", robots_url, status.as_u16());
        return None;
    }

    match response.text().await {
        Ok(body) => {
            tracing::debug!("Fetched robots.txt: {} bytes", body.len());
            Some(ParsedRobots::from_content(&body))
        }
        Err(e) => {
            tracing::warn!("Failed to read robots.txt body from {}: {}", robots_url, e);
            None
        }
    }
}

/// Checks if a URL may be fetched under optional robots rules
///
/// `None` means no robots.txt was available, which allows everything.
pub fn is_allowed(robots: Option<&ParsedRobots>, url: &str, user_agent: &str) -> bool {
    robots.map_or(true, |r| r.is_allowed(url, user_agent))
}

/// Resolves the crawl delay to apply for `user_agent`
///
/// Bot-specific directive, else wildcard directive, else `default_delay`.
/// Declared delays are clamped to [`MAX_CRAWL_DELAY`].
pub fn effective_crawl_delay(
    robots: Option<&ParsedRobots>,
    user_agent: &str,
    default_delay: Duration,
) -> Duration {
    robots
        .and_then(|r| r.crawl_delay(user_agent))
        .filter(|seconds| seconds.is_finite() && *seconds >= 0.0)
        .map(|seconds| seconds.min(MAX_CRAWL_DELAY.as_secs_f64()))
        .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
        .unwrap_or(default_delay)
}
