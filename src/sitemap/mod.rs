//! Sitemap discovery and recursive resolution
//!
//! Sitemaps come from two sources: `Sitemap:` lines in robots.txt and a fixed
//! list of conventional paths probed on the site's origin. Indexes are
//! expanded depth-first, one fetch at a time, so the resulting URL list keeps
//! each sitemap's own ordering.

mod parser;

pub use parser::{parse_sitemap, SitemapDocument, SitemapError};

use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Conventional sitemap locations probed on every site
pub const CONVENTIONAL_SITEMAP_PATHS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap-index.xml",
    "/wp-sitemap.xml",
    "/sitemap1.xml",
];

/// Index nesting deeper than this is not followed
const MAX_SITEMAP_DEPTH: usize = 5;

/// Upper bound on sitemap documents fetched in one run
const MAX_SITEMAP_FETCHES: usize = 100;

/// Builds the ordered candidate list: declared sitemaps first, then the
/// conventional paths on `base_url`'s origin
pub fn sitemap_candidates(base_url: &Url, declared: &[String]) -> Vec<String> {
    let mut candidates: Vec<String> = declared.to_vec();

    for path in CONVENTIONAL_SITEMAP_PATHS {
        if let Ok(url) = base_url.join(path) {
            candidates.push(url.to_string());
        }
    }

    candidates
}

/// Fetches and flattens sitemaps into a deduplicated list of page URLs
///
/// Each literal sitemap URL is fetched at most once, which also breaks index
/// cycles. A failure on any single sitemap is logged and skipped.
///
/// # Arguments
///
/// * `client` - The shared HTTP client
/// * `candidates` - Top-level sitemap URLs, in priority order
/// * `timeout` - Per-sitemap request timeout
pub async fn resolve_sitemaps(
    client: &Client,
    candidates: &[String],
    timeout: Duration,
) -> Vec<Url> {
    let mut seen_sitemaps: HashSet<String> = HashSet::new();
    let mut seen_pages: HashSet<String> = HashSet::new();
    let mut pages: Vec<Url> = Vec::new();
    let mut fetches = 0usize;

    // Stack of (sitemap URL, depth); reversed pushes keep document order
    let mut pending: Vec<(String, usize)> =
        candidates.iter().rev().map(|c| (c.clone(), 0)).collect();

    while let Some((sitemap_url, depth)) = pending.pop() {
        if !seen_sitemaps.insert(sitemap_url.clone()) {
            tracing::debug!("Sitemap {} already parsed, skipping", sitemap_url);
            continue;
        }

        if fetches >= MAX_SITEMAP_FETCHES {
            tracing::warn!(
                "Sitemap fetch limit ({}) reached, ignoring remaining sitemaps",
                MAX_SITEMAP_FETCHES
            );
            break;
        }
        fetches += 1;

        let document = match fetch_sitemap(client, &sitemap_url, timeout).await {
            Ok(document) => document,
            Err(SitemapError::Status(404)) => {
                tracing::debug!("No sitemap at {}", sitemap_url);
                continue;
            }
            Err(e) => {
                tracing::warn!("Skipping sitemap {}: {}", sitemap_url, e);
                continue;
            }
        };

        tracing::debug!(
            "Parsed {}: {} page URLs, {} nested sitemaps",
            sitemap_url,
            document.page_urls.len(),
            document.nested_sitemaps.len()
        );

        for location in &document.page_urls {
            match crate::url::normalize_url(location) {
                Ok(url) => {
                    if seen_pages.insert(url.to_string()) {
                        pages.push(url);
                    }
                }
                Err(e) => tracing::debug!("Ignoring sitemap entry {}: {}", location, e),
            }
        }

        if depth + 1 > MAX_SITEMAP_DEPTH {
            if document.is_index() {
                tracing::warn!(
                    "Sitemap index {} nested deeper than {}, not following",
                    sitemap_url,
                    MAX_SITEMAP_DEPTH
                );
            }
            continue;
        }

        for nested in document.nested_sitemaps.into_iter().rev() {
            pending.push((nested, depth + 1));
        }
    }

    tracing::info!(
        "Resolved {} unique URLs from {} sitemap documents",
        pages.len(),
        fetches
    );

    pages
}

/// Fetches and parses a single sitemap document
pub async fn fetch_sitemap(
    client: &Client,
    sitemap_url: &str,
    timeout: Duration,
) -> Result<SitemapDocument, SitemapError> {
    let response = client
        .get(sitemap_url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| SitemapError::Http(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SitemapError::Status(status.as_u16()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| SitemapError::Http(e.to_string()))?;

    parse_sitemap(&body)
}
