//! Link and image health checks
//!
//! After a page is processed, a bounded sample of its internal links and images
//! is probed with HEAD requests. External links are never probed.

use crate::config::HealthCheckConfig;
use crate::state::{BrokenResource, ImageRecord, LinkRecord};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use reqwest::Client;
use std::panic::AssertUnwindSafe;
use std::time::Duration;

/// Outcome of probing one page's sample
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub broken_links: Vec<BrokenResource>,
    pub broken_images: Vec<BrokenResource>,
}

/// Probes resources with HEAD requests
pub struct HealthChecker {
    client: Client,
    sample_size: usize,
    probe_timeout: Duration,
    concurrency: usize,
}

impl HealthChecker {
    pub fn new(client: Client, config: &HealthCheckConfig) -> Self {
        Self {
            client,
            sample_size: config.sample_size,
            probe_timeout: config.probe_timeout(),
            concurrency: config.concurrency.max(1),
        }
    }

    /// Probes the internal links among the first `sample_size` links, and the
    /// first `sample_size` images
    ///
    /// Results keep sample order. A probe that panics or fails is recorded as
    /// broken; nothing here fails the page.
    pub async fn check(&self, links: &[LinkRecord], images: &[ImageRecord]) -> HealthReport {
        let link_urls: Vec<String> = links
            .iter()
            .take(self.sample_size)
            .filter(|l| l.is_internal)
            .map(|l| l.href.clone())
            .collect();

        let image_urls: Vec<String> = images
            .iter()
            .take(self.sample_size)
            .map(|i| i.src.clone())
            .collect();

        let (broken_links, broken_images) =
            futures::join!(self.probe_all(link_urls), self.probe_all(image_urls));

        HealthReport {
            broken_links,
            broken_images,
        }
    }

    async fn probe_all(&self, urls: Vec<String>) -> Vec<BrokenResource> {
        let mut outcomes: Vec<(usize, Option<BrokenResource>)> = stream::iter(urls.into_iter().enumerate())
            .map(|(index, url)| async move {
                let outcome = AssertUnwindSafe(self.probe(&url))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        tracing::warn!("Health probe for {} panicked", url);
                        Some(BrokenResource::network_error(url.as_str()))
                    });
                (index, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().filter_map(|(_, broken)| broken).collect()
    }

    /// Probes one URL; `None` means healthy
    pub async fn probe(&self, url: &str) -> Option<BrokenResource> {
        match self.client.head(url).timeout(self.probe_timeout).send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if status < 400 {
                    None
                } else {
                    tracing::debug!("Broken resource {}: HTTP {}", url, status);
                    Some(BrokenResource::from_status(url, status))
                }
            }
            Err(e) => {
                tracing::debug!("Probe failed for {}: {}", url, e);
                Some(BrokenResource::network_error(url))
            }
        }
    }
}
