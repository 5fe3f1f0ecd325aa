//! Crawl policy resolution: robots.txt rules, crawl delay and sitemap seeds

use crate::config::Config;
use crate::robots::{effective_crawl_delay, fetch_robots, is_allowed, ParsedRobots};
use crate::sitemap::{resolve_sitemaps, sitemap_candidates};
use crate::url::is_internal;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Everything the crawl needs to know about the site before the first page
#[derive(Debug)]
pub struct Resolution {
    /// `None` when robots.txt was unavailable, which allows everything
    pub robots: Option<ParsedRobots>,

    /// Same-host, robots-allowed sitemap URLs in sitemap order
    pub sitemap_urls: Vec<Url>,

    /// Delay to keep between request starts
    pub crawl_delay: Duration,
}

/// Resolves robots.txt and sitemaps for the site of `start_url`
///
/// Never fails: any fetch or parse problem degrades to permissive defaults.
pub async fn resolve(client: &Client, start_url: &Url, config: &Config) -> Resolution {
    let timeout = config.crawl.request_timeout();
    let user_agent = config.user_agent.robots_token();

    let robots = fetch_robots(client, start_url, timeout).await;

    let crawl_delay = effective_crawl_delay(
        robots.as_ref(),
        user_agent,
        config.crawl.default_crawl_delay(),
    );

    let declared = robots.as_ref().map(ParsedRobots::sitemaps).unwrap_or_default();
    let candidates = sitemap_candidates(start_url, &declared);
    let discovered = resolve_sitemaps(client, &candidates, timeout).await;

    let sitemap_urls = filter_seeds(discovered, start_url, robots.as_ref(), user_agent);

    tracing::info!(
        "Resolved crawl policy: robots.txt {}, crawl delay {:?}, {} sitemap URLs",
        if robots.is_some() { "found" } else { "absent" },
        crawl_delay,
        sitemap_urls.len()
    );

    Resolution {
        robots,
        sitemap_urls,
        crawl_delay,
    }
}

/// Keeps sitemap URLs on the start URL's host that robots.txt allows
fn filter_seeds(
    urls: Vec<Url>,
    start_url: &Url,
    robots: Option<&ParsedRobots>,
    user_agent: &str,
) -> Vec<Url> {
    let Some(base_host) = start_url.host_str() else {
        return Vec::new();
    };

    urls.into_iter()
        .filter(|url| {
            if !is_internal(url, base_host) {
                tracing::debug!("Ignoring off-site sitemap URL {}", url);
                return false;
            }
            is_allowed(robots, url.as_str(), user_agent)
        })
        .collect()
}
