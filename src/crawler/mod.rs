//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - Crawl policy resolution (robots.txt, crawl delay, sitemap seeds)
//! - The shared URL frontier
//! - HTTP fetching and HTML extraction
//! - Request pacing and error backoff
//! - Link and image health checks
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod health;
mod parser;
mod resolver;
mod scheduler;

pub use coordinator::{crawl, Coordinator, ProgressCallback};
pub use fetcher::{build_http_client, fetch_url, is_html_content_type, FetchResult};
pub use frontier::{Frontier, FrontierStats};
pub use health::{HealthChecker, HealthReport};
pub use parser::{parse_html, robots_directive, ParsedPage};
pub use resolver::{resolve, Resolution};
pub use scheduler::{backoff_delay, Scheduler, MAX_BACKOFF};
