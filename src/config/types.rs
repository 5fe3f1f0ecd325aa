use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for SiteSweep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub rendering: RenderingConfig,
    #[serde(rename = "health-check")]
    pub health_check: HealthCheckConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Builds a configuration with every default applied and the given start URL
    pub fn for_start_url(start_url: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.crawl.start_url = start_url.into();
        config
    }
}

/// Crawl behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Page the crawl starts from; always admitted first
    pub start_url: String,

    /// Maximum number of URLs ever admitted to the frontier
    pub max_pages: usize,

    /// Number of concurrent fetch workers
    pub concurrency: usize,

    /// Per-request timeout for pages, robots.txt and sitemaps (milliseconds)
    pub request_timeout_ms: u64,

    /// Consecutive failures that trigger a backoff pause
    pub max_consecutive_errors: u32,

    /// Crawl delay used when robots.txt declares none (milliseconds)
    pub default_crawl_delay_ms: u64,

    /// Response bodies larger than this are rejected
    pub max_response_bytes: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            start_url: String::new(),
            max_pages: 500,
            concurrency: 3,
            request_timeout_ms: 5_000,
            max_consecutive_errors: 5,
            default_crawl_delay_ms: 200,
            max_response_bytes: 10 * 1024 * 1024,
        }
    }
}

impl CrawlConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn default_crawl_delay(&self) -> Duration {
        Duration::from_millis(self.default_crawl_delay_ms)
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct UserAgentConfig {
    /// Product token matched against robots.txt `User-agent` groups
    pub crawler_name: String,

    /// Version of the crawler
    pub crawler_version: String,

    /// URL with information about the crawler
    pub contact_url: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "SiteSweep".to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/sitesweep".to_string(),
        }
    }
}

impl UserAgentConfig {
    /// Browser-like `User-Agent` header value
    ///
    /// Format: `Mozilla/5.0 (compatible; Name/Version; +ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "Mozilla/5.0 (compatible; {}/{}; +{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }

    /// Token used for robots.txt group selection
    pub fn robots_token(&self) -> &str {
        &self.crawler_name
    }
}

/// Headless rendering fallback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RenderingConfig {
    /// Whether pages with few static links are re-rendered
    pub enabled: bool,

    /// Pages with fewer statically extracted links than this are re-rendered
    pub link_threshold: usize,

    /// Hard cap on concurrently live browser instances
    pub max_pool_size: usize,

    /// How long a lease attempt may wait for capacity (milliseconds)
    pub acquire_timeout_ms: u64,

    /// Idle instances older than this are evicted (milliseconds)
    pub idle_timeout_ms: u64,

    /// Instances older than this fail validation at lease time (milliseconds)
    pub max_instance_age_ms: u64,

    /// Last-resort timer after which an instance closes itself (milliseconds)
    pub self_destruct_ms: u64,

    /// Navigation timeout inside the browser (milliseconds)
    pub navigation_timeout_ms: u64,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            link_threshold: 10,
            max_pool_size: 3,
            acquire_timeout_ms: 30_000,
            idle_timeout_ms: 30_000,
            max_instance_age_ms: 60_000,
            self_destruct_ms: 120_000,
            navigation_timeout_ms: 15_000,
        }
    }
}

impl RenderingConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }
}

/// Link/image health check configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HealthCheckConfig {
    /// Whether sampled links and images are probed at all
    pub enabled: bool,

    /// Number of links and, separately, images probed per page
    pub sample_size: usize,

    /// Timeout for each HEAD probe (milliseconds)
    pub probe_timeout_ms: u64,

    /// Probes in flight per page
    pub concurrency: usize,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_size: 10,
            probe_timeout_ms: 3_000,
            concurrency: 5,
        }
    }
}

impl HealthCheckConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the JSON file the page results are written to
    pub results_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_path: "./crawl-results.json".to_string(),
        }
    }
}
