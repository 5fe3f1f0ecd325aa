//! Crawler coordinator - main crawl orchestration logic
//!
//! This module ties the crawl together:
//! - Resolving robots.txt and sitemaps, then seeding the frontier
//! - Running a fixed number of workers over the shared frontier
//! - Processing each page in isolation, with an optional rendering fallback
//! - Collecting one `PageResult` per visited URL

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, fetch_url, is_html_content_type, FetchResult};
use crate::crawler::frontier::Frontier;
use crate::crawler::health::HealthChecker;
use crate::crawler::parser::{parse_html, robots_directive, ParsedPage};
use crate::crawler::resolver::{self, Resolution};
use crate::crawler::scheduler::Scheduler;
use crate::render::{render_page, BrowserPool, PoolSettings, RenderingEngine};
use crate::robots::{is_allowed, ParsedRobots};
use crate::state::PageResult;
use crate::url::{extract_host, normalize_url};
use crate::{ConfigError, Result, SweepError};
use futures::FutureExt;
use reqwest::Client;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use url::Url;

/// Called with the running visited-page count after each page
pub type ProgressCallback = Arc<dyn Fn(usize) + Send + Sync>;

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    client: Client,
    rendering_engine: Option<Arc<dyn RenderingEngine>>,
    progress: Option<ProgressCallback>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The validated crawl configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(SweepError)` - The HTTP client could not be built
    pub fn new(config: Config) -> Result<Self> {
        let client = build_http_client(&config.user_agent)?;

        Ok(Self {
            config: Arc::new(config),
            client,
            rendering_engine: default_engine(),
            progress: None,
        })
    }

    /// Uses `engine` for the rendering fallback instead of the built-in one
    pub fn with_rendering_engine(mut self, engine: Arc<dyn RenderingEngine>) -> Self {
        self.rendering_engine = Some(engine);
        self
    }

    /// Registers a callback invoked with the visited count after each page
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves the crawl policy without crawling
    pub async fn resolve(&self) -> Result<(Url, Resolution)> {
        let start_url = self.start_url()?;
        let resolution = resolver::resolve(&self.client, &start_url, &self.config).await;
        Ok((start_url, resolution))
    }

    /// Runs the crawl to completion
    ///
    /// The run ends when the frontier drains or the page cap is reached.
    /// Per-page failures are recorded on their `PageResult`; only structural
    /// failures (a broken frontier, a crashed worker) return `Err`. A failing
    /// worker aborts the frontier so the remaining workers stop.
    pub async fn run(&self) -> Result<Vec<PageResult>> {
        let start_time = Instant::now();
        let (start_url, resolution) = self.resolve().await?;
        let base_host = extract_host(&start_url).ok_or(crate::UrlError::MissingHost)?;

        let frontier = Frontier::new(self.config.crawl.max_pages);
        let seeded = frontier.seed(&start_url, &resolution.sitemap_urls)?;

        tracing::info!(
            "Starting crawl of {} with {} workers, {} URLs seeded (cap {})",
            start_url,
            self.config.crawl.concurrency,
            seeded,
            self.config.crawl.max_pages
        );

        let context = Arc::new(CrawlContext {
            config: Arc::clone(&self.config),
            client: self.client.clone(),
            base_host,
            scheduler: Scheduler::new(
                resolution.crawl_delay,
                self.config.crawl.max_consecutive_errors,
            ),
            robots: resolution.robots,
            frontier,
            health: self
                .config
                .health_check
                .enabled
                .then(|| HealthChecker::new(self.client.clone(), &self.config.health_check)),
            pool: self.build_pool(),
            results: Mutex::new(Vec::new()),
            progress: self.progress.clone(),
            started: start_time,
        });

        let workers: Vec<_> = (0..self.config.crawl.concurrency.max(1))
            .map(|id| {
                let context = Arc::clone(&context);
                tokio::spawn(async move {
                    let outcome = match AssertUnwindSafe(context.worker_loop(id))
                        .catch_unwind()
                        .await
                    {
                        Ok(outcome) => outcome,
                        Err(panic) => Err(SweepError::Worker(format!(
                            "worker {} panicked: {}",
                            id,
                            panic_message(panic.as_ref())
                        ))),
                    };
                    if outcome.is_err() {
                        // Its URL may still be in flight; release the others
                        context.frontier.abort();
                    }
                    outcome
                })
            })
            .collect();

        let mut failure: Option<SweepError> = None;
        for worker in workers {
            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(e) => Err(SweepError::Worker(e.to_string())),
            };
            if let Err(e) = outcome {
                tracing::error!("Crawl worker failed: {}", e);
                failure.get_or_insert(e);
            }
        }

        if let Some(pool) = &context.pool {
            pool.shutdown().await;
        }

        if let Some(e) = failure {
            return Err(e);
        }

        let results = {
            let mut results = context.lock_results()?;
            std::mem::take(&mut *results)
        };

        tracing::info!(
            "Crawl completed: {} pages in {:?}",
            results.len(),
            start_time.elapsed()
        );

        Ok(results)
    }

    fn start_url(&self) -> Result<Url> {
        let raw = self.config.crawl.start_url.trim();
        if raw.is_empty() {
            return Err(ConfigError::Validation("crawl.start-url is required".to_string()).into());
        }
        Ok(normalize_url(raw)?)
    }

    fn build_pool(&self) -> Option<BrowserPool> {
        if !self.config.rendering.enabled {
            return None;
        }

        match &self.rendering_engine {
            Some(engine) => Some(BrowserPool::new(
                Arc::clone(engine),
                PoolSettings::from_config(&self.config.rendering),
            )),
            None => {
                tracing::warn!(
                    "Rendering fallback enabled but no rendering engine is available; \
                     build with the `chromium` feature"
                );
                None
            }
        }
    }
}

#[cfg(feature = "chromium")]
fn default_engine() -> Option<Arc<dyn RenderingEngine>> {
    Some(Arc::new(crate::render::ChromiumEngine))
}

#[cfg(not(feature = "chromium"))]
fn default_engine() -> Option<Arc<dyn RenderingEngine>> {
    None
}

/// Run-scoped state shared by all workers
struct CrawlContext {
    config: Arc<Config>,
    client: Client,
    base_host: String,
    robots: Option<ParsedRobots>,
    frontier: Frontier,
    scheduler: Scheduler,
    health: Option<HealthChecker>,
    pool: Option<BrowserPool>,
    results: Mutex<Vec<PageResult>>,
    progress: Option<ProgressCallback>,
    started: Instant,
}

impl CrawlContext {
    async fn worker_loop(&self, worker_id: usize) -> Result<()> {
        tracing::debug!("Worker {} started", worker_id);
        let user_agent = self.config.user_agent.robots_token();

        while let Some(url) = self.frontier.next().await? {
            if !is_allowed(self.robots.as_ref(), url.as_str(), user_agent) {
                tracing::info!(url = %url, "Disallowed by robots.txt, skipping");
                self.frontier.skip(&url)?;
                continue;
            }

            self.scheduler.wait_for_slot().await;
            tracing::debug!(worker = worker_id, url = %url, "Processing");

            let result = match AssertUnwindSafe(self.process_url(&url)).catch_unwind().await {
                Ok(outcome) => outcome?,
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    tracing::error!(url = %url, "Processing panicked: {}", message);
                    PageResult::failed(url.as_str(), 0, format!("Processing panicked: {}", message))
                }
            };

            let failed = result.is_error();
            if let Some(error) = &result.error {
                tracing::warn!(url = %url, status = result.status_code, "Page failed: {}", error);
            }

            self.frontier.mark_visited(&url)?;
            let visited = {
                let mut results = self.lock_results()?;
                results.push(result);
                results.len()
            };
            self.report_progress(visited);

            if failed {
                self.scheduler.record_failure_and_wait().await;
            } else {
                self.scheduler.record_success();
            }
        }

        tracing::debug!("Worker {} finished", worker_id);
        Ok(())
    }

    /// Fetches and processes one URL into its result
    ///
    /// Fetch failures become error results; `Err` is reserved for frontier
    /// failures while admitting discovered links.
    async fn process_url(&self, url: &Url) -> Result<PageResult> {
        let started = Instant::now();
        let fetched = fetch_url(
            &self.client,
            url.as_str(),
            self.config.crawl.request_timeout(),
            self.config.crawl.max_response_bytes,
        )
        .await;

        let mut result = match fetched {
            FetchResult::Success {
                final_url,
                status_code,
                content_type,
                body,
                byte_size,
                x_robots_tag,
            } => {
                let mut result = PageResult::new(url.as_str());
                result.status_code = status_code;
                result.byte_size = byte_size;
                if !content_type.is_empty() {
                    result.content_type = Some(content_type.clone());
                }
                if final_url != url.as_str() {
                    result.final_url = Some(final_url.clone());
                }

                if is_html_content_type(&content_type) {
                    let page_url = Url::parse(&final_url).unwrap_or_else(|_| url.clone());
                    self.process_html(&mut result, &page_url, &body, x_robots_tag.as_deref())
                        .await?;
                }
                result
            }
            FetchResult::HttpError { status_code } => {
                PageResult::failed(url.as_str(), status_code, format!("HTTP {}", status_code))
            }
            FetchResult::NetworkError { error, .. } => PageResult::failed(url.as_str(), 0, error),
            FetchResult::TooLarge { status_code, limit } => PageResult::failed(
                url.as_str(),
                status_code,
                format!("Response exceeds {} bytes", limit),
            ),
        };

        result.load_time_ms = started.elapsed().as_millis() as u64;
        Ok(result)
    }

    async fn process_html(
        &self,
        result: &mut PageResult,
        page_url: &Url,
        body: &str,
        x_robots_tag: Option<&str>,
    ) -> Result<()> {
        let mut parsed = parse_html(body, page_url, &self.base_host);
        result.meta_robots = parsed.meta_robots.clone();

        if robots_directive(x_robots_tag, "noindex") || parsed.is_noindex() {
            tracing::debug!(url = %page_url, "Page is noindex, not extracting links");
            result.noindex = true;
            result.title = parsed.title;
            return Ok(());
        }

        if let Some(rendered) = self.render_fallback(page_url, &parsed).await {
            parsed.links = rendered.links;
            parsed.images = rendered.images;
            result.rendered = true;
        }

        let nofollow = robots_directive(x_robots_tag, "nofollow") || parsed.is_nofollow();

        result.title = parsed.title;
        result.meta_description = parsed.meta_description;
        result.canonical = parsed.canonical;
        result.h1 = parsed.h1;
        result.h2 = parsed.h2;
        result.word_count = parsed.word_count;
        result.links = parsed.links;
        result.images = parsed.images;

        if !nofollow {
            self.enqueue_links(result)?;
        }

        if let Some(health) = &self.health {
            let report = health.check(&result.links, &result.images).await;
            result.broken_links = report.broken_links;
            result.broken_images = report.broken_images;
        }

        Ok(())
    }

    /// Re-renders a page that under-discovered links
    ///
    /// # Returns
    ///
    /// The rendered extraction, only when it found strictly more links than
    /// the static one
    async fn render_fallback(&self, page_url: &Url, parsed: &ParsedPage) -> Option<ParsedPage> {
        let pool = self.pool.as_ref()?;
        if parsed.links.len() >= self.config.rendering.link_threshold {
            return None;
        }

        let target = page_url.to_string();
        let timeout = self.config.rendering.navigation_timeout();
        let rendering = pool
            .with_instance(move |instance| async move {
                render_page(instance.as_ref(), &target, timeout).await
            })
            .await;

        match rendering {
            Ok(html) => {
                let rendered = parse_html(&html, page_url, &self.base_host);
                tracing::debug!(
                    url = %page_url,
                    rendered = rendered.links.len(),
                    static_links = parsed.links.len(),
                    "Rendering fallback finished"
                );
                (rendered.links.len() > parsed.links.len()).then_some(rendered)
            }
            Err(e) => {
                tracing::warn!(url = %page_url, "Rendering fallback unavailable: {}", e);
                None
            }
        }
    }

    /// Offers the page's followable links to the frontier
    ///
    /// Stops at the first rejection once the page cap is full.
    fn enqueue_links(&self, result: &PageResult) -> Result<()> {
        let user_agent = self.config.user_agent.robots_token();

        for link in result.followable_links() {
            let Ok(target) = normalize_url(&link.href) else {
                continue;
            };
            if !is_allowed(self.robots.as_ref(), target.as_str(), user_agent) {
                continue;
            }
            if !self.frontier.enqueue(&target)? && self.frontier.is_full()? {
                tracing::debug!("Page cap reached, no further links admitted");
                break;
            }
        }

        Ok(())
    }

    fn report_progress(&self, visited: usize) {
        if let Some(progress) = &self.progress {
            progress(visited);
        }

        if visited % 10 == 0 {
            let elapsed = self.started.elapsed();
            tracing::info!(
                "Progress: {} pages crawled, {:.2} pages/sec",
                visited,
                visited as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
            );
        }
    }

    fn lock_results(&self) -> Result<std::sync::MutexGuard<'_, Vec<PageResult>>> {
        self.results
            .lock()
            .map_err(|_| SweepError::Worker("result set lock poisoned".to_string()))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Runs a crawl with the given configuration
///
/// # Example
///
/// ```no_run
/// use sitesweep::config::Config;
/// use sitesweep::crawler::crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let results = crawl(Config::for_start_url("https://example.com/")).await?;
/// println!("{} pages", results.len());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: Config) -> Result<Vec<PageResult>> {
    Coordinator::new(config)?.run().await
}
