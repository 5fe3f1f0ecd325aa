//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! resolve, seed, crawl cycle end-to-end.

use async_trait::async_trait;
use sitesweep::config::{load_config, Config};
use sitesweep::crawler::Coordinator;
use sitesweep::render::{BrowserInstance, BrowserPage, RenderError, RenderingEngine};
use sitesweep::{PageResult, SweepError};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a fast test configuration for the mock server's site
fn create_test_config(server: &MockServer) -> Config {
    let mut config = Config::for_start_url(format!("{}/", server.uri()));
    config.crawl.default_crawl_delay_ms = 0;
    config.crawl.request_timeout_ms = 2_000;
    config.health_check.enabled = false;
    config
}

/// An HTML page response
fn html_page(title: &str, body: &str) -> ResponseTemplate {
    let document = format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, body
    );
    ResponseTemplate::new(200).set_body_raw(document.into_bytes(), "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn paths(results: &[PageResult]) -> Vec<String> {
    results
        .iter()
        .map(|r| Url::parse(&r.url).unwrap().path().to_string())
        .collect()
}

fn find<'a>(results: &'a [PageResult], route: &str) -> &'a PageResult {
    results
        .iter()
        .find(|r| Url::parse(&r.url).unwrap().path() == route)
        .unwrap_or_else(|| panic!("no result for {}", route))
}

#[tokio::test]
async fn test_sample_site_respects_cap_and_skips_external() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        html_page(
            "A",
            r#"<a href="/b">B</a>
               <a href="/c">C</a>
               <a href="https://external.invalid/d" rel="nofollow">D</a>"#,
        ),
    )
    .await;
    mount_page(&server, "/b", html_page("B", "<p>page b</p>")).await;
    mount_page(&server, "/c", html_page("C", "<p>page c</p>")).await;

    let mut config = create_test_config(&server);
    config.crawl.max_pages = 3;

    let results = Coordinator::new(config).unwrap().run().await.unwrap();

    let mut visited = paths(&results);
    visited.sort();
    assert_eq!(visited, vec!["/", "/b", "/c"]);

    let home = find(&results, "/");
    assert_eq!(home.status_code, 200);
    assert_eq!(home.title.as_deref(), Some("A"));
    assert_eq!(home.links.len(), 3);
    let external = home.links.iter().find(|l| !l.is_internal).unwrap();
    assert!(external.nofollow);
}

#[tokio::test]
async fn test_robots_disallowed_page_is_never_fetched() {
    let server = MockServer::start().await;

    mount_robots(&server, "User-agent: *\nDisallow: /private/\n").await;
    mount_page(
        &server,
        "/",
        html_page(
            "Home",
            r#"<a href="/private/page">Secret</a><a href="/public">Public</a>"#,
        ),
    )
    .await;
    mount_page(&server, "/public", html_page("Public", "")).await;
    Mock::given(method("GET"))
        .and(path("/private/page"))
        .respond_with(html_page("Secret", ""))
        .expect(0)
        .mount(&server)
        .await;

    let results = Coordinator::new(create_test_config(&server))
        .unwrap()
        .run()
        .await
        .unwrap();

    let visited = paths(&results);
    assert!(visited.contains(&"/public".to_string()));
    assert!(!visited.iter().any(|p| p.starts_with("/private/")));
}

/// Serves a page and records when each request arrived
struct TimedPage {
    body: String,
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl Respond for TimedPage {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        html_page("Timed", &self.body)
    }
}

#[tokio::test]
async fn test_crawl_delay_spaces_requests() {
    let server = MockServer::start().await;
    let arrivals = Arc::new(Mutex::new(Vec::new()));
    let delay = Duration::from_millis(500);

    mount_robots(&server, "User-agent: *\nCrawl-delay: 0.5\n").await;
    let pages = [
        ("/", r#"<a href="/a">A</a><a href="/b">B</a><a href="/c">C</a>"#),
        ("/a", ""),
        ("/b", ""),
        ("/c", ""),
    ];
    for (route, body) in pages {
        let responder = TimedPage {
            body: body.to_string(),
            arrivals: Arc::clone(&arrivals),
        };
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(responder)
            .mount(&server)
            .await;
    }

    let mut config = create_test_config(&server);
    config.crawl.concurrency = 3;

    let results = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(results.len(), 4);

    let mut arrivals = arrivals.lock().unwrap().clone();
    arrivals.sort();
    assert_eq!(arrivals.len(), 4);

    // Slots are reserved before the send, so allow a little network jitter
    let tolerance = Duration::from_millis(50);
    for pair in arrivals.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(
            gap + tolerance >= delay,
            "requests started {:?} apart with a 0.5s crawl delay",
            gap
        );
    }
}

/// Serves an endless site: every page links to ten deeper pages
struct LinkFarm;

impl Respond for LinkFarm {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let here = request.url.path().trim_end_matches('/').to_string();
        let links: String = (0..10)
            .map(|i| format!(r#"<a href="{}/{}">page {}</a>"#, here, i, i))
            .collect();
        html_page("Farm", &links)
    }
}

#[tokio::test]
async fn test_page_cap_terminates_large_site() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(LinkFarm)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config.crawl.max_pages = 15;
    config.crawl.concurrency = 4;

    let results = tokio::time::timeout(
        Duration::from_secs(30),
        Coordinator::new(config).unwrap().run(),
    )
    .await
    .expect("crawl should terminate at the page cap")
    .unwrap();

    assert_eq!(results.len(), 15);
    let unique: HashSet<&str> = results.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(unique.len(), 15);
}

#[tokio::test]
async fn test_worker_failure_stops_the_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(LinkFarm)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config.crawl.max_pages = 50;
    config.crawl.concurrency = 3;
    config.crawl.default_crawl_delay_ms = 100;

    let coordinator = Coordinator::new(config).unwrap().with_progress(|visited| {
        if visited == 1 {
            panic!("progress sink failed");
        }
    });

    let outcome = tokio::time::timeout(Duration::from_secs(10), coordinator.run())
        .await
        .expect("run should return once a worker fails");

    match outcome {
        Err(SweepError::Worker(message)) => assert!(message.contains("progress sink failed")),
        other => panic!("expected a worker failure, got {:?}", other.map(|r| r.len())),
    }

    let page_requests = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path() != "/robots.txt" && !r.url.path().ends_with(".xml"))
        .count();
    assert!(
        page_requests < 10,
        "{} pages fetched after the failing worker",
        page_requests
    );
}

#[tokio::test]
async fn test_failed_pages_do_not_stop_the_crawl() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        html_page(
            "Home",
            r#"<a href="/slow">Slow</a><a href="/broken">Broken</a><a href="/ok">Ok</a>"#,
        ),
    )
    .await;
    mount_page(
        &server,
        "/slow",
        html_page("Slow", "").set_delay(Duration::from_secs(3)),
    )
    .await;
    mount_page(&server, "/broken", ResponseTemplate::new(500)).await;
    mount_page(&server, "/ok", html_page("Ok", "")).await;

    let mut config = create_test_config(&server);
    config.crawl.request_timeout_ms = 300;

    let results = Coordinator::new(config).unwrap().run().await.unwrap();
    assert_eq!(results.len(), 4);

    let slow = find(&results, "/slow");
    assert!(slow.is_error());
    assert_eq!(slow.status_code, 0);

    let broken = find(&results, "/broken");
    assert!(broken.is_error());
    assert_eq!(broken.status_code, 500);

    let ok = find(&results, "/ok");
    assert!(!ok.is_error());
    assert_eq!(ok.title.as_deref(), Some("Ok"));
}

#[tokio::test]
async fn test_client_errors_are_recorded_not_failed() {
    let server = MockServer::start().await;

    mount_page(&server, "/", html_page("Home", r#"<a href="/gone">Gone</a>"#)).await;

    let results = Coordinator::new(create_test_config(&server))
        .unwrap()
        .run()
        .await
        .unwrap();

    let gone = find(&results, "/gone");
    assert_eq!(gone.status_code, 404);
    assert!(!gone.is_error());
}

#[tokio::test]
async fn test_sitemap_urls_seed_in_order_after_start_url() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, &format!("User-agent: *\nSitemap: {}/index.xml\n", base)).await;
    Mock::given(method("GET"))
        .and(path("/index.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <sitemap><loc>{0}/first.xml</loc></sitemap>
  <sitemap><loc>{0}/second.xml</loc></sitemap>
</sitemapindex>"#,
            base
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/first.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{0}/s1</loc></url>
  <url><loc>{0}/s2</loc></url>
</urlset>"#,
            base
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<urlset><url><loc>broken"))
        .mount(&server)
        .await;

    mount_page(&server, "/", html_page("Home", "")).await;
    mount_page(&server, "/s1", html_page("S1", "")).await;
    mount_page(&server, "/s2", html_page("S2", "")).await;

    let mut config = create_test_config(&server);
    config.crawl.concurrency = 1;
    config.crawl.max_pages = 2;

    let results = Coordinator::new(config).unwrap().run().await.unwrap();

    assert_eq!(paths(&results), vec!["/", "/s1"]);
}

#[tokio::test]
async fn test_noindex_pages_are_recorded_without_links() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        html_page("Home", r#"<a href="/hidden">Hidden</a><a href="/tagged">Tagged</a>"#),
    )
    .await;
    mount_page(
        &server,
        "/hidden",
        ResponseTemplate::new(200).set_body_raw(
            r#"<html><head><meta name="robots" content="noindex"><title>Hidden</title></head>
               <body><a href="/secret">Secret</a></body></html>"#
                .as_bytes()
                .to_vec(),
            "text/html",
        ),
    )
    .await;
    mount_page(
        &server,
        "/tagged",
        html_page("Tagged", r#"<a href="/secret">Secret</a>"#).insert_header("x-robots-tag", "noindex"),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/secret"))
        .respond_with(html_page("Secret", ""))
        .expect(0)
        .mount(&server)
        .await;

    let results = Coordinator::new(create_test_config(&server))
        .unwrap()
        .run()
        .await
        .unwrap();

    let hidden = find(&results, "/hidden");
    assert!(hidden.noindex);
    assert!(hidden.links.is_empty());
    assert_eq!(hidden.title.as_deref(), Some("Hidden"));

    let tagged = find(&results, "/tagged");
    assert!(tagged.noindex);
    assert!(tagged.links.is_empty());
}

#[tokio::test]
async fn test_page_level_nofollow_stops_link_admission() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        ResponseTemplate::new(200).set_body_raw(
            r#"<html><head><meta name="robots" content="nofollow"></head>
               <body><a href="/next">Next</a></body></html>"#
                .as_bytes()
                .to_vec(),
            "text/html",
        ),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/next"))
        .respond_with(html_page("Next", ""))
        .expect(0)
        .mount(&server)
        .await;

    let results = Coordinator::new(create_test_config(&server))
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].links.len(), 1);
}

#[tokio::test]
async fn test_health_check_reports_broken_links_and_images() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/",
        html_page(
            "Home",
            r#"<a href="/fine">Fine</a>
               <a href="/missing">Missing</a>
               <img src="/logo.png" alt="Logo">"#,
        ),
    )
    .await;
    Mock::given(method("HEAD"))
        .and(path("/fine"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/logo.png"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut config = create_test_config(&server);
    config.crawl.max_pages = 1;
    config.health_check.enabled = true;

    let results = Coordinator::new(config).unwrap().run().await.unwrap();
    let home = find(&results, "/");

    assert_eq!(home.broken_links.len(), 1);
    assert!(home.broken_links[0].url.ends_with("/missing"));
    assert_eq!(home.broken_links[0].status, Some(404));
    assert_eq!(home.broken_images.len(), 1);
    assert_eq!(home.broken_images[0].status, Some(503));
}

#[tokio::test]
async fn test_progress_callback_counts_visited_pages() {
    let server = MockServer::start().await;

    mount_page(&server, "/", html_page("Home", r#"<a href="/a">A</a><a href="/b">B</a>"#)).await;
    mount_page(&server, "/a", html_page("A", "")).await;
    mount_page(&server, "/b", html_page("B", "")).await;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);

    let results = Coordinator::new(create_test_config(&server))
        .unwrap()
        .with_progress(move |visited| recorder.lock().unwrap().push(visited))
        .run()
        .await
        .unwrap();

    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, (1..=results.len()).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_crawl_from_config_file() {
    let server = MockServer::start().await;
    mount_page(&server, "/", html_page("Home", "")).await;

    let dir = tempfile::TempDir::new().unwrap();
    let config_path = dir.path().join("sitesweep.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[crawl]
start-url = "{}/"
max-pages = 5
default-crawl-delay-ms = 0

[health-check]
enabled = false
"#,
            server.uri()
        ),
    )
    .unwrap();

    let config = load_config(&config_path).unwrap();
    let results = sitesweep::crawl(config).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title.as_deref(), Some("Home"));
}

#[tokio::test]
async fn test_invalid_start_url_fails_the_run() {
    let result = sitesweep::crawl(Config::for_start_url("not a url")).await;
    assert!(result.is_err());
}

// ---------------------------------------------------------------------------
// Rendering fallback
// ---------------------------------------------------------------------------

/// Rendering engine that serves canned DOMs per URL
#[derive(Default)]
struct CannedEngine {
    pages: HashMap<String, String>,
    fail_launch: bool,
    launches: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderingEngine for CannedEngine {
    async fn launch(&self, _args: &[String]) -> Result<Arc<dyn BrowserInstance>, RenderError> {
        if self.fail_launch {
            return Err(RenderError::Launch("no browser".to_string()));
        }
        self.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(CannedInstance {
            pages: self.pages.clone(),
        }))
    }
}

struct CannedInstance {
    pages: HashMap<String, String>,
}

#[async_trait]
impl BrowserInstance for CannedInstance {
    async fn new_page(&self) -> Result<Box<dyn BrowserPage>, RenderError> {
        Ok(Box::new(CannedPage {
            pages: self.pages.clone(),
            current: String::new(),
        }))
    }

    fn is_connected(&self) -> bool {
        true
    }

    async fn close(&self) -> Result<(), RenderError> {
        Ok(())
    }
}

struct CannedPage {
    pages: HashMap<String, String>,
    current: String,
}

#[async_trait]
impl BrowserPage for CannedPage {
    async fn goto(&mut self, url: &str, _timeout: Duration) -> Result<(), RenderError> {
        self.current = url.to_string();
        Ok(())
    }

    async fn content(&self) -> Result<String, RenderError> {
        Ok(self.pages.get(&self.current).cloned().unwrap_or_default())
    }

    async fn close(&mut self) -> Result<(), RenderError> {
        Ok(())
    }
}

fn rendering_config(server: &MockServer) -> Config {
    let mut config = create_test_config(server);
    config.rendering.enabled = true;
    config.rendering.link_threshold = 10;
    config.crawl.max_pages = 1;
    config
}

#[tokio::test]
async fn test_rendering_fallback_adopts_richer_link_set() {
    let server = MockServer::start().await;
    let start = format!("{}/", server.uri());

    mount_page(&server, "/", html_page("App", r#"<a href="/static">Static</a>"#)).await;

    let rendered_dom = r#"<html><body>
        <a href="/r1">One</a><a href="/r2">Two</a><a href="/r3">Three</a>
        <img src="/hero.png" alt="Hero">
    </body></html>"#;
    let engine = CannedEngine::default().with_page(&start, rendered_dom);
    let launches = Arc::clone(&engine.launches);

    let results = Coordinator::new(rendering_config(&server))
        .unwrap()
        .with_rendering_engine(Arc::new(engine))
        .run()
        .await
        .unwrap();

    let home = find(&results, "/");
    assert!(home.rendered);
    let hrefs: Vec<String> = home
        .links
        .iter()
        .map(|l| Url::parse(&l.href).unwrap().path().to_string())
        .collect();
    assert_eq!(hrefs, vec!["/r1", "/r2", "/r3"]);
    assert_eq!(home.images.len(), 1);
    assert_eq!(home.title.as_deref(), Some("App"));
    assert_eq!(launches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rendering_fallback_keeps_static_set_when_not_richer() {
    let server = MockServer::start().await;
    let start = format!("{}/", server.uri());

    mount_page(
        &server,
        "/",
        html_page("App", r#"<a href="/one">One</a><a href="/two">Two</a>"#),
    )
    .await;

    let engine = CannedEngine::default()
        .with_page(&start, r#"<a href="/only">Only</a><a href="/two">Two</a>"#);

    let results = Coordinator::new(rendering_config(&server))
        .unwrap()
        .with_rendering_engine(Arc::new(engine))
        .run()
        .await
        .unwrap();

    let home = find(&results, "/");
    assert!(!home.rendered);
    let hrefs: Vec<String> = home
        .links
        .iter()
        .map(|l| Url::parse(&l.href).unwrap().path().to_string())
        .collect();
    assert_eq!(hrefs, vec!["/one", "/two"]);
}

#[tokio::test]
async fn test_rendering_skipped_above_threshold() {
    let server = MockServer::start().await;

    let links: String = (0..12).map(|i| format!(r#"<a href="/p{}">{}</a>"#, i, i)).collect();
    mount_page(&server, "/", html_page("Rich", &links)).await;

    let engine = CannedEngine::default();
    let launches = Arc::clone(&engine.launches);

    let results = Coordinator::new(rendering_config(&server))
        .unwrap()
        .with_rendering_engine(Arc::new(engine))
        .run()
        .await
        .unwrap();

    assert!(!find(&results, "/").rendered);
    assert_eq!(launches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_rendering_failure_falls_back_to_static_result() {
    let server = MockServer::start().await;

    mount_page(&server, "/", html_page("App", r#"<a href="/static">Static</a>"#)).await;

    let engine = CannedEngine {
        fail_launch: true,
        ..CannedEngine::default()
    };

    let results = Coordinator::new(rendering_config(&server))
        .unwrap()
        .with_rendering_engine(Arc::new(engine))
        .run()
        .await
        .unwrap();

    let home = find(&results, "/");
    assert!(!home.is_error());
    assert!(!home.rendered);
    assert_eq!(home.links.len(), 1);
}

impl CannedEngine {
    fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}
