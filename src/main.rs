//! SiteSweep main entry point
//!
//! This is the command-line interface for the SiteSweep site crawler.

use anyhow::{bail, Context};
use clap::Parser;
use sitesweep::config::{load_config_with_hash, validate, Config};
use sitesweep::output::{print_statistics, write_results_json, CrawlStatistics};
use sitesweep::Coordinator;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// SiteSweep: a polite single-site crawler
///
/// SiteSweep discovers a site's pages through robots.txt, sitemaps and
/// link-following, extracts on-page SEO data and samples broken links and
/// images, writing one JSON record per page.
#[derive(Parser, Debug)]
#[command(name = "sitesweep")]
#[command(version)]
#[command(about = "A polite single-site crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Override the start URL from the config file
    #[arg(long, value_name = "URL")]
    start_url: Option<String>,

    /// Override the page cap
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// Override the number of concurrent workers
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Enable the headless rendering fallback
    #[arg(long)]
    render: bool,

    /// Override where results are written
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Validate config and print the effective settings without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli);
    validate(&config).context("Invalid configuration after command-line overrides")?;

    if config.crawl.start_url.trim().is_empty() {
        bail!("No start URL: set crawl.start-url or pass --start-url");
    }

    if cli.dry_run {
        handle_dry_run(&config, &config_hash)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sitesweep=info,warn"),
            1 => EnvFilter::new("sitesweep=debug,info"),
            2 => EnvFilter::new("sitesweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(start_url) = &cli.start_url {
        config.crawl.start_url = start_url.clone();
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawl.max_pages = max_pages;
    }
    if let Some(concurrency) = cli.concurrency {
        config.crawl.concurrency = concurrency;
    }
    if cli.render {
        config.rendering.enabled = true;
    }
    if let Some(output) = &cli.output {
        config.output.results_path = output.display().to_string();
    }
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    println!("=== SiteSweep Dry Run ===\n");
    println!("Config hash: {}\n", config_hash);

    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{}", rendered);

    println!("User-Agent header: {}", config.user_agent.header_value());
    println!("Robots token: {}", config.user_agent.robots_token());
    if config.rendering.enabled && !cfg!(feature = "chromium") {
        println!("\nWarning: rendering is enabled but this build has no `chromium` feature;");
        println!("the fallback will be skipped.");
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let results_path = PathBuf::from(&config.output.results_path);
    let max_pages = config.crawl.max_pages;

    let coordinator = Coordinator::new(config)
        .context("Failed to set up crawler")?
        .with_progress(move |visited| {
            tracing::debug!("Visited {}/{}", visited, max_pages);
        });

    let results = coordinator.run().await.context("Crawl failed")?;

    write_results_json(&results_path, &results)?;

    let stats = CrawlStatistics::from_results(&results);
    print_statistics(&stats);
    println!("\nResults written to {}", results_path.display());

    Ok(())
}
