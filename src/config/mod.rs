//! Configuration module for SiteSweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every key has a default, so the smallest useful file is:
//!
//! ```toml
//! [crawl]
//! start-url = "https://example.com/"
//! ```
//!
//! # Example
//!
//! ```no_run
//! use sitesweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sitesweep.toml")).unwrap();
//! println!("Crawl will admit at most {} pages", config.crawl.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlConfig, HealthCheckConfig, OutputConfig, RenderingConfig, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
