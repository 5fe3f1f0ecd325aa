//! Output module for crawl results
//!
//! This module handles:
//! - Writing the result set as pretty-printed JSON
//! - Aggregating and printing crawl statistics

pub mod stats;

pub use stats::{print_statistics, CrawlStatistics};

use crate::state::PageResult;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors raised while writing results
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Writes `results` to `path` as a pretty-printed JSON array
///
/// Missing parent directories are created.
///
/// # Arguments
///
/// * `path` - Destination file, overwritten if it exists
/// * `results` - The crawl's page results
pub fn write_results_json(path: &Path, results: &[PageResult]) -> Result<(), OutputError> {
    let io_error = |source| OutputError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }

    let file = File::create(path).map_err(io_error)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, results)?;
    writer.write_all(b"\n").map_err(io_error)?;
    writer.flush().map_err(io_error)?;

    tracing::info!("Wrote {} results to {}", results.len(), path.display());
    Ok(())
}
