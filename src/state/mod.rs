//! Per-page crawl records
//!
//! # Components
//!
//! - `PageResult`: one record per visited URL, immutable once appended to the run's results
//! - `LinkRecord` / `ImageRecord`: resources extracted from a page
//! - `BrokenResource`: a sampled link or image that failed its health probe

mod page_result;

// Re-export main types
pub use page_result::{BrokenResource, ImageRecord, LinkRecord, PageResult, NETWORK_ERROR};
