//! URL handling module for SiteSweep
//!
//! This module provides frontier-key normalization, host extraction,
//! internal/external classification and link resolution.

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{extract_host, is_internal};
pub use normalize::{normalize_url, resolve_link};
