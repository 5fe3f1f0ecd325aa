use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marker recorded when a probe failed before any HTTP status was received
pub const NETWORK_ERROR: &str = "network error";

/// A hyperlink extracted from a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRecord {
    /// Absolute URL with the fragment removed
    pub href: String,

    /// Trimmed anchor text
    pub text: String,

    /// Whether the link points at the crawl's base host
    pub is_internal: bool,

    /// Whether the anchor carries `rel="nofollow"`
    pub nofollow: bool,
}

/// An image extracted from a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    /// Absolute image URL
    pub src: String,

    /// The `alt` attribute, if present
    pub alt: Option<String>,

    /// True when a non-empty `alt` attribute is present
    pub has_alt: bool,
}

/// A sampled link or image that failed its health probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenResource {
    /// The probed URL
    pub url: String,

    /// Observed HTTP status, if a response was received
    pub status: Option<u16>,

    /// `HTTP <code>` or [`NETWORK_ERROR`]
    pub reason: String,
}

impl BrokenResource {
    pub fn from_status(url: impl Into<String>, status: u16) -> Self {
        Self {
            url: url.into(),
            status: Some(status),
            reason: format!("HTTP {}", status),
        }
    }

    pub fn network_error(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: None,
            reason: NETWORK_ERROR.to_string(),
        }
    }
}

/// The outcome of visiting one URL
///
/// A failed fetch is still a `PageResult`, with `error` set and `status_code`
/// holding the HTTP status if one was received (0 otherwise).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    /// The URL taken from the frontier
    pub url: String,

    /// URL after redirects, when it differs from `url`
    pub final_url: Option<String>,

    /// HTTP status code, or 0 when no response was received
    pub status_code: u16,

    pub content_type: Option<String>,
    pub title: Option<String>,
    pub meta_description: Option<String>,

    /// Raw `<meta name="robots">` content
    pub meta_robots: Option<String>,

    pub canonical: Option<String>,
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub word_count: usize,
    pub images: Vec<ImageRecord>,
    pub links: Vec<LinkRecord>,
    pub broken_links: Vec<BrokenResource>,
    pub broken_images: Vec<BrokenResource>,

    /// Size of the response body in bytes
    pub byte_size: usize,

    /// Page opted out of indexing; its links were not extracted
    pub noindex: bool,

    /// Links and images come from the rendering fallback
    pub rendered: bool,

    pub load_time_ms: u64,
    pub fetched_at: DateTime<Utc>,

    /// Set when the page could not be fetched or processed
    pub error: Option<String>,
}

impl PageResult {
    /// Creates an empty result for `url`, stamped with the current time
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            final_url: None,
            status_code: 0,
            content_type: None,
            title: None,
            meta_description: None,
            meta_robots: None,
            canonical: None,
            h1: Vec::new(),
            h2: Vec::new(),
            word_count: 0,
            images: Vec::new(),
            links: Vec::new(),
            broken_links: Vec::new(),
            broken_images: Vec::new(),
            byte_size: 0,
            noindex: false,
            rendered: false,
            load_time_ms: 0,
            fetched_at: Utc::now(),
            error: None,
        }
    }

    /// Creates an error result
    ///
    /// # Arguments
    ///
    /// * `url` - The URL that failed
    /// * `status_code` - The HTTP status if known, otherwise 0
    /// * `error` - Human-readable failure description
    pub fn failed(url: impl Into<String>, status_code: u16, error: impl Into<String>) -> Self {
        let mut result = Self::new(url);
        result.status_code = status_code;
        result.error = Some(error.into());
        result
    }

    /// Returns true if the page failed
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Internal links without `rel="nofollow"`
    ///
    /// Page-level `nofollow` is the caller's concern.
    pub fn followable_links(&self) -> impl Iterator<Item = &LinkRecord> {
        self.links.iter().filter(|l| l.is_internal && !l.nofollow)
    }
}
