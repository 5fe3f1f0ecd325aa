//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler, including:
//! - Building the shared HTTP client with a browser-like header set
//! - GET requests with a per-request timeout and a response size cap
//! - Classifying outcomes into a `FetchResult` that never escapes as an error

use crate::config::UserAgentConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Maximum redirect hops followed for a single request
const MAX_REDIRECTS: usize = 10;

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// A response below 500 was received and its body read in full
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code (2xx-4xx)
        status_code: u16,
        /// Content-Type header value
        content_type: String,
        /// Page body content
        body: String,
        /// Size of the body in bytes
        byte_size: usize,
        /// `X-Robots-Tag` header value, if any
        x_robots_tag: Option<String>,
    },

    /// The server answered with a 5xx status
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, reset, etc.)
    NetworkError {
        /// Error description
        error: String,
    },

    /// The body exceeded the configured size cap
    TooLarge {
        /// HTTP status code of the oversized response
        status_code: u16,
        /// The cap that was exceeded, in bytes
        limit: usize,
    },
}

/// Builds an HTTP client with proper configuration
///
/// The client carries a browser-like `User-Agent`, `Accept` and
/// `Accept-Language`; per-request timeouts are set by each caller.
///
/// # Example
///
/// ```no_run
/// use sitesweep::config::UserAgentConfig;
/// use sitesweep::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    Client::builder()
        .user_agent(config.header_value())
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL, reading at most `max_bytes` of body
///
/// # Outcome Classification
///
/// | Condition | Result |
/// |-----------|--------|
/// | Status < 500 | `Success` (4xx pages are still processed) |
/// | Status >= 500 | `HttpError` |
/// | Timeout / connect / body read failure | `NetworkError` |
/// | Declared or streamed body > `max_bytes` | `TooLarge` |
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `timeout` - Timeout covering the whole request, body included
/// * `max_bytes` - Response size cap
pub async fn fetch_url(client: &Client, url: &str, timeout: Duration, max_bytes: usize) -> FetchResult {
    let mut response = match client.get(url).timeout(timeout).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(e),
    };

    let status_code = response.status().as_u16();
    if status_code >= 500 {
        return FetchResult::HttpError { status_code };
    }

    let final_url = response.url().to_string();
    let headers = response.headers();
    let content_type = header_string(headers, "content-type").unwrap_or_default();
    let x_robots_tag = header_string(headers, "x-robots-tag");

    if let Some(declared) = response.content_length() {
        if declared as usize > max_bytes {
            return FetchResult::TooLarge {
                status_code,
                limit: max_bytes,
            };
        }
    }

    let mut bytes: Vec<u8> = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if bytes.len() + chunk.len() > max_bytes {
                    return FetchResult::TooLarge {
                        status_code,
                        limit: max_bytes,
                    };
                }
                bytes.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(e) => return classify_error(e),
        }
    }

    FetchResult::Success {
        final_url,
        status_code,
        content_type,
        byte_size: bytes.len(),
        body: String::from_utf8_lossy(&bytes).into_owned(),
        x_robots_tag,
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn classify_error(e: reqwest::Error) -> FetchResult {
    if e.is_timeout() {
        FetchResult::NetworkError {
            error: "Request timeout".to_string(),
        }
    } else if e.is_connect() {
        FetchResult::NetworkError {
            error: format!("Connection failed: {}", e),
        }
    } else {
        FetchResult::NetworkError {
            error: e.to_string(),
        }
    }
}

/// Returns true if the Content-Type looks like an HTML document
///
/// A missing Content-Type is treated as HTML.
pub fn is_html_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml+xml")
}
