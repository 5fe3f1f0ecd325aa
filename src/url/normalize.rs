use crate::{UrlError, UrlResult};
use url::Url;

/// Schemes that never point at a crawlable document
const SKIPPED_PREFIXES: &[&str] = &["javascript:", "mailto:", "tel:", "data:", "blob:"];

/// Normalizes a URL into the form used as a frontier key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything that is not HTTP or HTTPS
/// 3. Reject URLs without a host
/// 4. Remove the fragment (everything after #)
///
/// Host lowercasing, dot-segment removal and the empty-path-to-root rule are
/// applied by the `url` crate's WHATWG parser.
///
/// # Examples
///
/// ```
/// use sitesweep::url::normalize_url;
///
/// let url = normalize_url("https://EXAMPLE.com/a/../page#top").unwrap();
/// assert_eq!(url.as_str(), "https://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<Url> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    check_crawlable(&url)?;
    url.set_fragment(None);
    Ok(url)
}

/// Resolves an `href`/`src` attribute against the page URL
///
/// Returns None if the reference should be excluded:
/// - empty or fragment-only references (same page anchors)
/// - javascript:, mailto:, tel:, data:, blob: schemes
/// - references that do not resolve to an HTTP(S) URL with a host
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if SKIPPED_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    check_crawlable(&absolute).ok()?;
    absolute.set_fragment(None);
    Some(absolute)
}

fn check_crawlable(url: &Url) -> UrlResult<()> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(UrlError::MissingHost),
    }
}
