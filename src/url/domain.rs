use url::Url;

/// Extracts the lowercase host from a URL
///
/// The port is not part of the host, so `127.0.0.1:8080` and `127.0.0.1:9090`
/// share a host.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sitesweep::url::extract_host;
///
/// let url = Url::parse("https://Sub.Example.com:8443/path").unwrap();
/// assert_eq!(extract_host(&url), Some("sub.example.com".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if `url` lives on `base_host`
///
/// Classification is an exact hostname match; subdomains are external.
pub fn is_internal(url: &Url, base_host: &str) -> bool {
    extract_host(url)
        .map(|host| host.eq_ignore_ascii_case(base_host))
        .unwrap_or(false)
}
