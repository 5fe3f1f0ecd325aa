//! Sitemap XML parser
//!
//! Handles both document kinds defined by the sitemaps protocol:
//! `<urlset><url><loc>` leaf sitemaps and `<sitemapindex><sitemap><loc>`
//! indexes. Namespaces are ignored; only local element names are matched.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use thiserror::Error;

/// Errors raised while fetching or parsing a single sitemap
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("request failed: {0}")]
    Http(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("malformed XML: {0}")]
    Xml(String),
}

/// Locations extracted from one sitemap document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SitemapDocument {
    /// Page URLs from `<url><loc>` entries, in document order
    pub page_urls: Vec<String>,

    /// Nested sitemap URLs from `<sitemap><loc>` entries, in document order
    pub nested_sitemaps: Vec<String>,
}

impl SitemapDocument {
    /// True if the document is a sitemap index
    pub fn is_index(&self) -> bool {
        !self.nested_sitemaps.is_empty()
    }
}

/// Parses a sitemap or sitemap index document
///
/// # Example
///
/// ```
/// use sitesweep::sitemap::parse_sitemap;
///
/// let xml = r#"<urlset><url><loc>https://example.com/a</loc></url></urlset>"#;
/// let doc = parse_sitemap(xml).unwrap();
/// assert_eq!(doc.page_urls, vec!["https://example.com/a".to_string()]);
/// ```
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, SitemapError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut document = SitemapDocument::default();
    let mut stack: Vec<String> = Vec::new();
    let mut loc_text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => {
                let name = String::from_utf8_lossy(element.local_name().as_ref()).to_lowercase();
                if name == "loc" {
                    loc_text.clear();
                }
                stack.push(name);
            }
            Ok(Event::Text(text)) => {
                if stack.last().map(String::as_str) == Some("loc") {
                    let unescaped = text
                        .unescape()
                        .map_err(|e| SitemapError::Xml(e.to_string()))?;
                    loc_text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(data)) => {
                if stack.last().map(String::as_str) == Some("loc") {
                    loc_text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let closed = stack.pop();
                if closed.as_deref() == Some("loc") {
                    let location = loc_text.trim().to_string();
                    if !location.is_empty() {
                        match stack.last().map(String::as_str) {
                            Some("url") => document.page_urls.push(location),
                            Some("sitemap") => document.nested_sitemaps.push(location),
                            _ => {}
                        }
                    }
                    loc_text.clear();
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(SitemapError::Xml(format!(
                    "{} at byte {}",
                    e,
                    reader.buffer_position()
                )))
            }
        }
    }

    Ok(document)
}
