//! HTML parser for extracting page summaries, links and images
//!
//! This module handles parsing HTML content to extract:
//! - Title, meta description, meta robots and canonical link
//! - `<h1>`/`<h2>` headings and a visible word count
//! - Links from `<a href>` with anchor text, internal/external class and nofollow
//! - Images from `<img src>` with alt text

use crate::state::{ImageRecord, LinkRecord};
use crate::url::{is_internal, resolve_link};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Elements whose text is not visible page copy
const NON_VISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_robots: Option<String>,
    pub canonical: Option<String>,
    pub h1: Vec<String>,
    pub h2: Vec<String>,
    pub word_count: usize,

    /// Unique links in document order
    pub links: Vec<LinkRecord>,

    /// Unique images in document order
    pub images: Vec<ImageRecord>,
}

impl ParsedPage {
    /// `noindex` in meta robots
    pub fn is_noindex(&self) -> bool {
        robots_directive(self.meta_robots.as_deref(), "noindex")
    }

    /// `nofollow` in meta robots
    pub fn is_nofollow(&self) -> bool {
        robots_directive(self.meta_robots.as_deref(), "nofollow")
    }
}

/// Returns true if a comma-separated robots directive list contains `directive`
///
/// `none` implies both `noindex` and `nofollow`.
pub fn robots_directive(content: Option<&str>, directive: &str) -> bool {
    content
        .map(|c| {
            c.split(',').map(|d| d.trim().to_ascii_lowercase()).any(|d| {
                d == directive || (d == "none" && (directive == "noindex" || directive == "nofollow"))
            })
        })
        .unwrap_or(false)
}

/// Parses HTML content and extracts the page summary, links and images
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document, resolved against `page_url`
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:`, `data:` links
/// - Fragment-only links (same page anchors)
/// - Duplicates (first occurrence wins)
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `page_url` - The page URL for resolving relative references
/// * `base_host` - The crawl's host, for internal/external classification
///
/// # Example
///
/// ```
/// use sitesweep::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let page_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &page_url, "example.com");
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// assert!(parsed.links[0].is_internal);
/// ```
pub fn parse_html(html: &str, page_url: &Url, base_host: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: first_text(&document, "title"),
        meta_description: meta_content(&document, "description"),
        meta_robots: meta_content(&document, "robots"),
        canonical: first_attr(&document, "link[rel='canonical'][href]", "href")
            .and_then(|href| resolve_link(&href, page_url))
            .map(|url| url.to_string()),
        h1: all_text(&document, "h1"),
        h2: all_text(&document, "h2"),
        word_count: count_words(&document),
        links: extract_links(&document, page_url, base_host),
        images: extract_images(&document, page_url),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .next()
        .map(element_text)
        .filter(|s| !s.is_empty())
}

fn all_text(document: &Html, css: &str) -> Vec<String> {
    let Some(sel) = selector(css) else {
        return Vec::new();
    };
    document
        .select(&sel)
        .map(element_text)
        .filter(|s| !s.is_empty())
        .collect()
}

fn first_attr(document: &Html, css: &str, attr: &str) -> Option<String> {
    let sel = selector(css)?;
    document
        .select(&sel)
        .find_map(|e| e.value().attr(attr))
        .map(|v| v.trim().to_string())
}

/// Reads `<meta name="...">` content, matching the name case-insensitively
fn meta_content(document: &Html, name: &str) -> Option<String> {
    let sel = selector("meta[name][content]")?;
    document
        .select(&sel)
        .find(|e| {
            e.value()
                .attr("name")
                .map(|n| n.trim().eq_ignore_ascii_case(name))
                .unwrap_or(false)
        })
        .and_then(|e| e.value().attr("content"))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}

/// Counts whitespace-separated words of visible body text
fn count_words(document: &Html) -> usize {
    let Some(body_sel) = selector("body") else {
        return 0;
    };
    let Some(body) = document.select(&body_sel).next() else {
        return 0;
    };

    body.descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node
                .parent()
                .and_then(|p| p.value().as_element().map(|e| e.name().to_string()))
                .map(|name| NON_VISIBLE_ELEMENTS.contains(&name.as_str()))
                .unwrap_or(false);
            (!hidden).then(|| text.split_whitespace().count())
        })
        .sum()
}

fn extract_links(document: &Html, page_url: &Url, base_host: &str) -> Vec<LinkRecord> {
    let Some(a_selector) = selector("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&a_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Some(absolute) = resolve_link(href, page_url) else {
            continue;
        };
        if !seen.insert(absolute.to_string()) {
            continue;
        }

        let nofollow = element
            .value()
            .attr("rel")
            .map(|rel| {
                rel.split_whitespace()
                    .any(|token| token.eq_ignore_ascii_case("nofollow"))
            })
            .unwrap_or(false);

        links.push(LinkRecord {
            is_internal: is_internal(&absolute, base_host),
            href: absolute.to_string(),
            text: element_text(element),
            nofollow,
        });
    }

    links
}

fn extract_images(document: &Html, page_url: &Url) -> Vec<ImageRecord> {
    let Some(img_selector) = selector("img[src]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut images = Vec::new();

    for element in document.select(&img_selector) {
        let Some(src) = element.value().attr("src") else {
            continue;
        };
        let Some(absolute) = resolve_link(src, page_url) else {
            continue;
        };
        if !seen.insert(absolute.to_string()) {
            continue;
        }

        let alt = element.value().attr("alt").map(|a| a.trim().to_string());
        images.push(ImageRecord {
            src: absolute.to_string(),
            has_alt: alt.as_deref().map(|a| !a.is_empty()).unwrap_or(false),
            alt,
        });
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_url() -> Url {
        Url::parse("https://example.com/page").unwrap()
    }

    fn parse(html: &str) -> ParsedPage {
        parse_html(html, &page_url(), "example.com")
    }

    #[test]
    fn test_extract_title() {
        let parsed = parse(r#"<html><head><title>  Test Page  </title></head><body></body></html>"#);
        assert_eq!(parsed.title, Some("Test Page".to_string()));
    }

    #[test]
    fn test_no_title() {
        let parsed = parse(r#"<html><head></head><body></body></html>"#);
        assert_eq!(parsed.title, None);
    }

    #[test]
    fn test_meta_fields() {
        let parsed = parse(
            r#"<html><head>
            <meta name="Description" content=" A page about things ">
            <meta name="robots" content="index, follow">
            <link rel="canonical" href="/canonical#x">
            </head><body></body></html>"#,
        );
        assert_eq!(parsed.meta_description.as_deref(), Some("A page about things"));
        assert_eq!(parsed.meta_robots.as_deref(), Some("index, follow"));
        assert_eq!(parsed.canonical.as_deref(), Some("https://example.com/canonical"));
        assert!(!parsed.is_noindex());
        assert!(!parsed.is_nofollow());
    }

    #[test]
    fn test_noindex_and_nofollow() {
        let parsed = parse(r#"<html><head><meta name="ROBOTS" content="NOINDEX,nofollow"></head></html>"#);
        assert!(parsed.is_noindex());
        assert!(parsed.is_nofollow());

        let parsed = parse(r#"<html><head><meta name="robots" content="none"></head></html>"#);
        assert!(parsed.is_noindex());
        assert!(parsed.is_nofollow());
    }

    #[test]
    fn test_headings() {
        let parsed = parse(
            r#"<body><h1>Main <em>title</em></h1><h2>One</h2><h2>Two</h2><h2>  </h2></body>"#,
        );
        assert_eq!(parsed.h1, vec!["Main title"]);
        assert_eq!(parsed.h2, vec!["One", "Two"]);
    }

    #[test]
    fn test_word_count_skips_scripts() {
        let parsed = parse(
            r#"<html><body><p>one two three</p><script>var a = 1; var b = 2;</script><style>p { color: red }</style><div>four</div></body></html>"#,
        );
        assert_eq!(parsed.word_count, 4);
    }

    #[test]
    fn test_internal_and_external_links() {
        let parsed = parse(
            r#"<body>
            <a href="/a">A</a>
            <a href="https://example.com/b">B</a>
            <a href="https://other.com/c" rel="nofollow noopener">C</a>
            </body>"#,
        );
        assert_eq!(parsed.links.len(), 3);
        assert_eq!(parsed.links[0].href, "https://example.com/a");
        assert_eq!(parsed.links[0].text, "A");
        assert!(parsed.links[0].is_internal);
        assert!(parsed.links[1].is_internal);
        assert!(!parsed.links[2].is_internal);
        assert!(parsed.links[2].nofollow);
    }

    #[test]
    fn test_links_deduplicated_without_fragment() {
        let parsed = parse(
            r##"<body><a href="/a#one">x</a><a href="/a#two">y</a><a href="#top">z</a></body>"##,
        );
        assert_eq!(parsed.links.len(), 1);
        assert_eq!(parsed.links[0].href, "https://example.com/a");
        assert_eq!(parsed.links[0].text, "x");
    }

    #[test]
    fn test_skip_special_links() {
        let parsed = parse(
            r#"<body>
            <a href="javascript:void(0)">x</a>
            <a href="mailto:test@example.com">x</a>
            <a href="tel:+1234567890">x</a>
            <a href="/valid">ok</a>
            </body>"#,
        );
        assert_eq!(parsed.links.len(), 1);
    }

    #[test]
    fn test_images() {
        let parsed = parse(
            r#"<body>
            <img src="/logo.png" alt="Logo">
            <img src="https://cdn.example.org/hero.jpg" alt="">
            <img src="/spacer.gif">
            <img src="data:image/png;base64,AAAA">
            <img src="/logo.png" alt="dup">
            </body>"#,
        );
        assert_eq!(parsed.images.len(), 3);
        assert_eq!(parsed.images[0].src, "https://example.com/logo.png");
        assert!(parsed.images[0].has_alt);
        assert_eq!(parsed.images[1].alt.as_deref(), Some(""));
        assert!(!parsed.images[1].has_alt);
        assert_eq!(parsed.images[2].alt, None);
        assert!(!parsed.images[2].has_alt);
    }
}
