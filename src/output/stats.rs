//! Statistics aggregated from a crawl's result set

use crate::state::PageResult;
use std::collections::BTreeMap;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Pages visited
    pub total_pages: usize,

    /// Pages processed without an error
    pub successful_pages: usize,

    /// Pages recorded with an error
    pub error_pages: usize,

    pub noindex_pages: usize,

    /// Pages whose links came from the rendering fallback
    pub rendered_pages: usize,

    /// Sum of response body sizes
    pub total_bytes: usize,

    /// Links extracted across all pages
    pub total_links: usize,

    pub broken_links: usize,
    pub broken_images: usize,

    /// Count of pages per HTTP status (0 = no response)
    pub status_codes: BTreeMap<u16, usize>,
}

impl CrawlStatistics {
    /// Aggregates statistics over `results`
    pub fn from_results(results: &[PageResult]) -> Self {
        let mut stats = Self {
            total_pages: results.len(),
            ..Self::default()
        };

        for result in results {
            if result.is_error() {
                stats.error_pages += 1;
            } else {
                stats.successful_pages += 1;
            }
            if result.noindex {
                stats.noindex_pages += 1;
            }
            if result.rendered {
                stats.rendered_pages += 1;
            }
            stats.total_bytes += result.byte_size;
            stats.total_links += result.links.len();
            stats.broken_links += result.broken_links.len();
            stats.broken_images += result.broken_images.len();
            *stats.status_codes.entry(result.status_code).or_insert(0) += 1;
        }

        stats
    }

    /// Share of pages processed without an error, in percent
    pub fn success_rate(&self) -> f64 {
        if self.total_pages == 0 {
            return 0.0;
        }
        (self.successful_pages as f64 / self.total_pages as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages crawled: {}", stats.total_pages);
    println!("  Errors: {}", stats.error_pages);
    println!("  Noindex pages: {}", stats.noindex_pages);
    println!("  Rendered pages: {}", stats.rendered_pages);
    println!("  Total links found: {}", stats.total_links);
    println!("  Total bytes: {}", stats.total_bytes);
    println!();

    println!("Status Codes:");
    let mut status_counts: Vec<_> = stats.status_codes.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

    for (status, count) in status_counts {
        let label = if *status == 0 {
            "no response".to_string()
        } else {
            status.to_string()
        };
        let percentage = if stats.total_pages > 0 {
            (*count as f64 / stats.total_pages as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", label, count, percentage);
    }
    println!();

    if stats.broken_links > 0 || stats.broken_images > 0 {
        println!("Broken Resources (sampled):");
        println!("  Links: {}", stats.broken_links);
        println!("  Images: {}", stats.broken_images);
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages successfully processed)",
        stats.success_rate(),
        stats.successful_pages,
        stats.total_pages
    );
}
