//! Statistics over a finished crawl
//!
//! This module summarizes a [`CrawlResult`] into counts and prints them.

use crate::crawler::{CrawlResult, FailureKind};
use std::collections::HashMap;

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    /// Pages captured
    pub pages_crawled: usize,

    /// HTML responses received
    pub pages_found: usize,

    /// Words across all captured pages
    pub total_words: usize,

    /// Bytes across all captured pages
    pub total_bytes: usize,

    /// Product records extracted
    pub products: usize,

    /// Recorded failures by kind
    pub failures_by_kind: HashMap<FailureKind, usize>,
}

impl CrawlStatistics {
    pub fn from_result(result: &CrawlResult) -> Self {
        let mut failures_by_kind = HashMap::new();
        for failure in &result.failures {
            *failures_by_kind.entry(failure.kind).or_insert(0) += 1;
        }

        Self {
            pages_crawled: result.pages_crawled,
            pages_found: result.pages_found,
            total_words: result.pages.iter().map(|p| p.word_count).sum(),
            total_bytes: result.pages.iter().map(|p| p.size).sum(),
            products: result.products.len(),
            failures_by_kind,
        }
    }

    /// Share of HTML responses that became captured pages, in percent
    pub fn capture_rate(&self) -> f64 {
        if self.pages_found == 0 {
            return 0.0;
        }
        (self.pages_crawled as f64 / self.pages_found as f64) * 100.0
    }

    /// Failures sorted by count (descending), then by kind name
    pub fn sorted_failures(&self) -> Vec<(FailureKind, usize)> {
        let mut failures: Vec<_> = self
            .failures_by_kind
            .iter()
            .map(|(kind, count)| (*kind, *count))
            .collect();
        failures.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| format!("{:?}", a.0).cmp(&format!("{:?}", b.0)))
        });
        failures
    }
}

/// Prints a crawl summary to stdout
///
/// # Arguments
///
/// * `result` - The finished crawl
pub fn print_summary(result: &CrawlResult) {
    let stats = CrawlStatistics::from_result(result);

    println!("=== Crawl Summary: {} ===\n", result.url);

    println!("Overview:");
    println!("  Title: {}", result.title);
    println!("  Pages crawled: {}", stats.pages_crawled);
    println!("  HTML responses: {}", stats.pages_found);
    println!("  Words captured: {}", stats.total_words);
    println!("  Products found: {}", stats.products);
    println!();

    println!("Pages:");
    for page in &result.pages {
        println!("  {} ({} words, {} bytes)", page.url, page.word_count, page.size);
    }
    println!();

    let failures = stats.sorted_failures();
    if !failures.is_empty() {
        println!("Failures:");
        for (kind, count) in failures {
            println!("  {:?}: {}", kind, count);
        }
        println!();
    }

    println!(
        "Capture Rate: {:.1}% ({} / {} HTML responses captured)",
        stats.capture_rate(),
        stats.pages_crawled,
        stats.pages_found
    );
}
