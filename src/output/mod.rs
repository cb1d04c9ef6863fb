//! Output module for crawl summaries and reports
//!
//! This module handles:
//! - Printing a crawl summary to stdout
//! - Writing a markdown report of a crawl
//! - Computing crawl statistics

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, write_markdown_summary};
pub use stats::{print_summary, CrawlStatistics};
