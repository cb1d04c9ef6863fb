//! Records produced by a crawl job

use crate::crawler::FailureKind;
use crate::extract::Product;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A captured page
///
/// Only pages whose extracted content reaches the minimum word count are
/// ever recorded.
#[derive(Debug, Clone, Serialize)]
pub struct CrawledPage {
    /// Normalized URL, unique within a result
    pub url: String,

    pub title: String,

    /// Cleaned main content
    pub content: String,

    pub crawled_at: DateTime<Utc>,

    pub status_code: u16,

    /// Size of the decoded body in bytes
    pub size: usize,

    pub word_count: usize,
}

/// A non-fatal failure recorded while crawling
#[derive(Debug, Clone, Serialize)]
pub struct FetchFailure {
    pub url: String,
    pub kind: FailureKind,
    pub status: Option<u16>,
    pub message: Option<String>,
}

/// Outcome of a successful crawl job
///
/// A job that captured no pages returns an error instead, so every
/// `CrawlResult` holds at least one page.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlResult {
    /// Normalized seed URL
    pub url: String,

    /// Title of the first captured page
    pub title: String,

    /// Content of the first captured page
    pub content: String,

    /// Captured pages in insertion order
    pub pages: Vec<CrawledPage>,

    /// Best-effort product records from every captured page
    pub products: Vec<Product>,

    /// Failures on followed links and recovered seed failures
    pub failures: Vec<FetchFailure>,

    /// Number of HTML responses received
    pub pages_found: usize,

    /// Number of pages captured
    pub pages_crawled: usize,
}
