//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with browser headers and charset transcoding
//! - Link discovery
//! - Politeness scheduling
//! - Job-scoped dedup state
//! - Failure classification
//! - Overall crawl coordination

mod classify;
mod coordinator;
mod fetcher;
mod ledger;
mod parser;
mod scheduler;
mod types;

pub use classify::{classify, terminal_error, FailureKind, Outcome};
pub use coordinator::{crawl, Crawler, MAX_LINKS_PER_PAGE};
pub use fetcher::{browser_headers, decode_body, is_html, FetchResult, HttpTransport, BROWSER_USER_AGENT};
pub use ledger::{Admission, CrawlLedger, LedgerTally, UrlSet};
pub use parser::discover_links;
pub use scheduler::{Scheduler, SchedulerPermit};
pub use types::{CrawlResult, CrawledPage, FetchFailure};
