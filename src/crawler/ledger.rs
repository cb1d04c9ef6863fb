//! Job-scoped dedup state
//!
//! The "processed" set, the "queued" set and the ordered page list share one
//! lock so that every check-then-act sequence (budget check plus append,
//! processed check plus queue insert) happens in a single critical section.

use crate::crawler::types::{CrawledPage, FetchFailure};
use crate::extract::Product;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A set of normalized URLs with an atomic insert-if-absent
#[derive(Debug, Default)]
pub struct UrlSet {
    urls: HashSet<String>,
}

impl UrlSet {
    /// Inserts `url`, returning `false` if it was already present
    pub fn insert_if_absent(&mut self, url: &str) -> bool {
        if self.urls.contains(url) {
            return false;
        }
        self.urls.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    pub fn remove(&mut self, url: &str) -> bool {
        self.urls.remove(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

/// Result of offering a page to the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// The URL was already processed
    Duplicate,
    /// The page budget was already met
    BudgetExhausted,
}

/// Everything the ledger collected, taken once the job drains
#[derive(Debug, Default)]
pub struct LedgerTally {
    pub pages: Vec<CrawledPage>,
    pub products: Vec<Product>,
    pub failures: Vec<FetchFailure>,
    pub pages_found: usize,
}

#[derive(Debug, Default)]
struct LedgerState {
    processed: UrlSet,
    queued: UrlSet,
    tally: LedgerTally,
}

/// Shared crawl state for one job
#[derive(Debug)]
pub struct CrawlLedger {
    max_pages: usize,
    state: Mutex<LedgerState>,
}

impl CrawlLedger {
    pub fn new(max_pages: usize) -> Self {
        Self {
            max_pages,
            state: Mutex::new(LedgerState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks a URL as scheduled for fetching
    ///
    /// Returns `false` if it was already queued.
    pub fn mark_queued(&self, url: &str) -> bool {
        self.lock().queued.insert_if_absent(url)
    }

    /// Clears the queued mark of a URL so it can be scheduled again
    pub fn release_queued(&self, url: &str) {
        self.lock().queued.remove(url);
    }

    pub fn is_processed(&self, url: &str) -> bool {
        self.lock().processed.contains(url)
    }

    pub fn budget_reached(&self) -> bool {
        self.lock().tally.pages.len() >= self.max_pages
    }

    pub fn page_count(&self) -> usize {
        self.lock().tally.pages.len()
    }

    /// Records a page, atomically checking the budget and the processed set
    pub fn admit(&self, page: CrawledPage) -> Admission {
        let url = page.url.clone();
        self.admit_fetched(page, &url)
    }

    /// Records a page that may have been reached through a redirect
    ///
    /// `page.url` is the canonical fetched URL and `requested` the URL that
    /// was scheduled. Both are marked processed in the same critical
    /// section, and the page is a duplicate if either one already is.
    pub fn admit_fetched(&self, page: CrawledPage, requested: &str) -> Admission {
        let mut state = self.lock();

        if state.tally.pages.len() >= self.max_pages {
            return Admission::BudgetExhausted;
        }
        if state.processed.contains(&page.url) || state.processed.contains(requested) {
            return Admission::Duplicate;
        }

        state.processed.insert_if_absent(requested);
        state.processed.insert_if_absent(&page.url);
        state.tally.pages.push(page);
        Admission::Accepted
    }

    /// Claims a discovered link for fetching
    ///
    /// Returns `true` only if the URL was neither processed nor queued; the
    /// URL is then marked queued under the same lock.
    pub fn claim_link(&self, url: &str) -> bool {
        let mut state = self.lock();
        if state.processed.contains(url) {
            return false;
        }
        state.queued.insert_if_absent(url)
    }

    pub fn record_failure(&self, failure: FetchFailure) {
        self.lock().tally.failures.push(failure);
    }

    pub fn add_products(&self, products: Vec<Product>) {
        if products.is_empty() {
            return;
        }
        self.lock().tally.products.extend(products);
    }

    /// Counts an HTML response received from the network or the renderer
    pub fn record_html_response(&self) {
        self.lock().tally.pages_found += 1;
    }

    /// Takes the collected pages, products and failures
    pub fn finish(&self) -> LedgerTally {
        std::mem::take(&mut self.lock().tally)
    }
}
