//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives one crawl job from seed to result:
//! - Resolving the seed and the allowed domains
//! - Optionally rendering the seed through a headless browser
//! - Running a pool of fetch tasks gated by the scheduler
//! - Extracting content and scheduling discovered links
//! - Classifying failures and deciding whether the job failed

use crate::config::{parse_seed, repair_seed_url, validate, CrawlConfig};
use crate::crawler::classify::{classify, terminal_error, FailureKind};
use crate::crawler::fetcher::{FetchResult, HttpTransport};
use crate::crawler::ledger::{Admission, CrawlLedger};
use crate::crawler::parser::discover_links;
use crate::crawler::scheduler::Scheduler;
use crate::crawler::types::{CrawlResult, CrawledPage, FetchFailure};
use crate::extract::{extract, extract_page_products, MIN_WORD_COUNT};
use crate::render::{ChromiumRenderer, RenderOptions, Renderer};
use crate::url::{extract_domain, is_allowed, normalize_url, resolve_allowed_domains};
use crate::{CrawlError, Result};
use chrono::Utc;
use scraper::Html;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::task::JoinSet;
use url::Url;

/// Maximum number of links scheduled from a single page
pub const MAX_LINKS_PER_PAGE: usize = 20;

/// Runs crawl jobs
///
/// A crawler holds the HTTP transport and the renderer. Each call to
/// [`Crawler::crawl`] builds fresh dedup state, so one crawler can run
/// several jobs concurrently without them interfering.
#[derive(Clone)]
pub struct Crawler {
    transport: HttpTransport,
    renderer: Arc<dyn Renderer>,
}

impl Crawler {
    /// Creates a crawler with a new transport and the Chromium renderer
    pub fn new() -> Result<Self> {
        let transport = HttpTransport::new().map_err(CrawlError::Client)?;
        Ok(Self::with_transport(transport))
    }

    /// Creates a crawler around an existing transport
    pub fn with_transport(transport: HttpTransport) -> Self {
        Self {
            transport,
            renderer: Arc::new(ChromiumRenderer::default()),
        }
    }

    /// Replaces the renderer used for JavaScript-heavy seed pages
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Runs one crawl job to completion
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlResult)` - At least one page was captured
    /// * `Err(CrawlError)` - The configuration was invalid, or no page was
    ///   captured. A classified seed failure is preferred over the generic
    ///   [`CrawlError::NoPagesProcessed`].
    pub async fn crawl(&self, config: &CrawlConfig) -> Result<CrawlResult> {
        validate(config)?;

        let repaired = repair_seed_url(&config.url);
        let seed_url = parse_seed(&repaired)?;
        let seed = normalize_url(&repaired).unwrap_or_else(|_| repaired.clone());
        let allowed_domains = resolve_allowed_domains(&config.allowed_domains, &repaired, &seed_url);

        tracing::info!(
            "Starting crawl of {} (max {} pages, follow links: {}, allowed domains: {:?})",
            seed,
            config.max_pages,
            config.follow_links,
            allowed_domains
        );
        let start_time = Instant::now();

        let job = Arc::new(CrawlJob {
            config: config.clone(),
            seed: seed.clone(),
            allowed_domains,
            ledger: CrawlLedger::new(config.max_pages),
            scheduler: Scheduler::new(config.politeness.clone()),
            transport: self.transport.clone(),
            seed_state: Mutex::new(SeedState::default()),
        });

        // Queued before any request so the seed's own links cannot re-queue it
        job.ledger.mark_queued(&seed);

        let initial = match self.render_seed(&job).await {
            Some(links) => links,
            None => vec![seed.clone()],
        };

        let mut tasks = JoinSet::new();
        for url in initial {
            tasks.spawn(visit(Arc::clone(&job), url));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(links) => {
                    for url in links {
                        tracing::debug!("Scheduling {}", url);
                        tasks.spawn(visit(Arc::clone(&job), url));
                    }
                }
                Err(e) => tracing::warn!("Crawl task failed: {}", e),
            }
        }

        let tally = job.ledger.finish();
        let seed_error = job.seed_state().error.take();

        tracing::info!(
            "Crawl of {} finished: {} pages captured, {} HTML responses, {} failures in {:?}",
            seed,
            tally.pages.len(),
            tally.pages_found,
            tally.failures.len(),
            start_time.elapsed()
        );

        let Some(first) = tally.pages.first() else {
            return Err(seed_error.unwrap_or(CrawlError::NoPagesProcessed { url: seed }));
        };

        if let Some(error) = seed_error {
            tracing::debug!("Clearing seed error after capturing pages: {}", error);
        }

        Ok(CrawlResult {
            url: seed,
            title: first.title.clone(),
            content: first.content.clone(),
            pages_crawled: tally.pages.len(),
            pages_found: tally.pages_found,
            pages: tally.pages,
            products: tally.products,
            failures: tally.failures,
        })
    }

    /// Renders the seed when the job asks for it
    ///
    /// Returns the links discovered on the rendered page if it was captured,
    /// or `None` when the ordinary fetch of the seed should run instead.
    async fn render_seed(&self, job: &CrawlJob) -> Option<Vec<String>> {
        if !job.config.render_js {
            return None;
        }

        let options = RenderOptions::from_config(&job.config);
        tracing::info!("Rendering {} (timeout {:?})", job.seed, options.timeout);

        match self.renderer.render(&job.seed, &options).await {
            Ok(html) => {
                job.ledger.record_html_response();
                let outcome = job.process_document(&job.seed, &job.seed, 200, &html);
                if outcome.accepted {
                    Some(outcome.links)
                } else {
                    tracing::info!("Rendered {} was not usable, fetching it instead", job.seed);
                    None
                }
            }
            Err(e) => {
                tracing::warn!("Rendering {} failed, fetching it instead: {}", job.seed, e);
                None
            }
        }
    }
}

/// Runs a crawl job with a freshly built crawler
///
/// # Example
///
/// ```no_run
/// use gleaner::{crawl, CrawlConfig};
///
/// # async fn run() -> gleaner::Result<()> {
/// let mut config = CrawlConfig::new("https://example.com");
/// config.follow_links = true;
///
/// let result = crawl(&config).await?;
/// println!("{} pages", result.pages_crawled);
/// # Ok(())
/// # }
/// ```
pub async fn crawl(config: &CrawlConfig) -> Result<CrawlResult> {
    Crawler::new()?.crawl(config).await
}

/// Seed failure bookkeeping
#[derive(Debug, Default)]
struct SeedState {
    /// First terminal failure of the seed
    error: Option<CrawlError>,

    /// Whether the duplicate-signal retry was already used
    retried: bool,
}

/// State shared by every task of one crawl job
struct CrawlJob {
    config: CrawlConfig,
    seed: String,
    allowed_domains: Vec<String>,
    ledger: CrawlLedger,
    scheduler: Scheduler,
    transport: HttpTransport,
    seed_state: Mutex<SeedState>,
}

/// What processing a document produced
struct DocumentOutcome {
    accepted: bool,
    links: Vec<String>,
}

impl DocumentOutcome {
    fn dropped() -> Self {
        Self {
            accepted: false,
            links: Vec::new(),
        }
    }
}

impl CrawlJob {
    fn seed_state(&self) -> std::sync::MutexGuard<'_, SeedState> {
        self.seed_state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Extracts a fetched document and collects the links to schedule
    ///
    /// `requested` is the normalized URL that was scheduled. The page is
    /// keyed on the canonical form of `final_url`, and both URLs are marked
    /// processed on admission. Links are resolved against `final_url`.
    fn process_document(
        &self,
        requested: &str,
        final_url: &str,
        status_code: u16,
        body: &str,
    ) -> DocumentOutcome {
        let fetched = normalize_url(final_url).unwrap_or_else(|_| requested.to_string());
        let url = fetched.as_str();

        if self.ledger.budget_reached() {
            tracing::debug!("Page budget reached, dropping {}", url);
            return DocumentOutcome::dropped();
        }
        if self.ledger.is_processed(url) || self.ledger.is_processed(requested) {
            tracing::debug!("Already processed {}", url);
            return DocumentOutcome::dropped();
        }
        if url != requested {
            tracing::debug!("{} redirected to {}", requested, url);
        }

        let document = Html::parse_document(body);
        let extracted = extract(&document);
        let word_count = extracted.word_count();

        if word_count < MIN_WORD_COUNT {
            tracing::debug!("Dropping {} with only {} words", url, word_count);
            return DocumentOutcome::dropped();
        }

        let page = CrawledPage {
            url: url.to_string(),
            title: extracted.title,
            content: extracted.content,
            crawled_at: Utc::now(),
            status_code,
            size: body.len(),
            word_count,
        };

        match self.ledger.admit_fetched(page, requested) {
            Admission::Accepted => {
                tracing::info!("Captured {} ({} words)", url, word_count);
            }
            Admission::Duplicate => {
                tracing::debug!("Already processed {}", url);
                return DocumentOutcome::dropped();
            }
            Admission::BudgetExhausted => {
                tracing::debug!("Page budget reached, dropping {}", url);
                return DocumentOutcome::dropped();
            }
        }

        let base = match Url::parse(final_url).or_else(|_| Url::parse(url)) {
            Ok(base) => base,
            Err(e) => {
                tracing::warn!("Cannot resolve links of {}: {}", url, e);
                return DocumentOutcome {
                    accepted: true,
                    links: Vec::new(),
                };
            }
        };

        self.ledger
            .add_products(extract_page_products(&document, base.as_str()));

        let links = if self.config.follow_links && !self.ledger.budget_reached() {
            self.schedule_links(&document, &base)
        } else {
            Vec::new()
        };

        DocumentOutcome {
            accepted: true,
            links,
        }
    }

    /// Claims up to [`MAX_LINKS_PER_PAGE`] allowed, unseen links of a page
    fn schedule_links(&self, document: &Html, base: &Url) -> Vec<String> {
        let mut scheduled = Vec::new();

        for link in discover_links(document, base) {
            if scheduled.len() >= MAX_LINKS_PER_PAGE {
                break;
            }

            let Ok(normalized) = normalize_url(&link) else {
                continue;
            };
            if !is_allowed(&normalized, &self.config, &self.allowed_domains) {
                tracing::trace!("Link not allowed: {}", normalized);
                continue;
            }
            if self.ledger.claim_link(&normalized) {
                scheduled.push(normalized);
            }
        }

        scheduled
    }

    /// Classifies a failed fetch and returns any URL to retry
    fn handle_failure(&self, url: &str, status: Option<u16>, message: Option<String>) -> Vec<String> {
        let is_seed = url == self.seed;
        let outcome = classify(status, message.as_deref(), is_seed);

        tracing::warn!(
            "Fetch of {} failed ({:?}{}): {}",
            url,
            outcome.kind,
            status.map(|s| format!(", status {}", s)).unwrap_or_default(),
            message.as_deref().unwrap_or("no details")
        );

        self.ledger.record_failure(FetchFailure {
            url: url.to_string(),
            kind: outcome.kind,
            status,
            message: message.clone(),
        });

        if outcome.kind == FailureKind::DuplicateSignal {
            return self.retry_seed(url);
        }

        if outcome.terminal {
            let mut seed_state = self.seed_state();
            if seed_state.error.is_none() {
                seed_state.error = Some(terminal_error(
                    outcome.kind,
                    url,
                    status,
                    message.as_deref(),
                ));
            }
        }

        Vec::new()
    }

    /// Retries the seed once if a duplicate signal swallowed it
    fn retry_seed(&self, url: &str) -> Vec<String> {
        if url != self.seed || self.ledger.is_processed(url) || self.ledger.page_count() > 0 {
            return Vec::new();
        }

        let mut seed_state = self.seed_state();
        if seed_state.retried {
            return Vec::new();
        }
        seed_state.retried = true;
        drop(seed_state);

        tracing::info!("Retrying seed {} after duplicate signal", url);
        self.ledger.release_queued(url);
        if self.ledger.mark_queued(url) {
            vec![url.to_string()]
        } else {
            Vec::new()
        }
    }
}

/// Fetches one URL and processes the response
///
/// Returns the newly claimed links to schedule.
async fn visit(job: Arc<CrawlJob>, url: String) -> Vec<String> {
    let domain = Url::parse(&url)
        .ok()
        .and_then(|parsed| extract_domain(&parsed))
        .unwrap_or_default();

    let Some(permit) = job.scheduler.acquire(&domain).await else {
        return Vec::new();
    };

    if job.ledger.budget_reached() {
        tracing::debug!("Page budget reached, skipping {}", url);
        return Vec::new();
    }

    tracing::debug!("Fetching {}", url);
    let fetched = job.transport.fetch(&url, job.config.timeout()).await;
    drop(permit);

    match fetched {
        FetchResult::Success {
            final_url,
            status_code,
            body,
            ..
        } => {
            job.ledger.record_html_response();
            job.process_document(&url, &final_url, status_code, &body).links
        }
        FetchResult::NotHtml { content_type } => {
            tracing::debug!("Skipping {} with content type {}", url, content_type);
            Vec::new()
        }
        FetchResult::HttpError { status_code } => job.handle_failure(&url, Some(status_code), None),
        FetchResult::TransportError { error } => job.handle_failure(&url, None, Some(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(config: CrawlConfig) -> CrawlJob {
        let seed = normalize_url(&config.url).unwrap();
        let seed_url = Url::parse(&seed).unwrap();
        let allowed_domains = resolve_allowed_domains(&config.allowed_domains, &config.url, &seed_url);

        CrawlJob {
            ledger: CrawlLedger::new(config.max_pages),
            scheduler: Scheduler::new(config.politeness.clone()),
            transport: HttpTransport::new().unwrap(),
            seed_state: Mutex::new(SeedState::default()),
            seed,
            allowed_domains,
            config,
        }
    }

    fn article(words: usize, links: &[&str]) -> String {
        let text = vec!["word"; words].join(" ");
        let anchors: String = links
            .iter()
            .map(|href| format!("<a href=\"{}\">link</a>", href))
            .collect();
        format!(
            "<html><head><title>Page</title></head><body><main><p>{}</p></main>{}</body></html>",
            text, anchors
        )
    }

    #[test]
    fn test_thin_page_is_dropped() {
        let job = job(CrawlConfig::new("https://example.com/"));
        let outcome = job.process_document("https://example.com/", "https://example.com/", 200, &article(5, &[]));

        assert!(!outcome.accepted);
        assert_eq!(job.ledger.page_count(), 0);
        assert!(!job.ledger.is_processed("https://example.com/"));
    }

    #[test]
    fn test_duplicate_document_is_dropped() {
        let job = job(CrawlConfig::new("https://example.com/"));
        let body = article(30, &[]);

        assert!(job.process_document("https://example.com/", "https://example.com/", 200, &body).accepted);
        assert!(!job.process_document("https://example.com/", "https://example.com/", 200, &body).accepted);
        assert_eq!(job.ledger.page_count(), 1);
    }

    #[test]
    fn test_redirected_page_keyed_on_fetched_url() {
        let mut config = CrawlConfig::new("https://example.com/");
        config.follow_links = true;
        let job = job(config);
        job.ledger.mark_queued(&job.seed);

        let body = article(30, &["/home/", "/about"]);
        let outcome = job.process_document("https://example.com/", "https://example.com/home/", 200, &body);

        assert!(outcome.accepted);
        assert_eq!(outcome.links, vec!["https://example.com/about".to_string()]);
        assert!(job.ledger.is_processed("https://example.com/"));
        assert!(job.ledger.is_processed("https://example.com/home"));

        let again = job.process_document("https://example.com/home", "https://example.com/home", 200, &body);
        assert!(!again.accepted);

        let pages = job.ledger.finish().pages;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].url, "https://example.com/home");
    }

    #[test]
    fn test_links_are_filtered_and_deduplicated() {
        let mut config = CrawlConfig::new("https://example.com/");
        config.follow_links = true;
        let job = job(config);
        job.ledger.mark_queued(&job.seed);

        let body = article(
            30,
            &["/x/", "/x", "https://other.com/a", "/style.css", "/", "mailto:a@b.c", "/y#frag"],
        );
        let outcome = job.process_document("https://example.com/", "https://example.com/", 200, &body);

        assert!(outcome.accepted);
        assert_eq!(
            outcome.links,
            vec!["https://example.com/x".to_string(), "https://example.com/y".to_string()]
        );
    }

    #[test]
    fn test_links_per_page_are_capped() {
        let mut config = CrawlConfig::new("https://example.com/");
        config.follow_links = true;
        let job = job(config);

        let hrefs: Vec<String> = (0..50).map(|i| format!("/page-{}", i)).collect();
        let hrefs: Vec<&str> = hrefs.iter().map(String::as_str).collect();
        let outcome = job.process_document("https://example.com/", "https://example.com/", 200, &article(30, &hrefs));

        assert_eq!(outcome.links.len(), MAX_LINKS_PER_PAGE);
    }

    #[test]
    fn test_no_links_without_follow() {
        let job = job(CrawlConfig::new("https://example.com/"));
        let outcome = job.process_document("https://example.com/", "https://example.com/", 200, &article(30, &["/a"]));

        assert!(outcome.accepted);
        assert!(outcome.links.is_empty());
    }

    #[test]
    fn test_seed_failure_is_recorded_once() {
        let job = job(CrawlConfig::new("https://example.com/"));

        job.handle_failure("https://example.com/", Some(403), None);
        job.handle_failure("https://example.com/", Some(500), None);

        let error = job.seed_state().error.take().unwrap();
        assert!(matches!(error, CrawlError::Blocked { .. }));
        assert_eq!(job.ledger.finish().failures.len(), 2);
    }

    #[test]
    fn test_link_failure_is_not_terminal() {
        let job = job(CrawlConfig::new("https://example.com/"));

        job.handle_failure("https://example.com/other", Some(403), None);

        assert!(job.seed_state().error.is_none());
        let failures = job.ledger.finish().failures;
        assert_eq!(failures[0].kind, FailureKind::Blocked);
    }

    #[test]
    fn test_duplicate_signal_retries_seed_once() {
        let job = job(CrawlConfig::new("https://example.com/"));
        job.ledger.mark_queued(&job.seed);

        let signal = Some("URL already visited".to_string());
        let retry = job.handle_failure("https://example.com/", None, signal.clone());
        assert_eq!(retry, vec!["https://example.com/".to_string()]);

        let retry = job.handle_failure("https://example.com/", None, signal);
        assert!(retry.is_empty());
        assert!(job.seed_state().error.is_none());
    }
}
