//! Scheduler for politeness and concurrency limiting
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Per-domain parallelism (one in-flight request per domain by default)
//!   where `www.example.com` and `example.com` share one slot
//! - A fixed delay plus random jitter between requests to the same domain

use crate::config::PolitenessConfig;
use crate::url::strip_www;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Permits held for the duration of one fetch
///
/// Dropping the permit frees both the domain slot and the global slot.
#[derive(Debug)]
pub struct SchedulerPermit {
    _domain: OwnedSemaphorePermit,
    _global: OwnedSemaphorePermit,
}

/// Per-domain politeness state
#[derive(Debug)]
struct DomainSlot {
    /// Limits in-flight requests to this domain
    permits: Arc<Semaphore>,

    /// Earliest time the next request to this domain may start
    next_request_at: Option<Instant>,

    /// Number of requests granted so far
    request_count: u32,
}

/// Scheduler gates every fetch of a crawl job
///
/// The scheduler coordinates:
/// - Global concurrency limits (max fetches in flight for the job)
/// - Per-domain parallelism limits
/// - Per-domain spacing (delay plus jitter between request starts)
#[derive(Debug)]
pub struct Scheduler {
    /// Global semaphore for limiting concurrent fetches
    global_semaphore: Arc<Semaphore>,

    /// Per-domain state tracking
    domains: Mutex<HashMap<String, DomainSlot>>,

    politeness: PolitenessConfig,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `politeness` - Delay, jitter and concurrency limits
    pub fn new(politeness: PolitenessConfig) -> Self {
        let global_semaphore = Arc::new(Semaphore::new(politeness.max_concurrency.max(1)));

        Self {
            global_semaphore,
            domains: Mutex::new(HashMap::new()),
            politeness,
        }
    }

    /// Waits until a request to `domain` may start
    ///
    /// This method:
    /// 1. Acquires the domain's parallelism permit
    /// 2. Reserves the domain's next start time and sleeps until it arrives
    /// 3. Acquires a global concurrency permit
    ///
    /// # Returns
    ///
    /// * `Some(SchedulerPermit)` - The request may start now
    /// * `None` - A semaphore was closed
    pub async fn acquire(&self, domain: &str) -> Option<SchedulerPermit> {
        let key = site_key(domain);
        let domain = key.as_str();
        let domain_permits = {
            let mut domains = self.domains.lock().unwrap_or_else(PoisonError::into_inner);
            let slot = domains
                .entry(domain.to_string())
                .or_insert_with(|| DomainSlot {
                    permits: Arc::new(Semaphore::new(self.politeness.parallelism.max(1))),
                    next_request_at: None,
                    request_count: 0,
                });
            Arc::clone(&slot.permits)
        };

        let domain_permit = domain_permits.acquire_owned().await.ok()?;

        let wait = self.reserve_start(domain);
        if !wait.is_zero() {
            tracing::debug!("Waiting {:?} before next request to {}", wait, domain);
            tokio::time::sleep(wait).await;
        }

        let global_permit = self.global_semaphore.clone().acquire_owned().await.ok()?;

        Some(SchedulerPermit {
            _domain: domain_permit,
            _global: global_permit,
        })
    }

    /// Reserves the next start time for a domain and returns how long to wait
    fn reserve_start(&self, domain: &str) -> Duration {
        let now = Instant::now();
        let spacing = self.spacing();

        let mut domains = self.domains.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(slot) = domains.get_mut(domain) else {
            return Duration::ZERO;
        };

        let start = slot.next_request_at.map_or(now, |at| at.max(now));
        slot.next_request_at = Some(start + spacing);
        slot.request_count += 1;

        start - now
    }

    /// Delay plus a random jitter in `0..=random_delay`
    fn spacing(&self) -> Duration {
        let jitter_ms = self.politeness.random_delay_ms;
        let jitter = if jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_ms)
        };

        self.politeness.delay() + Duration::from_millis(jitter)
    }

    /// Returns the number of requests granted to a domain
    pub fn request_count(&self, domain: &str) -> u32 {
        self.domains
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&site_key(domain))
            .map_or(0, |slot| slot.request_count)
    }
}

/// Politeness slot key: the case-folded host without a leading `www.`
fn site_key(domain: &str) -> String {
    strip_www(&domain.to_lowercase()).to_string()
}
