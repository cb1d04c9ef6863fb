use serde::Deserialize;
use std::time::Duration;

/// Default page budget when none is configured
pub const DEFAULT_MAX_PAGES: usize = 50;

/// Default per-request timeout (milliseconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Default overall render timeout (milliseconds)
pub const DEFAULT_RENDER_TIMEOUT_MS: u64 = 45_000;

/// Default network-idle grace period used when rendering (milliseconds)
pub const DEFAULT_NETWORK_IDLE_MS: u64 = 1_200;

/// Configuration for a single crawl job
///
/// A `CrawlConfig` is immutable input: the crawler never mutates it, and
/// everything a job derives from it (allowed domains, canonical seed) lives
/// in the job's own state.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Seed URL the crawl starts from
    #[serde(default)]
    pub url: String,

    /// Maximum number of pages captured by the job
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Explicit domain allow-list; derived from the seed host when empty
    #[serde(default)]
    pub allowed_domains: Vec<String>,

    /// Path prefixes a followed URL must start with (empty means any path)
    #[serde(default)]
    pub allowed_paths: Vec<String>,

    /// Whether outbound links are followed
    #[serde(default)]
    pub follow_links: bool,

    /// Carried for callers; the crawler does not fetch images
    #[serde(default)]
    pub include_images: bool,

    /// Carried for callers; robots.txt is not enforced by the crawler
    #[serde(default)]
    pub respect_robots: bool,

    /// Per-request timeout (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Render the seed page through a headless browser first
    #[serde(default)]
    pub render_js: bool,

    /// Overall render timeout (milliseconds)
    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    /// CSS selector to await while rendering
    #[serde(default)]
    pub wait_selector: Option<String>,

    /// Network-idle grace period while rendering (milliseconds, 0 disables)
    #[serde(default = "default_network_idle_ms")]
    pub network_idle_after_ms: u64,

    /// Rate limiting and worker pool settings
    #[serde(default)]
    pub politeness: PolitenessConfig,
}

/// Self-imposed rate limiting applied to every request of a job
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolitenessConfig {
    /// Maximum in-flight requests per domain
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    /// Fixed delay between requests to the same domain (milliseconds)
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Upper bound of the random jitter added to the delay (milliseconds)
    #[serde(default = "default_random_delay_ms")]
    pub random_delay_ms: u64,

    /// Maximum number of fetch workers running at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl CrawlConfig {
    /// Creates a configuration for `url` with every other field defaulted
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_pages: DEFAULT_MAX_PAGES,
            allowed_domains: Vec::new(),
            allowed_paths: Vec::new(),
            follow_links: false,
            include_images: false,
            respect_robots: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            render_js: false,
            render_timeout_ms: DEFAULT_RENDER_TIMEOUT_MS,
            wait_selector: None,
            network_idle_after_ms: DEFAULT_NETWORK_IDLE_MS,
            politeness: PolitenessConfig::default(),
        }
    }

    /// Per-request timeout, falling back to the default when unset
    pub fn timeout(&self) -> Duration {
        match self.timeout_ms {
            0 => Duration::from_millis(DEFAULT_TIMEOUT_MS),
            ms => Duration::from_millis(ms),
        }
    }

    /// Overall render timeout, falling back to the default when unset
    pub fn render_timeout(&self) -> Duration {
        match self.render_timeout_ms {
            0 => Duration::from_millis(DEFAULT_RENDER_TIMEOUT_MS),
            ms => Duration::from_millis(ms),
        }
    }

    /// Network-idle grace period, or `None` when disabled
    pub fn network_idle_after(&self) -> Option<Duration> {
        (self.network_idle_after_ms > 0).then(|| Duration::from_millis(self.network_idle_after_ms))
    }

    /// The configured wait selector, ignoring blank values
    pub fn wait_selector(&self) -> Option<&str> {
        self.wait_selector
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

impl PolitenessConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn random_delay(&self) -> Duration {
        Duration::from_millis(self.random_delay_ms)
    }
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            delay_ms: default_delay_ms(),
            random_delay_ms: default_random_delay_ms(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_render_timeout_ms() -> u64 {
    DEFAULT_RENDER_TIMEOUT_MS
}

fn default_network_idle_ms() -> u64 {
    DEFAULT_NETWORK_IDLE_MS
}

fn default_parallelism() -> usize {
    1
}

fn default_delay_ms() -> u64 {
    2_000
}

fn default_random_delay_ms() -> u64 {
    1_000
}

fn default_max_concurrency() -> usize {
    4
}
