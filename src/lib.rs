//! Gleaner: a polite single-site content crawler
//!
//! This crate crawls a site from one seed URL, deduplicates pages under
//! concurrent fetches, extracts readable text while discarding boilerplate,
//! and can render JavaScript-heavy seed pages through a headless browser.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod output;
pub mod render;
pub mod url;

use thiserror::Error;

/// Job-level error returned when a crawl produces no pages
///
/// Only failures affecting the seed URL (or the absence of any captured page)
/// ever surface here. Failures on followed links are recorded on the result
/// as diagnostics instead.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("invalid crawl configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error(
        "access forbidden (403): the website blocked the crawler at {url}. \
         This could be due to bot protection or restricted access"
    )]
    Blocked { url: String },

    #[error("rate limited (429): too many requests to {url}. Please wait and try again later")]
    RateLimited { url: String },

    #[error("server error ({status}): the target server returned an error for {url}")]
    OriginServer { url: String, status: u16 },

    #[error("network error for {url}: {message}. Please check the URL and your connection")]
    Network { url: String, message: String },

    #[error("HTTP error ({status}) for {url}")]
    Http { url: String, status: u16 },

    #[error("failed to crawl initial URL {url}: {message}")]
    SeedFailed { url: String, message: String },

    #[error("initial URL {url} was not processed")]
    NoPagesProcessed { url: String },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid seed URL: {0}")]
    InvalidUrl(#[from] UrlError),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,
}

/// Headless rendering errors
///
/// These never fail a crawl job; the orchestrator falls back to an
/// ordinary fetch when rendering returns one.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("render step '{step}' timed out after {elapsed_ms}ms")]
    Timeout { step: &'static str, elapsed_ms: u128 },

    #[error("failed to capture rendered HTML: {0}")]
    Capture(String),

    #[error("browser error: {0}")]
    Browser(String),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Result type alias for render operations
pub type RenderResult<T> = std::result::Result<T, RenderError>;

// Re-export commonly used types
pub use config::CrawlConfig;
pub use crawler::{crawl, CrawlResult, CrawledPage, Crawler};
pub use crate::url::{is_allowed, normalize_url, resolve_allowed_domains};
