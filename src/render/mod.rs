//! JavaScript rendering fallback for seed pages
//!
//! Rendering is only attempted when a job asks for it, and only for the seed
//! URL. Any [`RenderError`](crate::RenderError) sends the crawler back to an
//! ordinary fetch.

mod chromium;
mod plan;

pub use chromium::ChromiumRenderer;
pub use plan::{
    RenderDriver, RenderPlan, RenderStep, Severity, MAX_NETWORK_IDLE, READY_TIMEOUT,
    SELECTOR_TIMEOUT,
};

use crate::config::CrawlConfig;
use crate::RenderResult;
use async_trait::async_trait;
use std::time::Duration;

/// Settings for one render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Parent deadline covering every render step
    pub timeout: Duration,

    /// CSS selector to wait for, if any
    pub wait_selector: Option<String>,

    /// Network-idle grace period, if any
    pub network_idle_after: Option<Duration>,
}

impl RenderOptions {
    pub fn from_config(config: &CrawlConfig) -> Self {
        Self {
            timeout: config.render_timeout(),
            wait_selector: config.wait_selector().map(str::to_string),
            network_idle_after: config.network_idle_after(),
        }
    }
}

/// Produces rendered HTML for a URL
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, url: &str, options: &RenderOptions) -> RenderResult<String>;
}
