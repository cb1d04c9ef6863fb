//! Ordered render steps with per-step timeouts
//!
//! A plan is a fixed sequence of steps run against one browser page. Each
//! step carries its own timeout, capped by whatever remains of the parent
//! deadline, and is either fatal or soft. Soft steps that fail or time out
//! are logged and skipped. The capture step always runs.

use crate::render::RenderOptions;
use crate::{RenderError, RenderResult};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;

/// Bound on the document-ready wait
pub const READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Bound on the selector-visible wait
pub const SELECTOR_TIMEOUT: Duration = Duration::from_secs(15);

/// Upper limit on the network-idle grace period, whatever is configured
pub const MAX_NETWORK_IDLE: Duration = Duration::from_secs(5);

/// The browser operations a render plan needs
///
/// Implemented over a live headless browser page, and by in-memory fakes in
/// tests.
#[async_trait]
pub trait RenderDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> RenderResult<()>;

    /// Resolves once the document body exists
    async fn wait_ready(&self) -> RenderResult<()>;

    /// Resolves once an element matching `selector` is visible
    async fn wait_visible(&self, selector: &str) -> RenderResult<()>;

    /// Resolves once no network activity was observed for `grace`
    async fn wait_network_idle(&self, grace: Duration) -> RenderResult<()>;

    /// Returns the rendered outer HTML
    async fn capture_html(&self) -> RenderResult<String>;
}

/// Whether a failed step aborts the render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Fatal,
    Soft,
}

/// One step of a render plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderStep {
    Navigate,
    WaitReady,
    WaitSelector(String),
    WaitNetworkIdle(Duration),
    Capture,
}

impl RenderStep {
    pub fn name(&self) -> &'static str {
        match self {
            RenderStep::Navigate => "navigate",
            RenderStep::WaitReady => "wait-ready",
            RenderStep::WaitSelector(_) => "wait-selector",
            RenderStep::WaitNetworkIdle(_) => "wait-network-idle",
            RenderStep::Capture => "capture",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            RenderStep::Navigate | RenderStep::Capture => Severity::Fatal,
            _ => Severity::Soft,
        }
    }

    /// The step's own bound; `None` means only the parent deadline applies
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            RenderStep::Navigate | RenderStep::Capture => None,
            RenderStep::WaitReady => Some(READY_TIMEOUT),
            RenderStep::WaitSelector(_) => Some(SELECTOR_TIMEOUT),
            RenderStep::WaitNetworkIdle(grace) => Some(*grace + Duration::from_secs(1)),
        }
    }

    async fn run<D>(&self, driver: &D, url: &str) -> RenderResult<Option<String>>
    where
        D: RenderDriver + ?Sized,
    {
        match self {
            RenderStep::Navigate => driver.navigate(url).await.map(|_| None),
            RenderStep::WaitReady => driver.wait_ready().await.map(|_| None),
            RenderStep::WaitSelector(selector) => {
                driver.wait_visible(selector).await.map(|_| None)
            }
            RenderStep::WaitNetworkIdle(grace) => {
                driver.wait_network_idle(*grace).await.map(|_| None)
            }
            RenderStep::Capture => driver.capture_html().await.map(Some),
        }
    }
}

/// An ordered list of render steps ending in a capture
#[derive(Debug, Clone)]
pub struct RenderPlan {
    steps: Vec<RenderStep>,
}

impl RenderPlan {
    /// Builds the plan for the given options
    ///
    /// The selector wait is included only when a selector is configured, and
    /// the network-idle wait only when a grace period is configured.
    pub fn from_options(options: &RenderOptions) -> Self {
        let mut steps = vec![RenderStep::Navigate, RenderStep::WaitReady];

        if let Some(selector) = &options.wait_selector {
            steps.push(RenderStep::WaitSelector(selector.clone()));
        }
        if let Some(grace) = options.network_idle_after {
            steps.push(RenderStep::WaitNetworkIdle(grace.min(MAX_NETWORK_IDLE)));
        }

        steps.push(RenderStep::Capture);
        Self { steps }
    }

    pub fn steps(&self) -> &[RenderStep] {
        &self.steps
    }

    /// Runs every step against `driver` before `deadline`
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The captured HTML
    /// * `Err(RenderError)` - Navigation or capture failed, or the parent
    ///   deadline expired during one of them
    pub async fn execute<D>(&self, driver: &D, url: &str, deadline: Instant) -> RenderResult<String>
    where
        D: RenderDriver + ?Sized,
    {
        for step in &self.steps {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let budget = step.timeout().map_or(remaining, |t| t.min(remaining));
            let started = Instant::now();

            let failure = if remaining.is_zero() {
                RenderError::Timeout {
                    step: step.name(),
                    elapsed_ms: 0,
                }
            } else {
                match tokio::time::timeout(budget, step.run(driver, url)).await {
                    Ok(Ok(Some(html))) => return Ok(html),
                    Ok(Ok(None)) => {
                        tracing::debug!(
                            "Render step {} finished in {:?}",
                            step.name(),
                            started.elapsed()
                        );
                        continue;
                    }
                    Ok(Err(e)) => e,
                    Err(_) => RenderError::Timeout {
                        step: step.name(),
                        elapsed_ms: started.elapsed().as_millis(),
                    },
                }
            };

            match step.severity() {
                Severity::Fatal => return Err(failure),
                Severity::Soft => {
                    tracing::warn!("Render step {} for {} skipped: {}", step.name(), url, failure)
                }
            }
        }

        Err(RenderError::Capture("render plan has no capture step".to_string()))
    }
}
