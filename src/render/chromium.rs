//! Headless Chromium renderer
//!
//! Every render launches a fresh browser process, so concurrent crawl jobs
//! never share a browser context.

use crate::crawler::BROWSER_USER_AGENT;
use crate::render::plan::{RenderDriver, RenderPlan};
use crate::render::{RenderOptions, Renderer};
use crate::{RenderError, RenderResult};
use async_trait::async_trait;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Upper bound on closing the browser once a render has finished
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(3);

/// Resolves once no resource or navigation entry was observed for `waitMs`.
/// Without PerformanceObserver it simply waits `waitMs`.
const NETWORK_IDLE_JS: &str = r#"(function(waitMs){
  return new Promise((resolve) => {
    if (!('PerformanceObserver' in window)) {
      setTimeout(resolve, waitMs);
      return;
    }
    let last = Date.now();
    const obs = new PerformanceObserver(() => { last = Date.now(); });
    try { obs.observe({entryTypes: ['resource', 'navigation']}); } catch (e) {}
    const tick = () => {
      if (Date.now() - last >= waitMs) { try { obs.disconnect(); } catch (e) {} resolve(true); return; }
      setTimeout(tick, 100);
    };
    tick();
  });
})"#;

/// Renders pages with a locally installed Chromium
#[derive(Debug, Clone)]
pub struct ChromiumRenderer {
    user_agent: String,
}

impl Default for ChromiumRenderer {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.to_string(),
        }
    }
}

impl ChromiumRenderer {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }

    /// Launches a headless browser with server-friendly flags
    async fn launch(&self) -> RenderResult<(Browser, JoinHandle<()>)> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", self.user_agent))
            .build()
            .map_err(RenderError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        // The handler stream drives the CDP connection and must be polled
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler stopped: {}", e);
                    break;
                }
            }
        });

        Ok((browser, handler_task))
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn render(&self, url: &str, options: &RenderOptions) -> RenderResult<String> {
        let deadline = Instant::now() + options.timeout;

        let (mut browser, handler_task) = tokio::time::timeout_at(deadline, self.launch())
            .await
            .map_err(|_| RenderError::Timeout {
                step: "launch",
                elapsed_ms: options.timeout.as_millis(),
            })??;

        let result = async {
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| RenderError::Browser(e.to_string()))?;

            let plan = RenderPlan::from_options(options);
            plan.execute(&ChromiumPage { page }, url, deadline).await
        }
        .await;

        let teardown = async {
            if let Err(e) = browser.close().await {
                tracing::debug!("Failed to close browser: {}", e);
            }
            if let Err(e) = browser.wait().await {
                tracing::debug!("Failed to wait for browser exit: {}", e);
            }
        };
        if !bounded_teardown(teardown, TEARDOWN_TIMEOUT).await {
            // Dropping the browser kills the process
            tracing::warn!("Browser shutdown did not finish within {:?}", TEARDOWN_TIMEOUT);
        }
        handler_task.abort();

        result
    }
}

/// Runs a teardown future, returning `false` if it outlived `limit`
async fn bounded_teardown<F>(teardown: F, limit: Duration) -> bool
where
    F: Future<Output = ()>,
{
    tokio::time::timeout(limit, teardown).await.is_ok()
}

/// A live browser page driven by a render plan
struct ChromiumPage {
    page: Page,
}

impl ChromiumPage {
    async fn evaluate_bool(&self, expression: String, await_promise: bool) -> RenderResult<bool> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .await_promise(await_promise)
            .return_by_value(true)
            .build()
            .map_err(RenderError::Browser)?;

        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|e| RenderError::Browser(e.to_string()))?;

        Ok(result.into_value::<bool>().unwrap_or(false))
    }
}

#[async_trait]
impl RenderDriver for ChromiumPage {
    async fn navigate(&self, url: &str) -> RenderResult<()> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| RenderError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })
    }

    async fn wait_ready(&self) -> RenderResult<()> {
        while self.page.find_element("body").await.is_err() {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        Ok(())
    }

    async fn wait_visible(&self, selector: &str) -> RenderResult<()> {
        let selector = serde_json::to_string(selector)
            .map_err(|e| RenderError::Browser(e.to_string()))?;
        let check = format!(
            "(() => {{ const el = document.querySelector({}); \
             if (!el) return false; \
             const style = window.getComputedStyle(el); \
             const rect = el.getBoundingClientRect(); \
             return style.visibility !== 'hidden' && style.display !== 'none' \
             && (rect.width > 0 || rect.height > 0); }})()",
            selector
        );

        while !self.evaluate_bool(check.clone(), false).await? {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        Ok(())
    }

    async fn wait_network_idle(&self, grace: Duration) -> RenderResult<()> {
        let expression = format!("{}({})", NETWORK_IDLE_JS, grace.as_millis());
        self.evaluate_bool(expression, true).await.map(|_| ())
    }

    async fn capture_html(&self) -> RenderResult<String> {
        self.page
            .content()
            .await
            .map_err(|e| RenderError::Capture(e.to_string()))
    }
}
