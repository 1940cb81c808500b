//! Headless browser transport
//!
//! Launches a fresh Chromium per fetch so the proxy, which Chromium
//! only accepts on the command line, can differ between attempts. The
//! event handler stream must be drained for the browser's whole
//! lifetime or CDP calls stall.

use crate::fetch::{Transport, TransportResponse};
use crate::policy::AttemptPlan;
use crate::{Result, SeineError};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{BlockPattern, SetBlockedUrLsParams};
use futures::StreamExt;
use rand::{thread_rng, Rng};
use std::time::Duration;
use url::Url;

/// Launch arguments that hide the most common automation tells
const STEALTH_ARGS: [&str; 7] = [
    "--disable-blink-features=AutomationControlled",
    "--no-sandbox",
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--disable-infobars",
    "--window-size=1920,1080",
    "--start-maximized",
];

/// Desktop Chrome user agents rotated when no policy pins one
const USER_AGENT_POOL: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
];

/// Request patterns aborted when a policy asks for lean page loads
const BLOCKED_RESOURCE_PATTERNS: [&str; 16] = [
    "*.png",
    "*.jpg",
    "*.jpeg",
    "*.gif",
    "*.webp",
    "*.svg",
    "*.ico",
    "*.woff",
    "*.woff2",
    "*.ttf",
    "*.otf",
    "*.css",
    "*google-analytics.com*",
    "*googletagmanager.com*",
    "*doubleclick.net*",
    "*facebook.net*",
];

/// Fetches pages by rendering them in headless Chromium
pub struct BrowserTransport {
    navigation_timeout: Duration,
    headless: bool,
    extra_args: Vec<String>,
}

impl BrowserTransport {
    pub fn new(config: &crate::config::BrowserConfig) -> Self {
        Self {
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            headless: config.headless,
            extra_args: config.chrome_args.clone(),
        }
    }

    /// Assembles the Chromium launch configuration for one attempt
    fn launch_config(&self, plan: &AttemptPlan) -> std::result::Result<BrowserConfig, String> {
        let mut builder = BrowserConfig::builder();

        for arg in STEALTH_ARGS {
            builder = builder.arg(arg);
        }
        for arg in &self.extra_args {
            builder = builder.arg(arg.as_str());
        }
        if let Some(identity) = &plan.proxy {
            builder = builder.arg(format!("--proxy-server={}", identity.server));
        }
        if !self.headless {
            builder = builder.with_head();
        }

        builder.build()
    }

    /// Opens a page, navigates, and returns the rendered document
    async fn render(
        &self,
        browser: &Browser,
        url: &Url,
        plan: &AttemptPlan,
    ) -> Result<TransportResponse> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| browser_error(url, format!("failed to open page: {}", e)))?;

        let user_agent = plan.user_agent.clone().unwrap_or_else(random_user_agent);
        page.set_user_agent(user_agent)
            .await
            .map_err(|e| browser_error(url, format!("failed to set user agent: {}", e)))?;

        if plan.block_resources {
            page.execute(SetBlockedUrLsParams {
                url_patterns: Some(
                    BLOCKED_RESOURCE_PATTERNS
                        .iter()
                        .map(|pattern| BlockPattern::new(pattern.to_string(), true))
                        .collect(),
                ),
            })
            .await
            .map_err(|e| browser_error(url, format!("failed to block resources: {}", e)))?;
        }

        let html = tokio::time::timeout(self.navigation_timeout, async {
            page.goto(url.as_str()).await?;
            page.wait_for_navigation().await?;
            page.content().await
        })
        .await
        .map_err(|_| SeineError::Timeout {
            url: url.to_string(),
        })?
        .map_err(|e| browser_error(url, format!("navigation failed: {}", e)))?;

        let _ = page.close().await;

        Ok(TransportResponse {
            http_status: None,
            body: html,
        })
    }
}

#[async_trait]
impl Transport for BrowserTransport {
    async fn fetch(&self, url: &Url, plan: &AttemptPlan) -> Result<TransportResponse> {
        let config = self
            .launch_config(plan)
            .map_err(|message| browser_error(url, message))?;

        let (mut browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            browser_error(
                url,
                format!(
                    "failed to launch browser: {}. Is Chromium installed and in PATH?",
                    e
                ),
            )
        })?;

        let handler_task = tokio::spawn(async move {
            while let Some(_event) = handler.next().await {}
        });

        let result = self.render(&browser, url, plan).await;

        // Chromium survives as a zombie if close is skipped on the
        // error path, so teardown runs before the result is inspected
        let _ = browser.close().await;
        let _ = browser.wait().await;
        handler_task.abort();

        result
    }
}

fn browser_error(url: &Url, message: String) -> SeineError {
    SeineError::Browser {
        url: url.to_string(),
        message,
    }
}

fn random_user_agent() -> String {
    let index = thread_rng().gen_range(0..USER_AGENT_POOL.len());
    USER_AGENT_POOL[index].to_string()
}
