//! Fetch strategy selection
//!
//! One planned attempt in, one [`FetchOutcome`] out. Under the auto
//! method the selector runs plain HTTP first and escalates to the
//! browser within the same attempt when the response is blocked, the
//! transport fails, or the body looks like an unhydrated SPA shell.

use crate::config::Config;
use crate::fetch::block::BlockDetector;
use crate::fetch::browser::BrowserTransport;
use crate::fetch::http::HttpTransport;
use crate::fetch::page::{extract_page, needs_js_render};
use crate::fetch::{FetchOutcome, FetchStatus, Transport, TransportResponse};
use crate::policy::{AttemptPlan, FetchMethod};
use crate::SeineError;
use std::time::Instant;
use tracing::{debug, warn};
use url::Url;

/// Dispatches fetch attempts to the right transport
pub struct FetchSelector {
    http: HttpTransport,
    browser: Option<BrowserTransport>,
    detector: BlockDetector,
}

impl FetchSelector {
    pub fn new(config: &Config) -> Self {
        let browser = config
            .browser
            .enabled
            .then(|| BrowserTransport::new(&config.browser));

        Self {
            http: HttpTransport::new(&config.http),
            browser,
            detector: BlockDetector::new(&config.block_markers),
        }
    }

    /// Runs one planned fetch attempt against `url`
    ///
    /// Never returns an error: transport failures become an outcome
    /// with [`FetchStatus::Error`] so the caller can apply its retry
    /// budget uniformly.
    pub async fn execute(&self, url: &Url, plan: &AttemptPlan) -> FetchOutcome {
        let started = Instant::now();

        let mut outcome = match plan.method {
            FetchMethod::Http => self.run_http(url, plan).await,
            FetchMethod::Browser => self.run_browser(url, plan).await,
            FetchMethod::Auto => self.run_auto(url, plan).await,
        };

        outcome.elapsed_ms = started.elapsed().as_millis() as u64;
        outcome
    }

    async fn run_http(&self, url: &Url, plan: &AttemptPlan) -> FetchOutcome {
        match self.http.fetch(url, plan).await {
            Ok(response) => self.classify(url, response, FetchMethod::Http),
            Err(e) => transport_error_outcome(FetchMethod::Http, &e),
        }
    }

    async fn run_browser(&self, url: &Url, plan: &AttemptPlan) -> FetchOutcome {
        let Some(browser) = &self.browser else {
            warn!(url = %url, "browser transport disabled, falling back to http");
            return self.run_http(url, plan).await;
        };

        match browser.fetch(url, plan).await {
            Ok(response) => self.classify(url, response, FetchMethod::Browser),
            Err(e) => transport_error_outcome(FetchMethod::Browser, &e),
        }
    }

    /// HTTP first, browser second, one outcome for the whole attempt
    async fn run_auto(&self, url: &Url, plan: &AttemptPlan) -> FetchOutcome {
        let first = self.run_http(url, plan).await;
        if self.browser.is_none() || !should_escalate(&first) {
            return first;
        }

        debug!(url = %url, status = ?first.status, "escalating attempt to browser");
        let second = self.run_browser(url, plan).await;

        // A plain body that merely looked JS-rendered is still better
        // than a failed render
        if second.status != FetchStatus::Success && first.status == FetchStatus::Success {
            warn!(url = %url, "browser escalation failed, keeping http response");
            return first;
        }
        second
    }

    /// Turns a raw transport response into a classified outcome
    fn classify(&self, url: &Url, response: TransportResponse, method: FetchMethod) -> FetchOutcome {
        if let Some(reason) = self.detector.classify(response.http_status, &response.body) {
            debug!(url = %url, reason = %reason, "fetch blocked");
            return FetchOutcome::blocked(method, response.http_status, response.body, reason);
        }

        if let Some(status) = response.http_status {
            if !(200..300).contains(&status) {
                return FetchOutcome::error(
                    method,
                    Some(status),
                    response.body,
                    format!("http status {}", status),
                );
            }
        }

        let extracted = extract_page(&response.body, url);
        FetchOutcome::success(method, response.http_status, response.body, extracted)
    }
}

/// True when an HTTP outcome warrants the browser for the same attempt
fn should_escalate(outcome: &FetchOutcome) -> bool {
    match outcome.status {
        FetchStatus::Blocked => true,
        FetchStatus::Error => outcome.http_status.is_none(),
        FetchStatus::Success => needs_js_render(&outcome.body),
    }
}

fn transport_error_outcome(method: FetchMethod, error: &SeineError) -> FetchOutcome {
    FetchOutcome::error(method, None, String::new(), error.to_string())
}
