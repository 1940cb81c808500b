//! Plain HTTP transport
//!
//! Builds a fresh client per attempt because the proxy identity is
//! part of the plan: rotation hands successive attempts different
//! upstream URLs, and reqwest pins proxy selection at client build
//! time. Client construction is cheap next to the network round trip.

use crate::config::HttpConfig;
use crate::fetch::{Transport, TransportResponse};
use crate::policy::AttemptPlan;
use crate::{Result, SeineError};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Fetches pages with a plain HTTP client
pub struct HttpTransport {
    timeout: Duration,
    default_user_agent: String,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            default_user_agent: config.user_agent.clone(),
        }
    }

    /// Builds a client configured for one attempt
    fn build_client(&self, plan: &AttemptPlan) -> Result<Client> {
        let user_agent = plan
            .user_agent
            .clone()
            .unwrap_or_else(|| self.default_user_agent.clone());

        let mut builder = Client::builder()
            .user_agent(user_agent)
            .timeout(self.timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true);

        if let Some(identity) = &plan.proxy {
            builder = builder.proxy(reqwest::Proxy::all(&identity.url)?);
        }

        Ok(builder.build()?)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &Url, plan: &AttemptPlan) -> Result<TransportResponse> {
        let client = self.build_client(plan)?;

        let response = client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| classify_send_error(url, e))?;

        // Non-2xx responses are returned, not raised: the selector needs
        // the status and body to tell a block from a plain failure
        let http_status = Some(response.status().as_u16());
        let body = response.text().await.map_err(|e| SeineError::Http {
            url: url.to_string(),
            source: e,
        })?;

        Ok(TransportResponse { http_status, body })
    }
}

fn classify_send_error(url: &Url, error: reqwest::Error) -> SeineError {
    if error.is_timeout() {
        SeineError::Timeout {
            url: url.to_string(),
        }
    } else {
        SeineError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
