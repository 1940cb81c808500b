//! Fetch execution
//!
//! A fetch attempt resolves to exactly one [`FetchOutcome`], whatever
//! happens on the wire. The selector picks a transport per the attempt
//! plan, runs block detection over the response, and extracts content
//! from successful pages. Nothing in this module persists state; that
//! belongs to the campaign layer.

mod block;
mod browser;
mod http;
mod page;
mod selector;

pub use block::{BlockDetector, BLOCK_STATUSES};
pub use browser::BrowserTransport;
pub use http::HttpTransport;
pub use page::{
    extract_page, extract_with_schema, needs_js_render, ExtractedPage, ExtractionRule,
};
pub use selector::FetchSelector;

use crate::policy::{AttemptPlan, FetchMethod};
use crate::state::PageStatus;
use async_trait::async_trait;
use url::Url;

/// Classification of a single fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    /// The transport returned usable page content
    Success,

    /// The server answered with a challenge or denial instead of content
    Blocked,

    /// The transport failed or the server returned a non-block error
    Error,
}

/// Everything a single fetch attempt produced
///
/// Blocked is a first-class result here, not an error: the attempt ran
/// to completion and the server's answer was "no". Whether that answer
/// is worth another attempt is [`FetchOutcome::is_retryable`].
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub status: FetchStatus,

    /// HTTP status when the transport surfaces one; the browser
    /// transport reads rendered documents and reports none
    pub http_status: Option<u16>,

    /// Raw page body as returned by the transport
    pub body: String,

    pub title: Option<String>,

    /// Visible page text, empty unless the attempt succeeded
    pub text_content: String,

    /// Absolute normalized links, empty unless the attempt succeeded
    pub links: Vec<String>,

    /// Transport that produced this outcome
    pub method_used: FetchMethod,

    pub elapsed_ms: u64,

    /// Block reason or failure description
    pub error_message: Option<String>,
}

impl FetchOutcome {
    /// Builds a successful outcome from extracted page content
    pub fn success(
        method: FetchMethod,
        http_status: Option<u16>,
        body: String,
        extracted: ExtractedPage,
    ) -> Self {
        Self {
            status: FetchStatus::Success,
            http_status,
            body,
            title: extracted.title,
            text_content: extracted.text,
            links: extracted.links,
            method_used: method,
            elapsed_ms: 0,
            error_message: None,
        }
    }

    /// Builds a blocked outcome; the body is kept for diagnosis
    pub fn blocked(
        method: FetchMethod,
        http_status: Option<u16>,
        body: String,
        reason: String,
    ) -> Self {
        Self {
            status: FetchStatus::Blocked,
            http_status,
            body,
            title: None,
            text_content: String::new(),
            links: Vec::new(),
            method_used: method,
            elapsed_ms: 0,
            error_message: Some(reason),
        }
    }

    /// Builds a failed outcome
    pub fn error(
        method: FetchMethod,
        http_status: Option<u16>,
        body: String,
        message: String,
    ) -> Self {
        Self {
            status: FetchStatus::Error,
            http_status,
            body,
            title: None,
            text_content: String::new(),
            links: Vec::new(),
            method_used: method,
            elapsed_ms: 0,
            error_message: Some(message),
        }
    }

    /// Maps the attempt result onto the persisted page status
    pub fn page_status(&self) -> PageStatus {
        match self.status {
            FetchStatus::Success => PageStatus::Success,
            FetchStatus::Blocked => PageStatus::Blocked,
            FetchStatus::Error => PageStatus::Failed,
        }
    }

    /// Returns true if another attempt could plausibly do better
    ///
    /// Blocks rotate to a fresh proxy identity on retry and transport
    /// errors are often transient. A definite HTTP error like 404 or
    /// 500 is neither, and success needs no retry.
    pub fn is_retryable(&self) -> bool {
        match self.status {
            FetchStatus::Success => false,
            FetchStatus::Blocked => true,
            FetchStatus::Error => self.http_status.is_none(),
        }
    }
}

/// Raw response from a transport before classification
#[derive(Debug)]
pub struct TransportResponse {
    /// HTTP status when the transport surfaces one
    pub http_status: Option<u16>,

    /// Response body decoded as text
    pub body: String,
}

/// A way to turn a URL into a response body
///
/// Implementations do no block detection and no retries; both belong
/// to the layers above them.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &Url, plan: &AttemptPlan) -> crate::Result<TransportResponse>;
}
