//! Seine: a policy-driven topic crawl engine
//!
//! This crate runs bounded crawl campaigns over a shared worker pool. Each
//! fetch is planned by per-domain policy and global proxy settings, executed
//! over an HTTP or headless-browser transport, and recorded against the
//! campaign's page budget.

pub mod campaign;
pub mod config;
pub mod crawler;
pub mod fetch;
pub mod output;
pub mod policy;
pub mod queue;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Seine operations
#[derive(Debug, Error)]
pub enum SeineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Browser error for {url}: {message}")]
    Browser { url: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Task payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Task queue closed")]
    QueueClosed,

    #[error("Invalid campaign transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CampaignStatus,
        to: state::CampaignStatus,
    },

    #[error("Campaign {0} not found")]
    CampaignNotFound(i64),

    #[error("Campaign has no valid seed URLs")]
    NoValidSeeds,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Seine operations
pub type Result<T> = std::result::Result<T, SeineError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use fetch::{FetchOutcome, FetchStatus};
pub use policy::{AttemptPlan, FetchMethod};
pub use state::{CampaignStatus, JobStatus, PageStatus};
pub use url::normalize_url;
