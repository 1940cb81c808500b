//! Configuration module for Seine
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, both for the engine itself and for operator-submitted campaign
//! definitions.
//!
//! # Example
//!
//! ```no_run
//! use seine::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Engine will run {} workers", config.worker.count);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BrowserConfig, CampaignFile, Config, HttpConfig, ProxyConfig, StorageConfig, WorkerConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_campaign_file, load_config, load_config_with_hash};

// Re-export validation helpers
pub use validation::validate_campaign_file;
