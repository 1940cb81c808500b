//! Storage module for persisting crawl state
//!
//! This module handles all database operations for the engine, including:
//! - SQLite database initialization and schema management
//! - Campaign lifecycle and page-budget accounting
//! - Frontier dedup (the seen-set) and dispatch bookkeeping
//! - Fetched page and one-off job persistence
//! - Domain policy and global settings storage
//! - Compressed blob storage for raw page bodies

mod blob;
mod schema;
mod sqlite;
mod traits;

pub use blob::{BlobStore, LocalBlobStore, StoredBlob};
pub use sqlite::SqliteStorage;
pub use traits::{NewCampaign, NewPage, Storage, StorageError, StorageResult};

use crate::policy::FetchMethod;
use crate::state::{CampaignStatus, JobStatus, PageStatus};
use crate::SeineError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(SeineError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SeineError> {
    SqliteStorage::new(path)
}

/// Represents a campaign in the database
#[derive(Debug, Clone)]
pub struct CampaignRecord {
    pub id: i64,
    pub name: String,
    pub query: String,
    pub seed_urls: Vec<String>,
    pub allowed_domains: Option<Vec<String>>,
    pub max_pages: u32,
    pub pages_collected: u32,
    pub follow_links: bool,
    pub status: CampaignStatus,
    pub consecutive_failures: u32,
    pub tasks_inflight: i64,
    pub created_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
}

impl CampaignRecord {
    /// Pages still allowed under the campaign's budget
    pub fn remaining_budget(&self) -> u32 {
        self.max_pages.saturating_sub(self.pages_collected)
    }
}

/// Represents a fetched page result in the database
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub campaign_id: i64,
    pub url: String,
    pub domain: String,
    pub status: PageStatus,
    pub http_status: Option<u16>,
    pub title: Option<String>,
    pub text_content: Option<String>,
    pub method_used: Option<FetchMethod>,
    pub blob_path: Option<String>,
    pub checksum: Option<String>,
    pub size_bytes: Option<u64>,
    pub error_message: Option<String>,
    pub fetched_at: String,
}

/// Represents a one-off fetch job in the database
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: i64,
    pub project: String,
    pub url: String,
    pub status: JobStatus,
    pub http_status: Option<u16>,
    pub title: Option<String>,
    pub blob_path: Option<String>,
    pub extraction_schema: Option<String>,
    pub extracted: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub finished_at: Option<String>,
}

/// Dispatch state of a frontier URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrontierState {
    /// Admitted but not yet handed to a worker
    Pending,
    /// Handed to a worker at least once
    Dispatched,
}

impl FrontierState {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Dispatched => "dispatched",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "dispatched" => Some(Self::Dispatched),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontier_state_roundtrip() {
        for state in &[FrontierState::Pending, FrontierState::Dispatched] {
            let db_str = state.to_db_string();
            let parsed = FrontierState::from_db_string(db_str);
            assert_eq!(Some(*state), parsed);
        }
    }

    #[test]
    fn test_frontier_state_invalid() {
        assert_eq!(FrontierState::from_db_string("invalid"), None);
    }

    #[test]
    fn test_remaining_budget_saturates() {
        let record = CampaignRecord {
            id: 1,
            name: "t".to_string(),
            query: String::new(),
            seed_urls: vec![],
            allowed_domains: None,
            max_pages: 10,
            pages_collected: 12,
            follow_links: true,
            status: CampaignStatus::Active,
            consecutive_failures: 0,
            tasks_inflight: 0,
            created_at: String::new(),
            started_at: None,
            finished_at: None,
        };
        assert_eq!(record.remaining_budget(), 0);
    }
}
