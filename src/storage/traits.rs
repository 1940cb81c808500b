//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::policy::{DomainPolicy, FetchMethod};
use crate::state::{CampaignStatus, JobStatus, PageStatus};
use crate::storage::{CampaignRecord, JobRecord, PageRecord};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Campaign not found: {0}")]
    CampaignNotFound(i64),

    #[error("Job not found: {0}")]
    JobNotFound(i64),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Input for creating a campaign
#[derive(Debug, Clone)]
pub struct NewCampaign {
    pub name: String,
    pub query: String,
    pub seed_urls: Vec<String>,
    pub allowed_domains: Option<Vec<String>>,
    pub max_pages: u32,
    pub follow_links: bool,
}

/// Input for recording a fetched page
#[derive(Debug, Clone)]
pub struct NewPage {
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
}

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the engine.
/// Counter updates are guarded SQL statements so that concurrent workers
/// sharing one store cannot race a campaign past its page budget.
pub trait Storage {
    // ===== Campaign Management =====

    /// Creates a new campaign in `Pending` status
    ///
    /// # Arguments
    ///
    /// * `campaign` - The campaign definition
    ///
    /// # Returns
    ///
    /// The ID of the newly created campaign
    fn create_campaign(&mut self, campaign: &NewCampaign) -> StorageResult<i64>;

    /// Gets a campaign by ID
    fn get_campaign(&self, campaign_id: i64) -> StorageResult<CampaignRecord>;

    /// Gets all campaigns in a specific status
    fn list_campaigns_by_status(
        &self,
        status: CampaignStatus,
    ) -> StorageResult<Vec<CampaignRecord>>;

    /// Updates the status of a campaign
    ///
    /// Sets `started_at` the first time a campaign goes `Active` and
    /// `finished_at` when it reaches a terminal status.
    fn update_campaign_status(
        &mut self,
        campaign_id: i64,
        status: CampaignStatus,
    ) -> StorageResult<()>;

    /// Attempts to claim one unit of the campaign's page budget
    ///
    /// The increment only happens while `pages_collected < max_pages`,
    /// enforced in a single guarded UPDATE.
    ///
    /// # Returns
    ///
    /// `true` if the increment was applied, `false` if the budget was
    /// already exhausted
    fn try_increment_pages(&mut self, campaign_id: i64) -> StorageResult<bool>;

    /// Adjusts the in-flight task counter by `delta`, floored at zero
    ///
    /// # Returns
    ///
    /// The counter value after the adjustment
    fn adjust_inflight(&mut self, campaign_id: i64, delta: i64) -> StorageResult<i64>;

    /// Records one more consecutive fetch failure
    ///
    /// # Returns
    ///
    /// The failure streak length after the increment
    fn record_fetch_failure(&mut self, campaign_id: i64) -> StorageResult<u32>;

    /// Resets the consecutive failure streak to zero
    fn reset_failure_streak(&mut self, campaign_id: i64) -> StorageResult<()>;

    // ===== Frontier Management =====

    /// Admits a URL to the campaign's frontier
    ///
    /// # Arguments
    ///
    /// * `campaign_id` - The owning campaign
    /// * `url` - The normalized URL
    /// * `domain` - The host extracted from the URL
    ///
    /// # Returns
    ///
    /// `true` if the URL was newly admitted, `false` if it was already
    /// in the frontier (duplicates are silently ignored)
    fn admit_frontier_url(
        &mut self,
        campaign_id: i64,
        url: &str,
        domain: &str,
    ) -> StorageResult<bool>;

    /// Takes up to `limit` pending URLs and marks them dispatched
    fn next_frontier_batch(&mut self, campaign_id: i64, limit: u32) -> StorageResult<Vec<String>>;

    /// Counts frontier URLs not yet handed to a worker
    fn pending_frontier_count(&self, campaign_id: i64) -> StorageResult<u64>;

    /// Flips dispatched-but-never-recorded URLs back to pending
    ///
    /// Used when resuming a campaign after a process restart. URLs that
    /// already have a result row are left alone.
    ///
    /// # Returns
    ///
    /// The number of URLs returned to the pending state
    fn requeue_dispatched(&mut self, campaign_id: i64) -> StorageResult<u64>;

    /// Resets the in-flight counter to zero (process restart recovery)
    fn reset_inflight(&mut self, campaign_id: i64) -> StorageResult<()>;

    // ===== Page Results =====

    /// Records a fetched page result
    ///
    /// # Returns
    ///
    /// The new row ID, or `None` if a result for this (campaign, url)
    /// already exists
    fn insert_page(&mut self, page: &NewPage) -> StorageResult<Option<i64>>;

    /// Gets the recorded result for a (campaign, url) pair, if any
    fn get_page_result(&self, campaign_id: i64, url: &str) -> StorageResult<Option<PageRecord>>;

    /// Counts pages recorded for a campaign with the given status
    fn count_pages_by_status(
        &self,
        campaign_id: i64,
        status: PageStatus,
    ) -> StorageResult<u64>;

    /// Gets page counts per status for a campaign
    fn page_status_breakdown(&self, campaign_id: i64)
        -> StorageResult<HashMap<PageStatus, u64>>;

    // ===== Domain Policies =====

    /// Inserts or replaces a per-domain policy
    fn upsert_domain_policy(&mut self, policy: &DomainPolicy) -> StorageResult<()>;

    /// Gets the policy stored for an exact domain, if any
    fn get_domain_policy(&self, domain: &str) -> StorageResult<Option<DomainPolicy>>;

    /// Lists all stored domain policies
    fn list_domain_policies(&self) -> StorageResult<Vec<DomainPolicy>>;

    // ===== Settings =====

    /// Gets a settings value by key
    fn get_setting(&self, key: &str) -> StorageResult<Option<String>>;

    /// Inserts or replaces a settings value
    fn put_setting(&mut self, key: &str, value: &str) -> StorageResult<()>;

    // ===== Jobs =====

    /// Creates a one-off fetch job in `Pending` status
    fn create_job(
        &mut self,
        project: &str,
        url: &str,
        extraction_schema: Option<&str>,
    ) -> StorageResult<i64>;

    /// Gets a job by ID
    fn get_job(&self, job_id: i64) -> StorageResult<JobRecord>;

    /// Marks a job as running
    fn mark_job_running(&mut self, job_id: i64) -> StorageResult<()>;

    /// Records a job's terminal outcome
    #[allow(clippy::too_many_arguments)]
    fn finish_job(
        &mut self,
        job_id: i64,
        status: JobStatus,
        http_status: Option<u16>,
        title: Option<&str>,
        blob_path: Option<&str>,
        extracted: Option<&str>,
        error_message: Option<&str>,
    ) -> StorageResult<()>;
}
