//! One-off scrape job execution
//!
//! A job fetches a single URL for a named project, outside any
//! campaign. It runs on the same worker pool and the same policy
//! pipeline; the job id is its rotation session key. Jobs may carry an
//! extraction schema, a JSON list of CSS rules evaluated against the
//! fetched page, whose structured result lands on the job row.

use crate::crawler::limiter::DomainLimiter;
use crate::crawler::worker::fetch_with_policy;
use crate::fetch::{extract_with_schema, ExtractionRule, FetchSelector, FetchStatus};
use crate::policy::PolicyEngine;
use crate::queue::Disposition;
use crate::state::JobStatus;
use crate::storage::{BlobStore, SqliteStorage, Storage, StorageError};
use crate::url::normalize_url;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use url::Url;

/// Executes queued jobs against the shared fetch pipeline
pub(crate) struct JobRunner {
    storage: Arc<Mutex<SqliteStorage>>,
    blobs: Arc<dyn BlobStore + Send + Sync>,
    engine: Arc<PolicyEngine>,
    selector: Arc<FetchSelector>,
    limiter: Arc<DomainLimiter>,
}

impl JobRunner {
    pub fn new(
        storage: Arc<Mutex<SqliteStorage>>,
        blobs: Arc<dyn BlobStore + Send + Sync>,
        engine: Arc<PolicyEngine>,
        selector: Arc<FetchSelector>,
        limiter: Arc<DomainLimiter>,
    ) -> Self {
        Self {
            storage,
            blobs,
            engine,
            selector,
            limiter,
        }
    }

    /// Runs one job to a terminal status
    ///
    /// Validation problems (bad URL, bad schema) finish the job as
    /// `Failed` rather than redelivering: running again cannot fix the
    /// payload. A redelivered job that already finished acks as a
    /// no-op.
    pub async fn run(&self, job_id: i64) -> Disposition {
        let job = {
            let store = self.storage.lock().unwrap();
            match store.get_job(job_id) {
                Ok(j) => j,
                Err(StorageError::JobNotFound(_)) => {
                    warn!(job_id, "task for unknown job");
                    return Disposition::Drop;
                }
                Err(e) => {
                    error!(job_id, error = %e, "job lookup failed");
                    return Disposition::Retry;
                }
            }
        };

        if job.status.is_terminal() {
            debug!(job_id, status = %job.status, "job already settled");
            return Disposition::Ack;
        }

        let url = match normalize_url(&job.url) {
            Ok(u) => u,
            Err(e) => {
                return self.finish_failed(job_id, &format!("invalid job url: {}", e));
            }
        };

        // Parse the schema up front so a bad one fails without a fetch
        let rules: Option<Vec<ExtractionRule>> = match job.extraction_schema.as_deref() {
            Some(raw) => match serde_json::from_str(raw) {
                Ok(rules) => Some(rules),
                Err(e) => {
                    return self
                        .finish_failed(job_id, &format!("invalid extraction schema: {}", e));
                }
            },
            None => None,
        };

        {
            let mut store = self.storage.lock().unwrap();
            if let Err(e) = store.mark_job_running(job_id) {
                error!(job_id, error = %e, "marking job running failed");
                return Disposition::Retry;
            }
        }
        info!(job_id, project = %job.project, url = %url, "job started");

        let session_key = format!("job-{}", job_id);
        let outcome = fetch_with_policy(
            &self.engine,
            &self.selector,
            &self.limiter,
            &session_key,
            &url,
        )
        .await;

        let extracted = match (&rules, outcome.status) {
            (Some(rules), FetchStatus::Success) => {
                Some(extract_with_schema(&outcome.body, rules).to_string())
            }
            _ => None,
        };

        let blob = if outcome.body.is_empty() {
            None
        } else {
            match self
                .blobs
                .put(&blob_key(job_id, &url), outcome.body.as_bytes())
            {
                Ok(b) => Some(b),
                Err(e) => {
                    error!(job_id, error = %e, "blob write failed");
                    return Disposition::Retry;
                }
            }
        };

        let status = match outcome.status {
            FetchStatus::Success => JobStatus::Succeeded,
            FetchStatus::Blocked => JobStatus::Blocked,
            FetchStatus::Error => JobStatus::Failed,
        };

        let finished = {
            let mut store = self.storage.lock().unwrap();
            store.finish_job(
                job_id,
                status,
                outcome.http_status,
                outcome.title.as_deref(),
                blob.as_ref().map(|b| b.path.as_str()),
                extracted.as_deref(),
                outcome.error_message.as_deref(),
            )
        };
        match finished {
            Ok(()) => {
                info!(job_id, status = %status, "job finished");
                Disposition::Ack
            }
            Err(e) => {
                error!(job_id, error = %e, "recording job result failed");
                Disposition::Retry
            }
        }
    }

    fn finish_failed(&self, job_id: i64, message: &str) -> Disposition {
        warn!(job_id, message, "job failed before fetch");
        let mut store = self.storage.lock().unwrap();
        match store.finish_job(job_id, JobStatus::Failed, None, None, None, None, Some(message)) {
            Ok(()) => Disposition::Ack,
            Err(e) => {
                error!(job_id, error = %e, "recording job failure failed");
                Disposition::Retry
            }
        }
    }
}

fn blob_key(job_id: i64, url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("job/{}/{}", job_id, &digest[..16])
}
