//! Campaign lifecycle and outcome recording
//!
//! [`CampaignMachine`] is the single writer of campaign progress. Every
//! fetch outcome funnels through [`CampaignMachine::record_outcome`],
//! which persists the page, settles the budget and failure counters,
//! expands the frontier, and checks for completion. All counter updates
//! are guarded statements in the store, so concurrent workers recording
//! at once cannot push a campaign past its budget.

use crate::campaign::Frontier;
use crate::fetch::{FetchOutcome, FetchStatus};
use crate::state::CampaignStatus;
use crate::storage::{BlobStore, NewPage, SqliteStorage, Storage};
use crate::SeineError;
use sha2::{Digest, Sha256};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};
use url::Url;

/// What one recorded outcome changed
#[derive(Debug)]
pub struct RecordSummary {
    /// False when a result for this URL already existed
    pub inserted: bool,

    /// True when this outcome pushed the campaign to `Completed`
    pub campaign_completed: bool,

    /// True when this outcome pushed the campaign over the failure
    /// threshold
    pub campaign_failed: bool,

    /// Links admitted to the frontier from this page
    pub links_admitted: u32,
}

/// Drives campaign state from fetch outcomes
pub struct CampaignMachine {
    storage: Arc<Mutex<SqliteStorage>>,
    blobs: Arc<dyn BlobStore + Send + Sync>,
    frontier: Frontier,
    max_consecutive_failures: Option<u32>,
}

impl CampaignMachine {
    /// # Arguments
    ///
    /// * `storage` - Shared store
    /// * `blobs` - Raw page body store
    /// * `max_consecutive_failures` - Failure streak that fails a
    ///   campaign; `None` means campaigns never auto-fail from fetches
    pub fn new(
        storage: Arc<Mutex<SqliteStorage>>,
        blobs: Arc<dyn BlobStore + Send + Sync>,
        max_consecutive_failures: Option<u32>,
    ) -> Self {
        Self {
            frontier: Frontier::new(Arc::clone(&storage)),
            storage,
            blobs,
            max_consecutive_failures,
        }
    }

    /// Records the outcome of one crawl task
    ///
    /// Idempotent under redelivery: a duplicate (campaign, url) result
    /// is a logged no-op for the page row and the counters it would
    /// have moved, while the in-flight counter still comes down.
    pub fn record_outcome(
        &self,
        campaign_id: i64,
        url: &Url,
        outcome: &FetchOutcome,
    ) -> crate::Result<RecordSummary> {
        // Blob first: a crash after this leaves an orphan file, while
        // the reverse order would leave a row pointing at nothing
        let blob = if outcome.body.is_empty() {
            None
        } else {
            Some(
                self.blobs
                    .put(&blob_key(campaign_id, url), outcome.body.as_bytes())?,
            )
        };

        let (inserted, failure_streak) = {
            let mut store = self.storage.lock().unwrap();

            let page = NewPage {
                campaign_id,
                url: url.to_string(),
                domain: url.host_str().unwrap_or_default().to_string(),
                status: outcome.page_status(),
                http_status: outcome.http_status,
                title: outcome.title.clone(),
                text_content: if outcome.text_content.is_empty() {
                    None
                } else {
                    Some(outcome.text_content.clone())
                },
                method_used: Some(outcome.method_used),
                blob_path: blob.as_ref().map(|b| b.path.clone()),
                checksum: blob.as_ref().map(|b| b.checksum.clone()),
                size_bytes: blob.as_ref().map(|b| b.size_bytes),
                error_message: outcome.error_message.clone(),
            };
            let inserted = store.insert_page(&page)?.is_some();

            let mut failure_streak = None;
            if inserted {
                match outcome.status {
                    FetchStatus::Success => {
                        if !store.try_increment_pages(campaign_id)? {
                            debug!(campaign_id, url = %url, "success recorded beyond budget");
                        }
                        store.reset_failure_streak(campaign_id)?;
                    }
                    FetchStatus::Error => {
                        failure_streak = Some(store.record_fetch_failure(campaign_id)?);
                    }
                    // Blocked is surfaced in status counts but moves
                    // neither the budget nor the failure streak
                    FetchStatus::Blocked => {}
                }
            } else {
                debug!(campaign_id, url = %url, "duplicate page result ignored");
            }

            store.adjust_inflight(campaign_id, -1)?;
            (inserted, failure_streak)
        };

        let links_admitted = if inserted
            && outcome.status == FetchStatus::Success
            && !outcome.links.is_empty()
        {
            self.expand_links(campaign_id, &outcome.links)?
        } else {
            0
        };

        let campaign_failed = match (self.max_consecutive_failures, failure_streak) {
            (Some(threshold), Some(streak)) if streak >= threshold => {
                self.fail_over_threshold(campaign_id, streak)?
            }
            _ => false,
        };

        let campaign_completed = if campaign_failed {
            false
        } else {
            self.try_complete(campaign_id)?
        };

        Ok(RecordSummary {
            inserted,
            campaign_completed,
            campaign_failed,
            links_admitted,
        })
    }

    /// Queues in-scope links unless the campaign stopped accepting work
    fn expand_links(&self, campaign_id: i64, links: &[String]) -> crate::Result<u32> {
        let campaign = {
            let store = self.storage.lock().unwrap();
            store.get_campaign(campaign_id)?
        };

        if !campaign.status.accepts_work() || !campaign.follow_links {
            debug!(
                campaign_id,
                status = %campaign.status,
                "link expansion suppressed"
            );
            return Ok(0);
        }

        self.frontier.discovered(&campaign, links)
    }

    fn fail_over_threshold(&self, campaign_id: i64, streak: u32) -> crate::Result<bool> {
        let mut store = self.storage.lock().unwrap();
        let campaign = store.get_campaign(campaign_id)?;
        if !campaign.status.can_transition_to(CampaignStatus::Failed) {
            return Ok(false);
        }

        store.update_campaign_status(campaign_id, CampaignStatus::Failed)?;
        warn!(
            campaign_id,
            streak, "campaign failed after consecutive fetch failures"
        );
        Ok(true)
    }

    /// Completes the campaign if its budget is met or its work is done
    ///
    /// # Returns
    ///
    /// `true` if this call moved the campaign to `Completed`
    pub fn try_complete(&self, campaign_id: i64) -> crate::Result<bool> {
        let mut store = self.storage.lock().unwrap();
        let campaign = store.get_campaign(campaign_id)?;
        if campaign.status != CampaignStatus::Active {
            return Ok(false);
        }

        let budget_met = campaign.pages_collected >= campaign.max_pages;
        let drained =
            campaign.tasks_inflight <= 0 && store.pending_frontier_count(campaign_id)? == 0;

        if !budget_met && !drained {
            return Ok(false);
        }

        store.update_campaign_status(campaign_id, CampaignStatus::Completed)?;
        info!(
            campaign_id,
            pages = campaign.pages_collected,
            budget_met,
            "campaign completed"
        );
        Ok(true)
    }

    /// Suspends an active campaign
    ///
    /// In-flight tasks keep running and their outcomes are recorded;
    /// only new work stops.
    pub fn pause(&self, campaign_id: i64) -> crate::Result<()> {
        self.transition(campaign_id, CampaignStatus::Paused)
    }

    /// Reactivates a paused campaign
    ///
    /// A campaign that was paused after its work drained has nothing
    /// left to run and completes immediately.
    pub fn resume(&self, campaign_id: i64) -> crate::Result<()> {
        self.transition(campaign_id, CampaignStatus::Active)?;
        self.try_complete(campaign_id)?;
        Ok(())
    }

    /// Applies a validated status transition
    pub fn transition(&self, campaign_id: i64, to: CampaignStatus) -> crate::Result<()> {
        let mut store = self.storage.lock().unwrap();
        let campaign = store.get_campaign(campaign_id)?;
        if !campaign.status.can_transition_to(to) {
            return Err(SeineError::InvalidTransition {
                from: campaign.status,
                to,
            });
        }

        store.update_campaign_status(campaign_id, to)?;
        info!(campaign_id, from = %campaign.status, to = %to, "campaign transition");
        Ok(())
    }
}

/// Blob key for a page body: campaign directory plus a URL digest
fn blob_key(campaign_id: i64, url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("campaign/{}/{}", campaign_id, &digest[..16])
}
