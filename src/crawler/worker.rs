//! Worker run loop
//!
//! Each worker repeats the same cycle until the queue ends:
//! 1. Receive a task delivery
//! 2. Plan the attempt from domain policy and proxy settings
//! 3. Acquire the domain slot, wait out the politeness delay, fetch
//! 4. Record the outcome through the campaign machine
//! 5. Dispatch follow-up frontier work, then settle the delivery
//!
//! Settling follows one rule: any fetch outcome is work done and acks,
//! even a blocked page. Only infrastructure trouble, like a failed
//! store write, sends the delivery back for another go.

use crate::campaign::CampaignMachine;
use crate::crawler::job::JobRunner;
use crate::crawler::limiter::DomainLimiter;
use crate::fetch::{FetchOutcome, FetchSelector, FetchStatus};
use crate::policy::{AttemptContext, PolicyEngine};
use crate::queue::{Dispatcher, Disposition, Task, TaskQueue};
use crate::storage::{SqliteStorage, Storage, StorageError};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};
use url::Url;

/// Shared handles every worker runs against
pub(crate) struct WorkerContext {
    pub storage: Arc<Mutex<SqliteStorage>>,
    pub queue: Arc<dyn TaskQueue>,
    pub engine: Arc<PolicyEngine>,
    pub selector: Arc<FetchSelector>,
    pub machine: Arc<CampaignMachine>,
    pub dispatcher: Arc<Dispatcher>,
    pub limiter: Arc<DomainLimiter>,
    pub jobs: Arc<JobRunner>,

    /// How many frontier URLs one finished task may dispatch
    pub dispatch_window: u32,
}

/// One queue consumer
pub struct Worker {
    id: u32,
    ctx: Arc<WorkerContext>,
}

impl Worker {
    pub(crate) fn new(id: u32, ctx: Arc<WorkerContext>) -> Self {
        Self { id, ctx }
    }

    /// Consumes deliveries until the queue is closed and drained
    pub async fn run(self) {
        debug!(worker = self.id, "worker started");

        while let Some(delivery) = self.ctx.queue.recv().await {
            let disposition = match &delivery.task {
                Task::CrawlUrl { campaign_id, url } => self.crawl_url(*campaign_id, url).await,
                Task::RunJob { job_id } => self.ctx.jobs.run(*job_id).await,
            };

            match disposition {
                Disposition::Ack => self.ctx.queue.ack(delivery).await,
                Disposition::Retry => {
                    self.ctx.queue.retry(delivery).await;
                }
                Disposition::Drop => {
                    warn!(worker = self.id, "dropping unprocessable task");
                    self.ctx.queue.ack(delivery).await;
                }
            }
        }

        debug!(worker = self.id, "worker stopped");
    }

    /// Runs one crawl task end to end
    async fn crawl_url(&self, campaign_id: i64, raw_url: &str) -> Disposition {
        let campaign = {
            let store = self.ctx.storage.lock().unwrap();
            match store.get_campaign(campaign_id) {
                Ok(c) => c,
                Err(StorageError::CampaignNotFound(_)) => {
                    warn!(campaign_id, url = raw_url, "task for unknown campaign");
                    return Disposition::Drop;
                }
                Err(e) => {
                    error!(campaign_id, error = %e, "campaign lookup failed");
                    return Disposition::Retry;
                }
            }
        };

        // A task that outlived its campaign is discarded without a
        // fetch; paused campaigns still finish what is in flight
        if campaign.status.is_terminal() {
            debug!(campaign_id, url = raw_url, "campaign settled, discarding task");
            return self.settle_without_fetch(campaign_id);
        }

        let url = match Url::parse(raw_url) {
            Ok(u) => u,
            Err(e) => {
                warn!(campaign_id, url = raw_url, error = %e, "malformed task url");
                return self.settle_without_fetch(campaign_id);
            }
        };

        let session_key = format!("campaign-{}", campaign_id);
        let outcome = fetch_with_policy(
            &self.ctx.engine,
            &self.ctx.selector,
            &self.ctx.limiter,
            &session_key,
            &url,
        )
        .await;

        match self.ctx.machine.record_outcome(campaign_id, &url, &outcome) {
            Ok(summary) => {
                if summary.campaign_completed {
                    info!(campaign_id, "campaign completed");
                }

                // Keep the pipeline fed; a failed follow-up dispatch is
                // recovered by the next completion or a resume
                if let Err(e) = self
                    .ctx
                    .dispatcher
                    .dispatch_batch(campaign_id, self.ctx.dispatch_window)
                    .await
                {
                    warn!(campaign_id, error = %e, "follow-up dispatch failed");
                }

                Disposition::Ack
            }
            Err(e) => {
                error!(campaign_id, url = %url, error = %e, "recording outcome failed");
                Disposition::Retry
            }
        }
    }

    /// Counts a discarded task out of the in-flight tally
    fn settle_without_fetch(&self, campaign_id: i64) -> Disposition {
        let mut store = self.ctx.storage.lock().unwrap();
        match store.adjust_inflight(campaign_id, -1) {
            Ok(_) => Disposition::Ack,
            Err(e) => {
                error!(campaign_id, error = %e, "in-flight adjustment failed");
                Disposition::Retry
            }
        }
    }
}

/// Fetches one URL under policy, retrying on retryable outcomes
///
/// Every attempt gets a fresh plan, so proxy rotation and method
/// escalation apply between retries. The domain slot is held across
/// the politeness delay and the fetch, which spaces requests out even
/// at concurrency one. Retries stop when the outcome is not retryable
/// or the plan's retry budget is spent.
pub(crate) async fn fetch_with_policy(
    engine: &PolicyEngine,
    selector: &FetchSelector,
    limiter: &DomainLimiter,
    session_key: &str,
    url: &Url,
) -> FetchOutcome {
    let domain = url.host_str().unwrap_or_default().to_string();
    let mut ctx = AttemptContext::new(session_key);
    let mut attempt = 1;

    loop {
        let plan = engine.plan_attempt(&domain, attempt, &ctx);

        let _permit = limiter.acquire(&domain, plan.max_concurrency).await;
        if !plan.delay.is_zero() {
            tokio::time::sleep(plan.delay).await;
        }
        let outcome = selector.execute(url, &plan).await;

        if !outcome.is_retryable() || attempt > plan.max_retries {
            return outcome;
        }

        debug!(
            url = %url,
            attempt,
            status = ?outcome.status,
            "retrying fetch with a fresh plan"
        );
        ctx.previous_blocked = outcome.status == FetchStatus::Blocked;
        attempt += 1;
    }
}
