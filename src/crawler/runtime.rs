//! Runtime wiring and lifecycle
//!
//! `CrawlRuntime` owns the shared pieces of a crawl process: the
//! store, the blob store, the task queue, the policy engine, and the
//! fetch selector. It submits campaigns and jobs, recovers work left
//! over from an interrupted process, and runs the worker pool until no
//! task remains outstanding.

use crate::campaign::{CampaignMachine, Frontier};
use crate::config::{CampaignFile, Config};
use crate::crawler::job::JobRunner;
use crate::crawler::limiter::DomainLimiter;
use crate::crawler::worker::{Worker, WorkerContext};
use crate::fetch::{ExtractionRule, FetchSelector};
use crate::policy::PolicyEngine;
use crate::queue::{Dispatcher, InMemoryQueue, TaskQueue};
use crate::state::CampaignStatus;
use crate::storage::{open_storage, BlobStore, LocalBlobStore, NewCampaign, SqliteStorage, Storage};
use crate::url::normalize_url;
use crate::SeineError;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How often the idle monitor polls the queue
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A crawl process: shared services plus a worker pool
pub struct CrawlRuntime {
    config: Arc<Config>,
    storage: Arc<Mutex<SqliteStorage>>,
    queue: Arc<InMemoryQueue>,
    machine: Arc<CampaignMachine>,
    dispatcher: Arc<Dispatcher>,
    frontier: Frontier,
    ctx: Arc<WorkerContext>,
}

impl CrawlRuntime {
    /// Builds the full service graph from configuration
    ///
    /// Opens (or creates) the database and blob directory, so this is
    /// the one place storage paths are touched.
    pub fn new(config: Config) -> crate::Result<Self> {
        let db_path = Path::new(&config.storage.database_path);
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let storage = Arc::new(Mutex::new(open_storage(db_path)?));
        let blobs: Arc<dyn BlobStore + Send + Sync> =
            Arc::new(LocalBlobStore::new(Path::new(&config.storage.blob_path))?);

        let queue = Arc::new(InMemoryQueue::new(config.worker.queue_redeliveries));
        let task_queue: Arc<dyn TaskQueue> = queue.clone();

        let engine = Arc::new(PolicyEngine::new(Arc::clone(&storage), &config.proxy));
        let selector = Arc::new(FetchSelector::new(&config));
        let machine = Arc::new(CampaignMachine::new(
            Arc::clone(&storage),
            Arc::clone(&blobs),
            config.worker.max_consecutive_failures,
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&storage),
            Arc::clone(&task_queue),
        ));
        let limiter = Arc::new(DomainLimiter::new());
        let jobs = Arc::new(JobRunner::new(
            Arc::clone(&storage),
            Arc::clone(&blobs),
            Arc::clone(&engine),
            Arc::clone(&selector),
            Arc::clone(&limiter),
        ));

        let ctx = Arc::new(WorkerContext {
            storage: Arc::clone(&storage),
            queue: Arc::clone(&task_queue),
            engine,
            selector,
            machine: Arc::clone(&machine),
            dispatcher: Arc::clone(&dispatcher),
            limiter,
            jobs,
            dispatch_window: (config.worker.count * 2).max(1),
        });

        Ok(Self {
            frontier: Frontier::new(Arc::clone(&storage)),
            config: Arc::new(config),
            storage,
            queue,
            machine,
            dispatcher,
            ctx,
        })
    }

    /// Creates a campaign, seeds its frontier, and dispatches the
    /// first batch
    ///
    /// # Returns
    ///
    /// The campaign id, or `SeineError::NoValidSeeds` when every seed
    /// URL was rejected (the campaign row is kept, marked `Failed`)
    pub async fn submit_campaign(&self, file: &CampaignFile) -> crate::Result<i64> {
        let campaign_id = {
            let mut store = self.storage.lock().unwrap();
            store.create_campaign(&NewCampaign {
                name: file.name.clone(),
                query: file.query.clone(),
                seed_urls: file.seeds.clone(),
                allowed_domains: file.allowed_domains.clone(),
                max_pages: file.max_pages,
                follow_links: file.follow_links,
            })?
        };

        let admitted = self.frontier.seed(campaign_id, &file.seeds)?;
        if admitted == 0 {
            self.machine
                .transition(campaign_id, CampaignStatus::Failed)?;
            warn!(campaign_id, name = %file.name, "campaign rejected: no valid seed urls");
            return Err(SeineError::NoValidSeeds);
        }

        self.machine
            .transition(campaign_id, CampaignStatus::Active)?;
        info!(
            campaign_id,
            name = %file.name,
            seeds = admitted,
            max_pages = file.max_pages,
            "campaign submitted"
        );

        self.dispatcher
            .dispatch_batch(campaign_id, self.ctx.dispatch_window)
            .await?;
        Ok(campaign_id)
    }

    /// Creates and enqueues a one-off scrape job
    ///
    /// The URL and the extraction schema are validated here so a bad
    /// submission fails at the prompt instead of inside a worker.
    pub async fn submit_job(
        &self,
        project: &str,
        url: &str,
        extraction_schema: Option<&str>,
    ) -> crate::Result<i64> {
        let normalized = normalize_url(url)?;
        if let Some(raw) = extraction_schema {
            serde_json::from_str::<Vec<ExtractionRule>>(raw)?;
        }

        let job_id = {
            let mut store = self.storage.lock().unwrap();
            store.create_job(project, normalized.as_str(), extraction_schema)?
        };
        self.dispatcher.enqueue_job(job_id).await?;
        info!(job_id, project, url = %normalized, "job submitted");
        Ok(job_id)
    }

    /// Suspends an active campaign
    pub fn pause_campaign(&self, campaign_id: i64) -> crate::Result<()> {
        self.machine.pause(campaign_id)
    }

    /// Reactivates a paused campaign and redispatches its frontier
    ///
    /// URLs that were handed out but never recorded go back to pending
    /// first, so a campaign paused mid-flight loses nothing.
    pub async fn resume_campaign(&self, campaign_id: i64) -> crate::Result<()> {
        {
            let mut store = self.storage.lock().unwrap();
            store.reset_inflight(campaign_id)?;
            let requeued = store.requeue_dispatched(campaign_id)?;
            if requeued > 0 {
                debug!(campaign_id, requeued, "requeued dispatched urls");
            }
        }

        self.machine.resume(campaign_id)?;
        self.dispatcher
            .dispatch_batch(campaign_id, self.ctx.dispatch_window)
            .await?;
        Ok(())
    }

    /// Recovers campaigns left active by an interrupted process
    ///
    /// In-flight counts are stale after a crash: nothing is actually
    /// running yet. Counters reset, handed-out URLs go back to
    /// pending, and each campaign either completes on the spot or gets
    /// a fresh batch dispatched.
    pub async fn resume_interrupted(&self) -> crate::Result<Vec<i64>> {
        let active = {
            let store = self.storage.lock().unwrap();
            store.list_campaigns_by_status(CampaignStatus::Active)?
        };

        let mut resumed = Vec::new();
        for campaign in active {
            {
                let mut store = self.storage.lock().unwrap();
                store.reset_inflight(campaign.id)?;
                store.requeue_dispatched(campaign.id)?;
            }

            if self.machine.try_complete(campaign.id)? {
                continue;
            }

            self.dispatcher
                .dispatch_batch(campaign.id, self.ctx.dispatch_window)
                .await?;
            resumed.push(campaign.id);
        }

        if !resumed.is_empty() {
            info!(count = resumed.len(), "resumed interrupted campaigns");
        }
        Ok(resumed)
    }

    /// Runs the worker pool until no task is outstanding
    ///
    /// Outstanding means enqueued or being worked. When it reaches
    /// zero nothing can create more work, so the queue closes and the
    /// workers drain out.
    pub async fn run_until_idle(&self) -> crate::Result<()> {
        let mut handles = Vec::new();
        for worker_id in 0..self.config.worker.count {
            let worker = Worker::new(worker_id, Arc::clone(&self.ctx));
            handles.push(tokio::spawn(worker.run()));
        }
        info!(workers = self.config.worker.count, "worker pool started");

        loop {
            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            if self.queue.outstanding() == 0 {
                break;
            }
        }
        self.queue.close();

        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "worker task panicked");
            }
        }
        info!("worker pool drained");
        Ok(())
    }

    /// Shared store handle, for reporting
    pub fn storage(&self) -> Arc<Mutex<SqliteStorage>> {
        Arc::clone(&self.storage)
    }
}

/// Submits one campaign and runs it to quiescence
///
/// # Arguments
///
/// * `config` - The engine configuration
/// * `file` - The campaign definition
///
/// # Returns
///
/// The campaign id once the run goes idle
///
/// # Example
///
/// ```no_run
/// use seine::config::{load_campaign_file, load_config};
/// use seine::crawler::run_campaign;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("seine.toml"))?;
/// let campaign = load_campaign_file(Path::new("campaign.toml"))?;
/// let campaign_id = run_campaign(config, &campaign).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_campaign(config: Config, file: &CampaignFile) -> crate::Result<i64> {
    let runtime = CrawlRuntime::new(config)?;
    let campaign_id = runtime.submit_campaign(file).await?;
    runtime.run_until_idle().await?;
    Ok(campaign_id)
}
