//! Turns frontier URLs into queued crawl tasks

use crate::campaign::Frontier;
use crate::queue::{Task, TaskQueue};
use crate::storage::{SqliteStorage, Storage};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Feeds the task queue from the frontier
///
/// The in-flight counter moves with the queue: it goes up when a task
/// is enqueued here and comes down once per recorded outcome. Together
/// with the pending frontier count that is what tells a campaign it is
/// done.
pub struct Dispatcher {
    storage: Arc<Mutex<SqliteStorage>>,
    frontier: Frontier,
    queue: Arc<dyn TaskQueue>,
}

impl Dispatcher {
    pub fn new(storage: Arc<Mutex<SqliteStorage>>, queue: Arc<dyn TaskQueue>) -> Self {
        Self {
            frontier: Frontier::new(Arc::clone(&storage)),
            storage,
            queue,
        }
    }

    /// Pulls up to `limit` frontier URLs and queues a crawl task each
    ///
    /// A campaign that stopped accepting work gets nothing dispatched,
    /// and the frontier itself caps the batch at the remaining page
    /// budget.
    ///
    /// # Returns
    ///
    /// How many tasks were enqueued
    pub async fn dispatch_batch(&self, campaign_id: i64, limit: u32) -> crate::Result<u32> {
        let campaign = {
            let store = self.storage.lock().unwrap();
            store.get_campaign(campaign_id)?
        };

        if !campaign.status.accepts_work() {
            debug!(campaign_id, status = %campaign.status, "not dispatching");
            return Ok(0);
        }

        let batch = self.frontier.next_batch(&campaign, limit)?;
        let mut enqueued = 0;
        for url in &batch {
            self.enqueue_crawl(campaign_id, url).await?;
            enqueued += 1;
        }

        if enqueued > 0 {
            debug!(campaign_id, enqueued, "dispatched crawl tasks");
        }
        Ok(enqueued)
    }

    /// Queues one crawl task, counting it in flight
    pub async fn enqueue_crawl(&self, campaign_id: i64, url: &str) -> crate::Result<()> {
        {
            let mut store = self.storage.lock().unwrap();
            store.adjust_inflight(campaign_id, 1)?;
        }

        let task = Task::CrawlUrl {
            campaign_id,
            url: url.to_string(),
        };
        if let Err(e) = self.queue.enqueue(task).await {
            // The task never made it out, so it is not in flight
            let mut store = self.storage.lock().unwrap();
            store.adjust_inflight(campaign_id, -1)?;
            return Err(e);
        }
        Ok(())
    }

    /// Queues a one-off scrape job
    pub async fn enqueue_job(&self, job_id: i64) -> crate::Result<()> {
        self.queue.enqueue(Task::RunJob { job_id }).await
    }
}
