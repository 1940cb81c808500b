//! Task queue for crawl work
//!
//! Workers share one queue of serialized task payloads. Delivery is
//! at-least-once: a task that a worker cannot finish goes back on the
//! queue with its attempt count bumped, up to the queue's redelivery
//! budget. Downstream recording is idempotent, so a redelivered task
//! that already ran settles as a logged no-op.
//!
//! # Components
//!
//! - `Task`: the payload kinds workers understand
//! - `Delivery`: a task plus its delivery attempt counter
//! - `Disposition`: what a worker decided to do with a delivery
//! - `TaskQueue`: the broker seam; `InMemoryQueue` is the only backend
//! - `Dispatcher`: turns frontier URLs into queued tasks

mod dispatch;
mod memory;

pub use dispatch::Dispatcher;
pub use memory::InMemoryQueue;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A unit of work for a crawl worker
///
/// Serialized as JSON tagged by `kind`, so payloads stay readable in
/// logs and portable to an external broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Task {
    /// Fetch one frontier URL for a campaign
    CrawlUrl { campaign_id: i64, url: String },

    /// Run a one-off project-scoped scrape job
    RunJob { job_id: i64 },
}

/// A task handed to a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub task: Task,

    /// 1-based delivery count; 2 means first redelivery
    pub attempt: u32,
}

/// A worker's verdict on a delivery
///
/// Any fetch outcome, blocked included, is work done and gets `Ack`.
/// `Retry` is for infrastructure trouble where running the task again
/// can succeed. `Drop` is for tasks that can never succeed, like a
/// payload naming a campaign that does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Ack,
    Retry,
    Drop,
}

/// Broker seam between the dispatcher and the workers
#[async_trait]
pub trait TaskQueue: Send + Sync {
    /// Queues a task for its first delivery
    ///
    /// # Returns
    ///
    /// `Err(SeineError::QueueClosed)` once the queue is closed
    async fn enqueue(&self, task: Task) -> crate::Result<()>;

    /// Waits for the next delivery
    ///
    /// # Returns
    ///
    /// `None` once the queue is closed and fully drained
    async fn recv(&self) -> Option<Delivery>;

    /// Settles a delivery as done
    async fn ack(&self, delivery: Delivery);

    /// Requeues a delivery for another attempt
    ///
    /// # Returns
    ///
    /// `false` when the redelivery budget is spent (or the queue is
    /// closed) and the task was dropped instead
    async fn retry(&self, delivery: Delivery) -> bool;

    /// Stops intake; queued deliveries still drain to workers
    fn close(&self);

    /// Deliveries enqueued or running but not yet settled
    fn outstanding(&self) -> i64;
}
