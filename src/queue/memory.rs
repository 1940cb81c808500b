//! In-process task broker on a tokio channel

use crate::queue::{Delivery, Task, TaskQueue};
use crate::SeineError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// At-least-once task queue backed by an unbounded channel
///
/// `outstanding` counts every delivery from enqueue until ack or drop,
/// so the runtime can tell a momentarily empty channel from a finished
/// crawl. Closing takes the sender; receivers drain what is buffered
/// and then see the channel end.
pub struct InMemoryQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<Delivery>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Delivery>>,
    outstanding: AtomicI64,
    max_redeliveries: u32,
}

impl InMemoryQueue {
    /// # Arguments
    ///
    /// * `max_redeliveries` - How many times one task may be requeued
    ///   after its first delivery before it is dropped
    pub fn new(max_redeliveries: u32) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
            outstanding: AtomicI64::new(0),
            max_redeliveries,
        }
    }

    fn send(&self, delivery: Delivery) -> crate::Result<()> {
        let guard = self.tx.lock().unwrap();
        let tx = guard.as_ref().ok_or(SeineError::QueueClosed)?;
        tx.send(delivery).map_err(|_| SeineError::QueueClosed)
    }
}

#[async_trait]
impl TaskQueue for InMemoryQueue {
    async fn enqueue(&self, task: Task) -> crate::Result<()> {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.send(Delivery { task, attempt: 1 }) {
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
            return Err(e);
        }
        Ok(())
    }

    async fn recv(&self) -> Option<Delivery> {
        self.rx.lock().await.recv().await
    }

    async fn ack(&self, delivery: Delivery) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        debug!(task = ?delivery.task, attempt = delivery.attempt, "task acked");
    }

    async fn retry(&self, delivery: Delivery) -> bool {
        if delivery.attempt > self.max_redeliveries {
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
            warn!(
                task = ?delivery.task,
                attempt = delivery.attempt,
                "redelivery budget spent, dropping task"
            );
            return false;
        }

        let requeued = Delivery {
            task: delivery.task,
            attempt: delivery.attempt + 1,
        };
        match self.send(requeued) {
            Ok(()) => true,
            Err(_) => {
                self.outstanding.fetch_sub(1, Ordering::SeqCst);
                warn!("queue closed, dropping task instead of requeueing");
                false
            }
        }
    }

    fn close(&self) {
        // Dropping the sender ends the channel once buffered
        // deliveries are consumed
        self.tx.lock().unwrap().take();
    }

    fn outstanding(&self) -> i64 {
        self.outstanding.load(Ordering::SeqCst)
    }
}
