//! Per-domain concurrency limiting

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Lazily-created semaphore per domain
///
/// Each domain gets its own semaphore sized by that domain's policy on
/// first use, so a strict single-slot domain cannot be starved by a
/// permissive one. The permit is owned and releases on drop, which
/// keeps it held across the politeness delay and the fetch itself.
pub struct DomainLimiter {
    semaphores: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl DomainLimiter {
    pub fn new() -> Self {
        Self {
            semaphores: Mutex::new(HashMap::new()),
        }
    }

    /// Acquires a fetch slot for `domain`
    ///
    /// The semaphore keeps the size it was created with; a changed
    /// policy value applies to domains first seen after the change.
    ///
    /// # Returns
    ///
    /// `None` only if the semaphore was closed, which this limiter
    /// never does
    pub async fn acquire(&self, domain: &str, max_concurrency: u32) -> Option<OwnedSemaphorePermit> {
        let semaphore = {
            let mut map = self.semaphores.lock().unwrap();
            Arc::clone(
                map.entry(domain.to_string())
                    .or_insert_with(|| Arc::new(Semaphore::new(max_concurrency.max(1) as usize))),
            )
        };

        semaphore.acquire_owned().await.ok()
    }

    #[cfg(test)]
    fn available(&self, domain: &str) -> Option<usize> {
        let map = self.semaphores.lock().unwrap();
        map.get(domain).map(|s| s.available_permits())
    }
}

impl Default for DomainLimiter {
    fn default() -> Self {
        Self::new()
    }
}
