//! Campaign URL frontier
//!
//! The frontier is the set of URLs a campaign has ever seen, with a
//! pending/dispatched flag per URL. Admission normalizes and
//! scope-checks candidates; the database's unique constraint is the
//! dedup authority, so concurrent workers can admit freely.

use crate::storage::{CampaignRecord, SqliteStorage, Storage};
use crate::url::{normalize_url, CampaignScope};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use url::Url;

/// Admission and dispatch of campaign URLs
pub struct Frontier {
    storage: Arc<Mutex<SqliteStorage>>,
}

impl Frontier {
    pub fn new(storage: Arc<Mutex<SqliteStorage>>) -> Self {
        Self { storage }
    }

    /// Admits a campaign's seed URLs
    ///
    /// Seeds are operator input: unparseable entries are skipped with a
    /// warning, and no scope check applies because the seeds are what
    /// scope is derived from in the first place.
    ///
    /// # Returns
    ///
    /// The number of seeds newly admitted
    pub fn seed(&self, campaign_id: i64, seed_urls: &[String]) -> crate::Result<u32> {
        let mut admitted = 0;
        let mut store = self.storage.lock().unwrap();

        for raw in seed_urls {
            let url = match normalize_url(raw) {
                Ok(url) => url,
                Err(e) => {
                    warn!(campaign_id, seed = %raw, error = %e, "skipping invalid seed URL");
                    continue;
                }
            };
            if store.admit_frontier_url(campaign_id, url.as_str(), &host_of(&url))? {
                admitted += 1;
            }
        }

        Ok(admitted)
    }

    /// Admits links discovered on a crawled page
    ///
    /// Candidates are normalized, checked against the campaign's scope,
    /// and deduplicated against everything the campaign has ever seen.
    ///
    /// # Returns
    ///
    /// The number of links newly admitted
    pub fn discovered(&self, campaign: &CampaignRecord, links: &[String]) -> crate::Result<u32> {
        let scope = scope_of(campaign);
        let mut admitted = 0;
        let mut store = self.storage.lock().unwrap();

        for raw in links {
            let Ok(url) = normalize_url(raw) else {
                continue;
            };
            if !scope.admits(&url) {
                debug!(campaign_id = campaign.id, url = %url, "link out of scope");
                continue;
            }
            if store.admit_frontier_url(campaign.id, url.as_str(), &host_of(&url))? {
                admitted += 1;
            }
        }

        Ok(admitted)
    }

    /// Takes the next batch of pending URLs, marking them dispatched
    ///
    /// The batch never exceeds the campaign's remaining page budget, so
    /// a near-complete campaign cannot flood the queue with work that
    /// would be dropped on arrival.
    pub fn next_batch(&self, campaign: &CampaignRecord, limit: u32) -> crate::Result<Vec<String>> {
        let cap = limit.min(campaign.remaining_budget());
        if cap == 0 {
            return Ok(Vec::new());
        }

        let mut store = self.storage.lock().unwrap();
        Ok(store.next_frontier_batch(campaign.id, cap)?)
    }

    /// Counts URLs admitted but not yet handed to a worker
    pub fn pending_count(&self, campaign_id: i64) -> crate::Result<u64> {
        let store = self.storage.lock().unwrap();
        Ok(store.pending_frontier_count(campaign_id)?)
    }
}

/// Builds the crawl scope for a campaign record
fn scope_of(campaign: &CampaignRecord) -> CampaignScope {
    let seeds: Vec<Url> = campaign
        .seed_urls
        .iter()
        .filter_map(|s| normalize_url(s).ok())
        .collect();
    CampaignScope::new(campaign.allowed_domains.as_deref(), &seeds)
}

fn host_of(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_string()
}
