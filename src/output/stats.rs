//! Campaign statistics from the crawl database
//!
//! Gives operators the per-campaign picture: budget progress, the
//! page-status breakdown (the place block trouble shows up), and how
//! much frontier is still waiting.

use crate::state::PageStatus;
use crate::storage::{CampaignRecord, Storage};
use std::collections::HashMap;

/// Snapshot of one campaign's progress
#[derive(Debug, Clone)]
pub struct CampaignStats {
    /// The campaign row as stored
    pub campaign: CampaignRecord,

    /// Recorded pages by terminal status
    pub pages_by_status: HashMap<PageStatus, u64>,

    /// Admitted URLs not yet handed to a worker
    pub pending_frontier: u64,

    /// Wall-clock seconds from first activation to finish, when both
    /// timestamps exist
    pub duration_seconds: Option<u64>,
}

impl CampaignStats {
    /// Total pages recorded, across all statuses
    pub fn total_recorded(&self) -> u64 {
        self.pages_by_status.values().sum()
    }

    fn count(&self, status: PageStatus) -> u64 {
        self.pages_by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Loads statistics for one campaign
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `campaign_id` - The campaign to report on
///
/// # Returns
///
/// * `Ok(CampaignStats)` - Successfully loaded statistics
/// * `Err(SeineError)` - Campaign missing or query failed
pub fn load_campaign_stats(
    storage: &dyn Storage,
    campaign_id: i64,
) -> crate::Result<CampaignStats> {
    let campaign = storage.get_campaign(campaign_id)?;
    let pages_by_status = storage.page_status_breakdown(campaign_id)?;
    let pending_frontier = storage.pending_frontier_count(campaign_id)?;

    let duration_seconds = match (&campaign.started_at, &campaign.finished_at) {
        (Some(started_str), Some(finished_str)) => {
            match (
                started_str.parse::<chrono::DateTime<chrono::Utc>>(),
                finished_str.parse::<chrono::DateTime<chrono::Utc>>(),
            ) {
                (Ok(started), Ok(finished)) => Some((finished - started).num_seconds().max(0) as u64),
                _ => None,
            }
        }
        _ => None,
    };

    Ok(CampaignStats {
        campaign,
        pages_by_status,
        pending_frontier,
        duration_seconds,
    })
}

/// Prints campaign statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_campaign_stats(stats: &CampaignStats) {
    let campaign = &stats.campaign;

    println!("=== Campaign {}: {} ===\n", campaign.id, campaign.name);

    println!("Status: {}", campaign.status);
    if !campaign.query.is_empty() {
        println!("Query: {}", campaign.query);
    }
    println!(
        "Pages collected: {} / {}",
        campaign.pages_collected, campaign.max_pages
    );
    println!("Tasks in flight: {}", campaign.tasks_inflight);
    println!("Pending frontier URLs: {}", stats.pending_frontier);
    if campaign.consecutive_failures > 0 {
        println!("Consecutive failures: {}", campaign.consecutive_failures);
    }
    if let Some(seconds) = stats.duration_seconds {
        println!("Duration: {}s", seconds);
    }
    println!();

    let total = stats.total_recorded();
    println!("Pages by Status:");
    let mut status_counts: Vec<_> = stats.pages_by_status.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (status, count) in status_counts {
        let percentage = if total > 0 {
            (*count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    let blocked = stats.count(PageStatus::Blocked);
    if blocked > 0 {
        let block_rate = (blocked as f64 / total as f64) * 100.0;
        println!(
            "Block rate: {:.1}% ({} / {} recorded pages)",
            block_rate, blocked, total
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::FetchMethod;
    use crate::state::CampaignStatus;
    use crate::storage::{NewCampaign, NewPage, SqliteStorage};

    fn storage_with_campaign() -> (SqliteStorage, i64) {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage
            .create_campaign(&NewCampaign {
                name: "stats test".to_string(),
                query: "lures".to_string(),
                seed_urls: vec!["https://example.com/".to_string()],
                allowed_domains: None,
                max_pages: 10,
                follow_links: true,
            })
            .unwrap();
        storage
            .update_campaign_status(id, CampaignStatus::Active)
            .unwrap();
        (storage, id)
    }

    fn record_page(storage: &mut SqliteStorage, campaign_id: i64, path: &str, status: PageStatus) {
        storage
            .insert_page(&NewPage {
                campaign_id,
                url: format!("https://example.com/{}", path),
                domain: "example.com".to_string(),
                status,
                http_status: Some(200),
                title: None,
                text_content: None,
                method_used: Some(FetchMethod::Http),
                blob_path: None,
                checksum: None,
                size_bytes: None,
                error_message: None,
            })
            .unwrap();
    }

    #[test]
    fn test_load_campaign_stats_counts_statuses() {
        let (mut storage, id) = storage_with_campaign();
        record_page(&mut storage, id, "a", PageStatus::Success);
        record_page(&mut storage, id, "b", PageStatus::Success);
        record_page(&mut storage, id, "c", PageStatus::Blocked);
        record_page(&mut storage, id, "d", PageStatus::Failed);
        storage
            .admit_frontier_url(id, "https://example.com/pending", "example.com")
            .unwrap();

        let stats = load_campaign_stats(&storage, id).unwrap();
        assert_eq!(stats.total_recorded(), 4);
        assert_eq!(stats.pages_by_status[&PageStatus::Success], 2);
        assert_eq!(stats.pages_by_status[&PageStatus::Blocked], 1);
        assert_eq!(stats.pages_by_status[&PageStatus::Failed], 1);
        assert_eq!(stats.pending_frontier, 1);
    }

    #[test]
    fn test_duration_present_once_finished() {
        let (mut storage, id) = storage_with_campaign();

        let before = load_campaign_stats(&storage, id).unwrap();
        assert!(before.duration_seconds.is_none());

        storage
            .update_campaign_status(id, CampaignStatus::Completed)
            .unwrap();
        let after = load_campaign_stats(&storage, id).unwrap();
        assert!(after.duration_seconds.is_some());
    }

    #[test]
    fn test_missing_campaign_errors() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(load_campaign_stats(&storage, 99).is_err());
    }
}
