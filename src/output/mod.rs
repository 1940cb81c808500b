//! Operator-facing reporting
//!
//! Campaign progress and page-status breakdowns, read straight from
//! the crawl database.

pub mod stats;

pub use stats::{load_campaign_stats, print_campaign_stats, CampaignStats};
