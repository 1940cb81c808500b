//! Status definitions for campaigns, crawled pages, and scrape jobs
//!
//! # Components
//!
//! - `CampaignStatus`: Lifecycle of a crawl campaign (pending, active, paused, completed, failed)
//! - `PageStatus`: Terminal outcome of a single crawled page (success, failed, blocked)
//! - `JobStatus`: Lifecycle of a single-URL scrape job

mod campaign_status;
mod job_status;
mod page_status;

// Re-export main types
pub use campaign_status::CampaignStatus;
pub use job_status::JobStatus;
pub use page_status::PageStatus;
