//! Crawl execution
//!
//! This module contains the moving parts of a crawl process:
//! - Worker tasks consuming the shared queue
//! - Per-domain concurrency limiting
//! - One-off job execution
//! - Runtime wiring and idle detection

mod job;
mod limiter;
mod runtime;
mod worker;

pub use limiter::DomainLimiter;
pub use runtime::{run_campaign, CrawlRuntime};
