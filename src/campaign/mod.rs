//! Campaign orchestration
//!
//! A campaign is one crawl: seed URLs, a scope, a page budget, and a
//! status that moves through the lifecycle as workers report outcomes.
//! [`Frontier`] owns which URLs are still to visit, [`CampaignMachine`]
//! owns everything that happens when a visit comes back.

mod frontier;
mod machine;

pub use frontier::Frontier;
pub use machine::{CampaignMachine, RecordSummary};
