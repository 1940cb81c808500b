//! Per-domain policy records and resolution

use crate::policy::FetchMethod;
use crate::storage::{SqliteStorage, Storage};
use crate::url::domain_suffix_match;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Fetch policy for a single domain
///
/// Stored rows are written by administrators; the engine only reads them.
#[derive(Debug, Clone)]
pub struct DomainPolicy {
    pub domain: String,
    pub enabled: bool,
    /// `None` defers to the global scrape-method setting
    pub fetch_method: Option<FetchMethod>,
    pub use_proxy: bool,
    /// Fixed inter-request delay; when absent the global range applies
    pub delay_ms: Option<u64>,
    pub max_concurrency: u32,
    pub user_agent: Option<String>,
    pub block_resources: bool,
}

impl DomainPolicy {
    /// The compiled-in fallback used when no stored policy matches
    pub fn default_for(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            enabled: true,
            fetch_method: None,
            use_proxy: false,
            delay_ms: Some(1000),
            max_concurrency: 2,
            user_agent: None,
            block_resources: true,
        }
    }
}

/// Resolves the effective policy for a domain
///
/// Lookup order: exact match, then the longest enabled suffix match,
/// then the compiled-in default. Resolution never fails; store errors
/// degrade to the default with a warning.
pub struct PolicyStore {
    storage: Arc<Mutex<SqliteStorage>>,
}

impl PolicyStore {
    pub fn new(storage: Arc<Mutex<SqliteStorage>>) -> Self {
        Self { storage }
    }

    /// Returns the policy governing `domain`
    pub fn resolve(&self, domain: &str) -> DomainPolicy {
        let storage = self.storage.lock().unwrap();

        match storage.get_domain_policy(domain) {
            Ok(Some(policy)) if policy.enabled => return policy,
            Ok(_) => {}
            Err(e) => {
                warn!(domain = %domain, error = %e, "policy lookup failed, using default");
                return DomainPolicy::default_for(domain);
            }
        }

        // No exact row: fall back to the longest enabled suffix match
        match storage.list_domain_policies() {
            Ok(policies) => {
                let best = policies
                    .into_iter()
                    .filter(|p| p.enabled && domain_suffix_match(domain, &p.domain))
                    .max_by_key(|p| p.domain.len());
                match best {
                    Some(policy) => policy,
                    None => DomainPolicy::default_for(domain),
                }
            }
            Err(e) => {
                warn!(domain = %domain, error = %e, "policy scan failed, using default");
                DomainPolicy::default_for(domain)
            }
        }
    }
}
