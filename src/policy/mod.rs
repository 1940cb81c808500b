//! Per-domain fetch policy and proxy planning
//!
//! This module decides *how* each fetch attempt is made: which transport
//! to try first, whether to route through a proxy and under which session,
//! how long to pause before the request, and how many retries the attempt
//! gets. Domain-level overrides always win over the global settings row.

mod domain;
mod engine;
mod session;
mod settings;

pub use domain::{DomainPolicy, PolicyStore};
pub use engine::{AttemptContext, AttemptPlan, PolicyEngine};
pub use session::{ProxyIdentity, SessionRegistry};
pub use settings::{ProxySettings, RotationStrategy, SettingsCache, SETTINGS_CACHE_TTL};

use serde::{Deserialize, Serialize};

/// Which transport a fetch should use
///
/// `Auto` means: try plain HTTP first and escalate to browser automation
/// when the response looks blocked or requires JavaScript rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchMethod {
    Auto,
    Http,
    Browser,
}

impl FetchMethod {
    /// Converts the method to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Http => "http",
            Self::Browser => "browser",
        }
    }

    /// Parses a method from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(Self::Auto),
            "http" => Some(Self::Http),
            "browser" => Some(Self::Browser),
            _ => None,
        }
    }
}

impl std::fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
