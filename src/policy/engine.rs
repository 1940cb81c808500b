//! Attempt planning
//!
//! `PolicyEngine` turns the stored domain policy and the global proxy
//! settings into one concrete `AttemptPlan` per fetch attempt. Planning
//! never fails: unresolvable configuration degrades to direct,
//! unproxied fetching with a warning.

use crate::config::ProxyConfig;
use crate::policy::domain::PolicyStore;
use crate::policy::session::{session_nonce, ProxyIdentity, SessionRegistry};
use crate::policy::settings::{ProxySettings, RotationStrategy, SettingsCache};
use crate::policy::FetchMethod;
use crate::storage::SqliteStorage;
use rand::{thread_rng, Rng};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

/// Session lifetime used when sticky sessions are off but the rotation
/// strategy still holds one identity for the whole job
const PER_JOB_SESSION_SECS: u64 = 86_400;

/// Everything a worker needs to make one fetch attempt
#[derive(Debug, Clone)]
pub struct AttemptPlan {
    pub method: FetchMethod,
    pub proxy: Option<ProxyIdentity>,
    /// Pause inserted before the attempt, including retries
    pub delay: Duration,
    /// Retry budget for the whole task, not per attempt
    pub max_retries: u32,
    pub user_agent: Option<String>,
    pub block_resources: bool,
    pub max_concurrency: u32,
}

/// Per-task fetch state threaded between attempts
#[derive(Debug, Clone)]
pub struct AttemptContext {
    /// Rotation scope, e.g. "campaign-3" or "job-17"
    pub session_key: String,
    /// Whether the previous attempt came back blocked
    pub previous_blocked: bool,
}

impl AttemptContext {
    pub fn new(session_key: &str) -> Self {
        Self {
            session_key: session_key.to_string(),
            previous_blocked: false,
        }
    }
}

#[derive(Debug, Clone)]
struct ProxyEndpoint {
    host: String,
    port: u16,
    username: String,
    password: String,
}

impl ProxyEndpoint {
    fn from_config(config: &ProxyConfig) -> Option<Self> {
        match (&config.host, config.port, &config.username, &config.password) {
            (Some(host), Some(port), Some(username), Some(password)) => Some(Self {
                host: host.clone(),
                port,
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

/// Plans fetch attempts from stored policy and settings
pub struct PolicyEngine {
    policies: PolicyStore,
    settings: SettingsCache,
    sessions: SessionRegistry,
    endpoint: Option<ProxyEndpoint>,
}

impl PolicyEngine {
    pub fn new(storage: Arc<Mutex<SqliteStorage>>, proxy: &ProxyConfig) -> Self {
        Self {
            policies: PolicyStore::new(Arc::clone(&storage)),
            settings: SettingsCache::new(storage),
            sessions: SessionRegistry::new(),
            endpoint: ProxyEndpoint::from_config(proxy),
        }
    }

    /// Produces the plan for one fetch attempt against `domain`
    ///
    /// # Arguments
    ///
    /// * `domain` - Host being fetched
    /// * `attempt` - 1-based attempt number within the task
    /// * `ctx` - Rotation scope and outcome of the previous attempt
    pub fn plan_attempt(&self, domain: &str, attempt: u32, ctx: &AttemptContext) -> AttemptPlan {
        let policy = self.policies.resolve(domain);
        let settings = self.settings.get();

        // A stored domain preference beats the global method policy
        let method = policy.fetch_method.unwrap_or(settings.scrape_method);

        let proxy = if settings.enabled || policy.use_proxy {
            self.proxy_identity(domain, ctx, &settings)
        } else {
            None
        };

        let delay = match policy.delay_ms {
            Some(ms) => Duration::from_millis(ms),
            None => {
                let (lo, hi) = if settings.request_delay_min_ms <= settings.request_delay_max_ms {
                    (settings.request_delay_min_ms, settings.request_delay_max_ms)
                } else {
                    (settings.request_delay_max_ms, settings.request_delay_min_ms)
                };
                Duration::from_millis(thread_rng().gen_range(lo..=hi))
            }
        };

        debug!(
            domain = %domain,
            attempt,
            method = %method,
            proxied = proxy.is_some(),
            delay_ms = delay.as_millis() as u64,
            "planned fetch attempt"
        );

        AttemptPlan {
            method,
            proxy,
            delay,
            max_retries: settings.retry_count,
            user_agent: policy.user_agent,
            block_resources: policy.block_resources,
            max_concurrency: policy.max_concurrency.max(1),
        }
    }

    fn proxy_identity(
        &self,
        domain: &str,
        ctx: &AttemptContext,
        settings: &ProxySettings,
    ) -> Option<ProxyIdentity> {
        let endpoint = match &self.endpoint {
            Some(endpoint) => endpoint,
            None => {
                warn!(
                    domain = %domain,
                    "proxy requested but [proxy] endpoint is not configured, going direct"
                );
                return None;
            }
        };

        match settings.rotation_strategy {
            RotationStrategy::PerRequest => Some(Self::fresh_identity(endpoint, settings)),
            RotationStrategy::OnFailure => {
                if ctx.previous_blocked {
                    self.sessions.evict(domain, &ctx.session_key);
                }
                Some(self.held_identity(endpoint, domain, ctx, settings))
            }
            RotationStrategy::PerJob => Some(self.held_identity(endpoint, domain, ctx, settings)),
        }
    }

    fn held_identity(
        &self,
        endpoint: &ProxyEndpoint,
        domain: &str,
        ctx: &AttemptContext,
        settings: &ProxySettings,
    ) -> ProxyIdentity {
        let ttl = if settings.sticky_enabled {
            Duration::from_secs(settings.sticky_ttl_sec)
        } else {
            Duration::from_secs(PER_JOB_SESSION_SECS)
        };
        self.sessions
            .get_or_create(domain, &ctx.session_key, ttl, || {
                Self::fresh_identity(endpoint, settings)
            })
    }

    fn fresh_identity(endpoint: &ProxyEndpoint, settings: &ProxySettings) -> ProxyIdentity {
        let session_id = format!("session-{}", session_nonce());
        let username = format!(
            "{}-country-{}-{}",
            endpoint.username, settings.country, session_id
        );
        ProxyIdentity {
            url: format!(
                "http://{}:{}@{}:{}",
                username, endpoint.password, endpoint.host, endpoint.port
            ),
            server: format!("{}:{}", endpoint.host, endpoint.port),
            session_id,
        }
    }
}
