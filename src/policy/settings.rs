//! Global proxy settings and their short-TTL cache
//!
//! The settings row is read on nearly every fetch, so workers go through
//! a cache instead of the store. The TTL bounds how stale a worker's view
//! can be; accepting that staleness is the trade for not hitting the
//! database once per request.

use crate::policy::FetchMethod;
use crate::storage::{SqliteStorage, Storage, StorageError, StorageResult};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::warn;

/// How long a cached settings snapshot stays valid
pub const SETTINGS_CACHE_TTL: Duration = Duration::from_secs(60);

const PROXY_SETTINGS_KEY: &str = "proxy_settings";

/// When the proxy identity is rotated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationStrategy {
    /// One identity held for the whole job or campaign
    PerJob,
    /// Rotate only after a blocked outcome
    OnFailure,
    /// Fresh identity on every attempt
    PerRequest,
}

/// Global proxy and politeness settings, stored as a single JSON row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub enabled: bool,
    pub provider: String,
    pub proxy_type: String,
    pub country: String,
    pub sticky_enabled: bool,
    pub sticky_ttl_sec: u64,
    pub rotation_strategy: RotationStrategy,
    pub retry_count: u32,
    pub request_delay_min_ms: u64,
    pub request_delay_max_ms: u64,
    pub scrape_method: FetchMethod,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: "smartproxy".to_string(),
            proxy_type: "residential".to_string(),
            country: "us".to_string(),
            sticky_enabled: false,
            sticky_ttl_sec: 300,
            rotation_strategy: RotationStrategy::PerJob,
            retry_count: 3,
            request_delay_min_ms: 500,
            request_delay_max_ms: 2000,
            scrape_method: FetchMethod::Auto,
        }
    }
}

struct CachedSettings {
    settings: ProxySettings,
    fetched_at: Instant,
}

impl CachedSettings {
    fn is_stale(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() >= ttl
    }
}

/// Short-TTL read cache over the stored settings row
pub struct SettingsCache {
    storage: Arc<Mutex<SqliteStorage>>,
    ttl: Duration,
    cached: Mutex<Option<CachedSettings>>,
}

impl SettingsCache {
    pub fn new(storage: Arc<Mutex<SqliteStorage>>) -> Self {
        Self::with_ttl(storage, SETTINGS_CACHE_TTL)
    }

    pub fn with_ttl(storage: Arc<Mutex<SqliteStorage>>, ttl: Duration) -> Self {
        Self {
            storage,
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Returns the current settings, reading through the cache
    pub fn get(&self) -> ProxySettings {
        {
            let cached = self.cached.lock().unwrap();
            if let Some(entry) = cached.as_ref() {
                if !entry.is_stale(self.ttl) {
                    return entry.settings.clone();
                }
            }
        }

        let settings = self.load();
        let mut cached = self.cached.lock().unwrap();
        *cached = Some(CachedSettings {
            settings: settings.clone(),
            fetched_at: Instant::now(),
        });
        settings
    }

    /// Persists new settings and drops the cached copy
    pub fn put(&self, settings: &ProxySettings) -> StorageResult<()> {
        let json = serde_json::to_string(settings)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.storage
            .lock()
            .unwrap()
            .put_setting(PROXY_SETTINGS_KEY, &json)?;
        self.invalidate();
        Ok(())
    }

    /// Drops the cached snapshot so the next read hits the store
    pub fn invalidate(&self) {
        let mut cached = self.cached.lock().unwrap();
        *cached = None;
    }

    fn load(&self) -> ProxySettings {
        let storage = self.storage.lock().unwrap();
        match storage.get_setting(PROXY_SETTINGS_KEY) {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(error = %e, "stored proxy settings are malformed, using defaults");
                    ProxySettings::default()
                }
            },
            Ok(None) => ProxySettings::default(),
            Err(e) => {
                warn!(error = %e, "failed to read proxy settings, using defaults");
                ProxySettings::default()
            }
        }
    }
}
