use crate::config::types::{
    BrowserConfig, CampaignFile, Config, HttpConfig, ProxyConfig, StorageConfig, WorkerConfig,
};
use crate::url::normalize_url;
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_worker_config(&config.worker)?;
    validate_http_config(&config.http)?;
    validate_browser_config(&config.browser)?;
    validate_proxy_config(&config.proxy)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

/// Validates worker pool configuration
fn validate_worker_config(config: &WorkerConfig) -> Result<(), ConfigError> {
    if config.count < 1 || config.count > 100 {
        return Err(ConfigError::Validation(format!(
            "worker count must be between 1 and 100, got {}",
            config.count
        )));
    }

    if config.queue_redeliveries < 1 {
        return Err(ConfigError::Validation(format!(
            "queue-redeliveries must be >= 1, got {}",
            config.queue_redeliveries
        )));
    }

    if let Some(threshold) = config.max_consecutive_failures {
        if threshold < 1 {
            return Err(ConfigError::Validation(
                "max-consecutive-failures must be >= 1 when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates HTTP transport configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "http timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "http user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates browser transport configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.enabled && config.navigation_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "browser navigation-timeout-secs must be >= 1, got {}",
            config.navigation_timeout_secs
        )));
    }

    Ok(())
}

/// Validates the proxy endpoint
///
/// All-absent is fine (proxying simply stays off); a partial endpoint is a
/// config mistake worth failing fast on.
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    let any_set = config.host.is_some()
        || config.port.is_some()
        || config.username.is_some()
        || config.password.is_some();

    if any_set && !config.is_complete() {
        return Err(ConfigError::Validation(
            "proxy section must set all of host, port, username, password (or none)".to_string(),
        ));
    }

    if let Some(port) = config.port {
        if port == 0 {
            return Err(ConfigError::Validation("proxy port cannot be 0".to_string()));
        }
    }

    Ok(())
}

/// Validates storage paths
fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.blob_path.is_empty() {
        return Err(ConfigError::Validation(
            "blob-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates a submitted campaign definition
///
/// A campaign with no parseable seed URLs is rejected here, before anything
/// is persisted; that is the one condition that fails a campaign at birth.
pub fn validate_campaign_file(campaign: &CampaignFile) -> Result<(), ConfigError> {
    if campaign.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "campaign name cannot be empty".to_string(),
        ));
    }

    if campaign.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            campaign.max_pages
        )));
    }

    if campaign.seeds.is_empty() {
        return Err(ConfigError::Validation(
            "campaign must have at least one seed URL".to_string(),
        ));
    }

    let valid_seeds = campaign
        .seeds
        .iter()
        .filter(|s| normalize_url(s).is_ok())
        .count();
    if valid_seeds == 0 {
        return Err(ConfigError::InvalidUrl(format!(
            "no valid seed URLs among {:?}",
            campaign.seeds
        )));
    }

    if let Some(domains) = &campaign.allowed_domains {
        if domains.iter().all(|d| d.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "allowed-domains cannot be all empty strings".to_string(),
            ));
        }
    }

    Ok(())
}
