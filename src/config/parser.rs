use crate::config::types::{CampaignFile, Config};
use crate::config::validation::{validate, validate_campaign_file};
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use seine::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Workers: {}", config.worker.count);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    // Read the configuration file
    let content = std::fs::read_to_string(path)?;

    // Parse TOML
    let config: Config = toml::from_str(&content)?;

    // Validate the configuration
    validate(&config)?;

    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// This is used to detect if the configuration has changed between runs.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

/// Loads and validates a campaign definition file
///
/// # Arguments
///
/// * `path` - Path to the campaign TOML file
///
/// # Returns
///
/// * `Ok(CampaignFile)` - Successfully loaded and validated campaign
/// * `Err(ConfigError)` - Failed to load, parse, or validate the campaign
pub fn load_campaign_file(path: &Path) -> Result<CampaignFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let campaign: CampaignFile = toml::from_str(&content)?;
    validate_campaign_file(&campaign)?;
    Ok(campaign)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    const VALID_CONFIG: &str = r#"
[worker]
count = 4
queue-redeliveries = 3

[http]
timeout-secs = 30
user-agent = "SeineBot/0.6"

[browser]
enabled = true
navigation-timeout-secs = 20
headless = true

[storage]
database-path = "./seine.db"
blob-path = "./blobs"
"#;

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_file(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.worker.count, 4);
        assert_eq!(config.worker.queue_redeliveries, 3);
        assert_eq!(config.worker.max_consecutive_failures, None);
        assert_eq!(config.http.timeout_secs, 30);
        assert!(config.browser.enabled);
        assert!(config.proxy.host.is_none());
        assert!(config.block_markers.is_empty());
    }

    #[test]
    fn test_browser_section_defaults_when_absent() {
        let config_content = r#"
[worker]
count = 2
queue-redeliveries = 2

[http]
timeout-secs = 10
user-agent = "SeineBot/0.6"

[storage]
database-path = "./seine.db"
blob-path = "./blobs"
"#;
        let file = create_temp_file(config_content);
        let config = load_config(file.path()).unwrap();

        assert!(config.browser.enabled);
        assert_eq!(config.browser.navigation_timeout_secs, 20);
        assert!(config.browser.headless);
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_file("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[worker]
count = 0
queue-redeliveries = 3

[http]
timeout-secs = 30
user-agent = "SeineBot/0.6"

[storage]
database-path = "./seine.db"
blob-path = "./blobs"
"#;
        let file = create_temp_file(config_content);
        let result = load_config(file.path());
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_file("test content");

        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        // Same content should produce same hash
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA-256 produces 64 hex characters
    }

    #[test]
    fn test_different_content_different_hash() {
        let file1 = create_temp_file("content 1");
        let file2 = create_temp_file("content 2");

        let hash1 = compute_config_hash(file1.path()).unwrap();
        let hash2 = compute_config_hash(file2.path()).unwrap();

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_load_campaign_file() {
        let campaign_content = r#"
name = "widget-prices"
query = "widget wholesale prices"
seeds = ["https://example.com/widgets"]
allowed-domains = ["example.com"]
max-pages = 25
follow-links = true
"#;
        let file = create_temp_file(campaign_content);
        let campaign = load_campaign_file(file.path()).unwrap();

        assert_eq!(campaign.name, "widget-prices");
        assert_eq!(campaign.max_pages, 25);
        assert_eq!(
            campaign.allowed_domains,
            Some(vec!["example.com".to_string()])
        );
    }

    #[test]
    fn test_load_campaign_file_defaults() {
        let campaign_content = r#"
name = "quick"
seeds = ["https://example.com/"]
"#;
        let file = create_temp_file(campaign_content);
        let campaign = load_campaign_file(file.path()).unwrap();

        assert_eq!(campaign.max_pages, 50);
        assert!(campaign.follow_links);
        assert!(campaign.allowed_domains.is_none());
        assert_eq!(campaign.query, "");
    }

    #[test]
    fn test_load_campaign_file_rejects_no_seeds() {
        let campaign_content = r#"
name = "empty"
seeds = []
"#;
        let file = create_temp_file(campaign_content);
        assert!(load_campaign_file(file.path()).is_err());
    }
}
