use serde::Deserialize;

/// Main configuration structure for Seine
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub worker: WorkerConfig,
    pub http: HttpConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    #[serde(rename = "block-markers")]
    pub block_markers: Vec<String>,
}

/// Worker pool behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Number of worker tasks sharing the queue
    pub count: u32,

    /// Maximum redeliveries for a task hit by transient infrastructure errors
    #[serde(rename = "queue-redeliveries")]
    pub queue_redeliveries: u32,

    /// Consecutive failed pages after which a campaign is marked failed.
    /// Unset means campaigns never auto-fail from fetch errors.
    #[serde(default)]
    #[serde(rename = "max-consecutive-failures")]
    pub max_consecutive_failures: Option<u32>,
}

/// Plain HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// User agent sent when no domain policy overrides it
    #[serde(rename = "user-agent")]
    pub user_agent: String,
}

/// Headless browser transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// Whether the browser transport is available for escalation
    pub enabled: bool,

    /// Navigation timeout in seconds
    #[serde(rename = "navigation-timeout-secs")]
    pub navigation_timeout_secs: u64,

    /// Run Chromium headless
    pub headless: bool,

    /// Extra Chromium command-line arguments
    #[serde(default)]
    #[serde(rename = "chrome-args")]
    pub chrome_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            navigation_timeout_secs: 20,
            headless: true,
            chrome_args: Vec::new(),
        }
    }
}

/// Proxy endpoint credentials
///
/// The endpoint itself is static config; whether and how it is used per
/// request is decided by the stored proxy settings at plan time.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProxyConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Returns true if a complete credentialed endpoint is configured
    pub fn is_complete(&self) -> bool {
        self.host.is_some() && self.port.is_some() && self.username.is_some() && self.password.is_some()
    }
}

/// Storage paths configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory for raw page blobs
    #[serde(rename = "blob-path")]
    pub blob_path: String,
}

/// A campaign definition as submitted by an operator
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignFile {
    pub name: String,

    #[serde(default)]
    pub query: String,

    /// Seed URLs the campaign starts from
    pub seeds: Vec<String>,

    /// Optional explicit domain scope; absent means seeds' registrable domains
    #[serde(default)]
    #[serde(rename = "allowed-domains")]
    pub allowed_domains: Option<Vec<String>>,

    /// Page budget
    #[serde(default = "default_max_pages")]
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Whether in-scope links on collected pages are followed
    #[serde(default = "default_follow_links")]
    #[serde(rename = "follow-links")]
    pub follow_links: bool,
}

fn default_max_pages() -> u32 {
    50
}

fn default_follow_links() -> bool {
    true
}
