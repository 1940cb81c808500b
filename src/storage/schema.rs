//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Seine database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Crawl campaigns
CREATE TABLE IF NOT EXISTS campaigns (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    query TEXT NOT NULL DEFAULT '',
    seed_urls TEXT NOT NULL,
    allowed_domains TEXT,
    max_pages INTEGER NOT NULL,
    pages_collected INTEGER NOT NULL DEFAULT 0,
    follow_links INTEGER NOT NULL DEFAULT 1,
    status TEXT NOT NULL,
    consecutive_failures INTEGER NOT NULL DEFAULT 0,
    tasks_inflight INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    started_at TEXT,
    finished_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_campaigns_status ON campaigns(status);

-- Every URL ever admitted to a campaign's frontier.
-- The UNIQUE constraint is the dedup authority: a URL enters a
-- campaign at most once, for the campaign's whole lifetime.
CREATE TABLE IF NOT EXISTS frontier_urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    campaign_id INTEGER NOT NULL REFERENCES campaigns(id),
    url TEXT NOT NULL,
    domain TEXT NOT NULL,
    state TEXT NOT NULL DEFAULT 'pending',
    discovered_at TEXT NOT NULL,
    UNIQUE(campaign_id, url)
);

CREATE INDEX IF NOT EXISTS idx_frontier_campaign_state ON frontier_urls(campaign_id, state);

-- Fetch results, one row per (campaign, url)
CREATE TABLE IF NOT EXISTS crawled_pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    campaign_id INTEGER NOT NULL REFERENCES campaigns(id),
    url TEXT NOT NULL,
    domain TEXT NOT NULL,
    status TEXT NOT NULL,
    http_status INTEGER,
    title TEXT,
    text_content TEXT,
    method_used TEXT,
    blob_path TEXT,
    checksum TEXT,
    size_bytes INTEGER,
    error_message TEXT,
    fetched_at TEXT NOT NULL,
    UNIQUE(campaign_id, url)
);

CREATE INDEX IF NOT EXISTS idx_pages_campaign ON crawled_pages(campaign_id);
CREATE INDEX IF NOT EXISTS idx_pages_status ON crawled_pages(status);

-- Per-domain fetch policy overrides. A NULL fetch_method defers to
-- the global scrape-method setting.
CREATE TABLE IF NOT EXISTS domain_policies (
    domain TEXT PRIMARY KEY,
    enabled INTEGER NOT NULL DEFAULT 1,
    fetch_method TEXT,
    use_proxy INTEGER NOT NULL DEFAULT 0,
    delay_ms INTEGER,
    max_concurrency INTEGER NOT NULL DEFAULT 2,
    user_agent TEXT,
    block_resources INTEGER NOT NULL DEFAULT 1,
    updated_at TEXT NOT NULL
);

-- Global settings, one JSON document per key
CREATE TABLE IF NOT EXISTS settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- One-off fetch jobs outside any campaign
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project TEXT NOT NULL,
    url TEXT NOT NULL,
    status TEXT NOT NULL,
    http_status INTEGER,
    title TEXT,
    blob_path TEXT,
    extraction_schema TEXT,
    extracted TEXT,
    error_message TEXT,
    created_at TEXT NOT NULL,
    finished_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_jobs_project ON jobs(project);
CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Gets the current schema version
///
/// This can be used for future migrations if the schema changes.
pub fn get_schema_version() -> u32 {
    1
}
