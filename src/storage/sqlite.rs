//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::policy::{DomainPolicy, FetchMethod};
use crate::state::{CampaignStatus, JobStatus, PageStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{NewCampaign, NewPage, Storage, StorageError, StorageResult};
use crate::storage::{CampaignRecord, FrontierState, JobRecord, PageRecord};
use crate::SeineError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SeineError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SeineError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )?;

        // Initialize schema
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, SeineError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

const CAMPAIGN_COLUMNS: &str = "id, name, query, seed_urls, allowed_domains, max_pages, \
     pages_collected, follow_links, status, consecutive_failures, tasks_inflight, \
     created_at, started_at, finished_at";

const PAGE_COLUMNS: &str = "id, campaign_id, url, domain, status, http_status, title, \
     text_content, method_used, blob_path, checksum, size_bytes, error_message, fetched_at";

fn map_campaign(row: &rusqlite::Row<'_>) -> rusqlite::Result<CampaignRecord> {
    Ok(CampaignRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        query: row.get(2)?,
        seed_urls: serde_json::from_str(&row.get::<_, String>(3)?).unwrap_or_default(),
        allowed_domains: row
            .get::<_, Option<String>>(4)?
            .and_then(|s| serde_json::from_str(&s).ok()),
        max_pages: row.get(5)?,
        pages_collected: row.get(6)?,
        follow_links: row.get::<_, i32>(7)? != 0,
        status: CampaignStatus::from_db_string(&row.get::<_, String>(8)?)
            .unwrap_or(CampaignStatus::Failed),
        consecutive_failures: row.get(9)?,
        tasks_inflight: row.get(10)?,
        created_at: row.get(11)?,
        started_at: row.get(12)?,
        finished_at: row.get(13)?,
    })
}

fn map_page(row: &rusqlite::Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        campaign_id: row.get(1)?,
        url: row.get(2)?,
        domain: row.get(3)?,
        status: PageStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(PageStatus::Failed),
        http_status: row.get(5)?,
        title: row.get(6)?,
        text_content: row.get(7)?,
        method_used: row
            .get::<_, Option<String>>(8)?
            .and_then(|s| FetchMethod::from_db_string(&s)),
        blob_path: row.get(9)?,
        checksum: row.get(10)?,
        size_bytes: row.get(11)?,
        error_message: row.get(12)?,
        fetched_at: row.get(13)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Campaign Management =====

    fn create_campaign(&mut self, campaign: &NewCampaign) -> StorageResult<i64> {
        let seeds = serde_json::to_string(&campaign.seed_urls)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let allowed = match &campaign.allowed_domains {
            Some(domains) => Some(
                serde_json::to_string(domains)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?,
            ),
            None => None,
        };
        let follow_links_int = if campaign.follow_links { 1 } else { 0 };
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO campaigns (name, query, seed_urls, allowed_domains, max_pages, follow_links, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                campaign.name,
                campaign.query,
                seeds,
                allowed,
                campaign.max_pages,
                follow_links_int,
                CampaignStatus::Pending.to_db_string(),
                now
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_campaign(&self, campaign_id: i64) -> StorageResult<CampaignRecord> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM campaigns WHERE id = ?1",
            CAMPAIGN_COLUMNS
        ))?;

        let campaign = stmt
            .query_row(params![campaign_id], map_campaign)
            .map_err(|_| StorageError::CampaignNotFound(campaign_id))?;

        Ok(campaign)
    }

    fn list_campaigns_by_status(
        &self,
        status: CampaignStatus,
    ) -> StorageResult<Vec<CampaignRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM campaigns WHERE status = ?1 ORDER BY id ASC",
            CAMPAIGN_COLUMNS
        ))?;

        let campaigns = stmt
            .query_map(params![status.to_db_string()], map_campaign)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(campaigns)
    }

    fn update_campaign_status(
        &mut self,
        campaign_id: i64,
        status: CampaignStatus,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        match status {
            CampaignStatus::Active => {
                // started_at is set once, on the first activation
                self.conn.execute(
                    "UPDATE campaigns SET status = ?1, started_at = COALESCE(started_at, ?2)
                     WHERE id = ?3",
                    params![status.to_db_string(), now, campaign_id],
                )?;
            }
            CampaignStatus::Completed | CampaignStatus::Failed => {
                self.conn.execute(
                    "UPDATE campaigns SET status = ?1, finished_at = ?2 WHERE id = ?3",
                    params![status.to_db_string(), now, campaign_id],
                )?;
            }
            _ => {
                self.conn.execute(
                    "UPDATE campaigns SET status = ?1 WHERE id = ?2",
                    params![status.to_db_string(), campaign_id],
                )?;
            }
        }
        Ok(())
    }

    fn try_increment_pages(&mut self, campaign_id: i64) -> StorageResult<bool> {
        // The WHERE clause is the budget guard; with WAL a concurrent
        // worker either sees the increment or loses the claim.
        let changed = self.conn.execute(
            "UPDATE campaigns SET pages_collected = pages_collected + 1
             WHERE id = ?1 AND pages_collected < max_pages",
            params![campaign_id],
        )?;
        Ok(changed == 1)
    }

    fn adjust_inflight(&mut self, campaign_id: i64, delta: i64) -> StorageResult<i64> {
        self.conn.execute(
            "UPDATE campaigns SET tasks_inflight = MAX(0, tasks_inflight + ?1) WHERE id = ?2",
            params![delta, campaign_id],
        )?;
        let value: i64 = self.conn.query_row(
            "SELECT tasks_inflight FROM campaigns WHERE id = ?1",
            params![campaign_id],
            |row| row.get(0),
        )?;
        Ok(value)
    }

    fn record_fetch_failure(&mut self, campaign_id: i64) -> StorageResult<u32> {
        self.conn.execute(
            "UPDATE campaigns SET consecutive_failures = consecutive_failures + 1 WHERE id = ?1",
            params![campaign_id],
        )?;
        let count: u32 = self.conn.query_row(
            "SELECT consecutive_failures FROM campaigns WHERE id = ?1",
            params![campaign_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn reset_failure_streak(&mut self, campaign_id: i64) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE campaigns SET consecutive_failures = 0 WHERE id = ?1",
            params![campaign_id],
        )?;
        Ok(())
    }

    // ===== Frontier Management =====

    fn admit_frontier_url(
        &mut self,
        campaign_id: i64,
        url: &str,
        domain: &str,
    ) -> StorageResult<bool> {
        let now = Utc::now().to_rfc3339();
        // The unique constraint makes re-admission a no-op
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO frontier_urls (campaign_id, url, domain, state, discovered_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                campaign_id,
                url,
                domain,
                FrontierState::Pending.to_db_string(),
                now
            ],
        )?;
        Ok(changed == 1)
    }

    fn next_frontier_batch(&mut self, campaign_id: i64, limit: u32) -> StorageResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, url FROM frontier_urls
             WHERE campaign_id = ?1 AND state = ?2
             ORDER BY id ASC LIMIT ?3",
        )?;

        let rows = stmt
            .query_map(
                params![campaign_id, FrontierState::Pending.to_db_string(), limit],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);

        for (id, _) in &rows {
            self.conn.execute(
                "UPDATE frontier_urls SET state = ?1 WHERE id = ?2",
                params![FrontierState::Dispatched.to_db_string(), id],
            )?;
        }

        Ok(rows.into_iter().map(|(_, url)| url).collect())
    }

    fn pending_frontier_count(&self, campaign_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM frontier_urls WHERE campaign_id = ?1 AND state = ?2",
            params![campaign_id, FrontierState::Pending.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn requeue_dispatched(&mut self, campaign_id: i64) -> StorageResult<u64> {
        let changed = self.conn.execute(
            "UPDATE frontier_urls SET state = ?1
             WHERE campaign_id = ?2 AND state = ?3
               AND url NOT IN (SELECT url FROM crawled_pages WHERE campaign_id = ?2)",
            params![
                FrontierState::Pending.to_db_string(),
                campaign_id,
                FrontierState::Dispatched.to_db_string()
            ],
        )?;
        Ok(changed as u64)
    }

    fn reset_inflight(&mut self, campaign_id: i64) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE campaigns SET tasks_inflight = 0 WHERE id = ?1",
            params![campaign_id],
        )?;
        Ok(())
    }

    // ===== Page Results =====

    fn insert_page(&mut self, page: &NewPage) -> StorageResult<Option<i64>> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO crawled_pages
             (campaign_id, url, domain, status, http_status, title, text_content,
              method_used, blob_path, checksum, size_bytes, error_message, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                page.campaign_id,
                page.url,
                page.domain,
                page.status.to_db_string(),
                page.http_status,
                page.title,
                page.text_content,
                page.method_used.map(|m| m.to_db_string()),
                page.blob_path,
                page.checksum,
                page.size_bytes,
                page.error_message,
                now
            ],
        )?;

        if changed == 0 {
            return Ok(None);
        }
        Ok(Some(self.conn.last_insert_rowid()))
    }

    fn get_page_result(&self, campaign_id: i64, url: &str) -> StorageResult<Option<PageRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM crawled_pages WHERE campaign_id = ?1 AND url = ?2",
            PAGE_COLUMNS
        ))?;

        let page = stmt
            .query_row(params![campaign_id, url], map_page)
            .optional()?;

        Ok(page)
    }

    fn count_pages_by_status(
        &self,
        campaign_id: i64,
        status: PageStatus,
    ) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM crawled_pages WHERE campaign_id = ?1 AND status = ?2",
            params![campaign_id, status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn page_status_breakdown(
        &self,
        campaign_id: i64,
    ) -> StorageResult<HashMap<PageStatus, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) FROM crawled_pages WHERE campaign_id = ?1 GROUP BY status",
        )?;

        let mut breakdown = HashMap::new();
        let rows = stmt.query_map(params![campaign_id], |row| {
            let status_str: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status_str, count))
        })?;

        for row in rows {
            let (status_str, count) = row?;
            if let Some(status) = PageStatus::from_db_string(&status_str) {
                breakdown.insert(status, count as u64);
            }
        }

        Ok(breakdown)
    }

    // ===== Domain Policies =====

    fn upsert_domain_policy(&mut self, policy: &DomainPolicy) -> StorageResult<()> {
        let enabled_int = if policy.enabled { 1 } else { 0 };
        let use_proxy_int = if policy.use_proxy { 1 } else { 0 };
        let block_resources_int = if policy.block_resources { 1 } else { 0 };
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT OR REPLACE INTO domain_policies
             (domain, enabled, fetch_method, use_proxy, delay_ms, max_concurrency,
              user_agent, block_resources, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                policy.domain,
                enabled_int,
                policy.fetch_method.map(|m| m.to_db_string()),
                use_proxy_int,
                policy.delay_ms,
                policy.max_concurrency,
                policy.user_agent,
                block_resources_int,
                now
            ],
        )?;

        Ok(())
    }

    fn get_domain_policy(&self, domain: &str) -> StorageResult<Option<DomainPolicy>> {
        let mut stmt = self.conn.prepare(
            "SELECT domain, enabled, fetch_method, use_proxy, delay_ms, max_concurrency,
             user_agent, block_resources
             FROM domain_policies WHERE domain = ?1",
        )?;

        let policy = stmt
            .query_row(params![domain], |row| {
                Ok(DomainPolicy {
                    domain: row.get(0)?,
                    enabled: row.get::<_, i32>(1)? != 0,
                    fetch_method: row
                        .get::<_, Option<String>>(2)?
                        .and_then(|s| FetchMethod::from_db_string(&s)),
                    use_proxy: row.get::<_, i32>(3)? != 0,
                    delay_ms: row.get(4)?,
                    max_concurrency: row.get(5)?,
                    user_agent: row.get(6)?,
                    block_resources: row.get::<_, i32>(7)? != 0,
                })
            })
            .optional()?;

        Ok(policy)
    }

    fn list_domain_policies(&self) -> StorageResult<Vec<DomainPolicy>> {
        let mut stmt = self.conn.prepare(
            "SELECT domain, enabled, fetch_method, use_proxy, delay_ms, max_concurrency,
             user_agent, block_resources
             FROM domain_policies ORDER BY domain",
        )?;

        let policies = stmt
            .query_map([], |row| {
                Ok(DomainPolicy {
                    domain: row.get(0)?,
                    enabled: row.get::<_, i32>(1)? != 0,
                    fetch_method: row
                        .get::<_, Option<String>>(2)?
                        .and_then(|s| FetchMethod::from_db_string(&s)),
                    use_proxy: row.get::<_, i32>(3)? != 0,
                    delay_ms: row.get(4)?,
                    max_concurrency: row.get(5)?,
                    user_agent: row.get(6)?,
                    block_resources: row.get::<_, i32>(7)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(policies)
    }

    // ===== Settings =====

    fn get_setting(&self, key: &str) -> StorageResult<Option<String>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put_setting(&mut self, key: &str, value: &str) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR REPLACE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, now],
        )?;
        Ok(())
    }

    // ===== Jobs =====

    fn create_job(
        &mut self,
        project: &str,
        url: &str,
        extraction_schema: Option<&str>,
    ) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO jobs (project, url, status, extraction_schema, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                project,
                url,
                JobStatus::Pending.to_db_string(),
                extraction_schema,
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_job(&self, job_id: i64) -> StorageResult<JobRecord> {
        let mut stmt = self.conn.prepare(
            "SELECT id, project, url, status, http_status, title, blob_path,
             extraction_schema, extracted, error_message, created_at, finished_at
             FROM jobs WHERE id = ?1",
        )?;

        let job = stmt
            .query_row(params![job_id], |row| {
                Ok(JobRecord {
                    id: row.get(0)?,
                    project: row.get(1)?,
                    url: row.get(2)?,
                    status: JobStatus::from_db_string(&row.get::<_, String>(3)?)
                        .unwrap_or(JobStatus::Failed),
                    http_status: row.get(4)?,
                    title: row.get(5)?,
                    blob_path: row.get(6)?,
                    extraction_schema: row.get(7)?,
                    extracted: row.get(8)?,
                    error_message: row.get(9)?,
                    created_at: row.get(10)?,
                    finished_at: row.get(11)?,
                })
            })
            .map_err(|_| StorageError::JobNotFound(job_id))?;

        Ok(job)
    }

    fn mark_job_running(&mut self, job_id: i64) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE jobs SET status = ?1 WHERE id = ?2",
            params![JobStatus::Running.to_db_string(), job_id],
        )?;
        Ok(())
    }

    fn finish_job(
        &mut self,
        job_id: i64,
        status: JobStatus,
        http_status: Option<u16>,
        title: Option<&str>,
        blob_path: Option<&str>,
        extracted: Option<&str>,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE jobs SET status = ?1, http_status = ?2, title = ?3, blob_path = ?4,
             extracted = ?5, error_message = ?6, finished_at = ?7 WHERE id = ?8",
            params![
                status.to_db_string(),
                http_status,
                title,
                blob_path,
                extracted,
                error_message,
                now,
                job_id
            ],
        )?;
        Ok(())
    }
}
