//! Integration tests for the crawl engine
//!
//! These tests use wiremock to create mock HTTP servers and drive
//! full campaigns end-to-end through the runtime: submit, crawl to
//! quiescence, then assert on the recorded state.

use seine::config::{
    BrowserConfig, CampaignFile, Config, HttpConfig, ProxyConfig, StorageConfig, WorkerConfig,
};
use seine::crawler::CrawlRuntime;
use seine::policy::DomainPolicy;
use seine::state::{CampaignStatus, PageStatus};
use seine::storage::Storage;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at throwaway storage paths
fn create_test_config(db_path: &str, blob_path: &str) -> Config {
    Config {
        worker: WorkerConfig {
            count: 2,
            queue_redeliveries: 1,
            max_consecutive_failures: None,
        },
        http: HttpConfig {
            timeout_secs: 5,
            user_agent: "SeineTest/1.0".to_string(),
        },
        browser: BrowserConfig {
            enabled: false,
            ..Default::default()
        },
        proxy: ProxyConfig::default(),
        storage: StorageConfig {
            database_path: db_path.to_string(),
            blob_path: blob_path.to_string(),
        },
        block_markers: vec![],
    }
}

fn campaign_file(name: &str, seeds: Vec<String>, max_pages: u32, follow_links: bool) -> CampaignFile {
    CampaignFile {
        name: name.to_string(),
        query: String::new(),
        seeds,
        allowed_domains: None,
        max_pages,
        follow_links,
    }
}

/// Overrides the compiled-in 1s politeness delay for the mock host
fn install_fast_policy(runtime: &CrawlRuntime, domain: &str) {
    let storage = runtime.storage();
    let mut store = storage.lock().unwrap();
    store
        .upsert_domain_policy(&DomainPolicy {
            domain: domain.to_string(),
            enabled: true,
            fetch_method: None,
            use_proxy: false,
            delay_ms: Some(0),
            max_concurrency: 4,
            user_agent: None,
            block_resources: false,
        })
        .expect("Failed to store domain policy");
}

/// Extracts the host of a mock server's URI
fn host_of(base_url: &str) -> String {
    url::Url::parse(base_url)
        .expect("Failed to parse base URL")
        .host_str()
        .expect("Failed to extract host")
        .to_string()
}

fn html_page(title: &str, body: &str) -> String {
    format!(
        r#"<html><head><title>{}</title></head><body>{}</body></html>"#,
        title, body
    )
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    // Start a mock server
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Mock index page with links
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page(
                    "Home",
                    &format!(
                        r#"<a href="{}/page1">Page 1</a><a href="{}/page2">Page 2</a>"#,
                        base_url, base_url
                    ),
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page("Page 1", "Content 1"))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page("Page 2", "Content 2"))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    // Create test storage paths
    let db_path = format!("/tmp/test_full_crawl_{}.db", std::process::id());
    let blob_path = format!("/tmp/test_full_crawl_blobs_{}", std::process::id());
    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_dir_all(&blob_path);

    let config = create_test_config(&db_path, &blob_path);
    let runtime = CrawlRuntime::new(config).expect("Failed to create runtime");
    install_fast_policy(&runtime, &host_of(&base_url));

    let file = campaign_file("full crawl", vec![format!("{}/", base_url)], 10, true);
    let campaign_id = runtime
        .submit_campaign(&file)
        .await
        .expect("Failed to submit campaign");
    runtime.run_until_idle().await.expect("Crawl failed");

    // Verify results
    let storage = runtime.storage();
    let store = storage.lock().unwrap();
    let campaign = store.get_campaign(campaign_id).expect("Failed to load campaign");

    // All three pages fit the budget, so the frontier ran dry
    assert_eq!(campaign.status, CampaignStatus::Completed);
    assert_eq!(campaign.pages_collected, 3);
    assert_eq!(campaign.tasks_inflight, 0);
    assert!(campaign.finished_at.is_some());

    let success = store
        .count_pages_by_status(campaign_id, PageStatus::Success)
        .expect("Failed to count pages");
    assert_eq!(success, 3);

    // Clean up
    drop(store);
    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_dir_all(&blob_path);
}

#[tokio::test]
async fn test_campaign_stops_at_page_budget() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // A chain of pages: / -> page1 -> page2, budget of two
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page(
                    "Root",
                    &format!(r#"<a href="{}/page1">Next</a>"#, base_url),
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page(
                    "Page 1",
                    &format!(r#"<a href="{}/page2">Next</a>"#, base_url),
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    // The budget is spent before page2 can be dispatched
    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page("Page 2", "Too far"))
                .insert_header("content-type", "text/html"),
        )
        .expect(0)
        .mount(&mock_server)
        .await;

    let db_path = format!("/tmp/test_budget_{}.db", std::process::id());
    let blob_path = format!("/tmp/test_budget_blobs_{}", std::process::id());
    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_dir_all(&blob_path);

    let config = create_test_config(&db_path, &blob_path);
    let runtime = CrawlRuntime::new(config).expect("Failed to create runtime");
    install_fast_policy(&runtime, &host_of(&base_url));

    let file = campaign_file("budget", vec![format!("{}/", base_url)], 2, true);
    let campaign_id = runtime
        .submit_campaign(&file)
        .await
        .expect("Failed to submit campaign");
    runtime.run_until_idle().await.expect("Crawl failed");

    let storage = runtime.storage();
    let store = storage.lock().unwrap();
    let campaign = store.get_campaign(campaign_id).expect("Failed to load campaign");
    assert_eq!(campaign.status, CampaignStatus::Completed);
    assert_eq!(campaign.pages_collected, 2);

    drop(store);
    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_dir_all(&blob_path);
}

#[tokio::test]
async fn test_links_outside_scope_are_ignored() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // The index links to one same-host page and one foreign domain
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page(
                    "Home",
                    &format!(
                        r#"<a href="{}/inside">In scope</a>
                        <a href="https://elsewhere.example/outside">Out of scope</a>"#,
                        base_url
                    ),
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/inside"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page("Inside", "Scoped content"))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let db_path = format!("/tmp/test_scope_{}.db", std::process::id());
    let blob_path = format!("/tmp/test_scope_blobs_{}", std::process::id());
    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_dir_all(&blob_path);

    let config = create_test_config(&db_path, &blob_path);
    let runtime = CrawlRuntime::new(config).expect("Failed to create runtime");
    install_fast_policy(&runtime, &host_of(&base_url));

    let file = campaign_file("scope", vec![format!("{}/", base_url)], 10, true);
    let campaign_id = runtime
        .submit_campaign(&file)
        .await
        .expect("Failed to submit campaign");
    runtime.run_until_idle().await.expect("Crawl failed");

    let storage = runtime.storage();
    let store = storage.lock().unwrap();
    let campaign = store.get_campaign(campaign_id).expect("Failed to load campaign");

    // Only the index and the in-scope link were crawled; the foreign
    // URL never entered the frontier
    assert_eq!(campaign.status, CampaignStatus::Completed);
    assert_eq!(campaign.pages_collected, 2);
    assert_eq!(
        store.pending_frontier_count(campaign_id).unwrap(),
        0,
        "Foreign link must not be admitted"
    );

    drop(store);
    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_dir_all(&blob_path);
}

#[tokio::test]
async fn test_blocked_page_does_not_fail_campaign() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page("Fine", "Regular content"))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    // The default retry budget is three, so the blocked URL is
    // attempted four times before the outcome is recorded
    Mock::given(method("GET"))
        .and(path("/blocked"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let db_path = format!("/tmp/test_blocked_{}.db", std::process::id());
    let blob_path = format!("/tmp/test_blocked_blobs_{}", std::process::id());
    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_dir_all(&blob_path);

    let config = create_test_config(&db_path, &blob_path);
    let runtime = CrawlRuntime::new(config).expect("Failed to create runtime");
    install_fast_policy(&runtime, &host_of(&base_url));

    let file = campaign_file(
        "blocked",
        vec![format!("{}/ok", base_url), format!("{}/blocked", base_url)],
        10,
        false,
    );
    let campaign_id = runtime
        .submit_campaign(&file)
        .await
        .expect("Failed to submit campaign");
    runtime.run_until_idle().await.expect("Crawl failed");

    let storage = runtime.storage();
    let store = storage.lock().unwrap();
    let campaign = store.get_campaign(campaign_id).expect("Failed to load campaign");

    // The block is recorded but the campaign still completes; only the
    // clean page counts toward the budget
    assert_eq!(campaign.status, CampaignStatus::Completed);
    assert_eq!(campaign.pages_collected, 1);
    assert_eq!(campaign.consecutive_failures, 0);

    let blocked = store
        .count_pages_by_status(campaign_id, PageStatus::Blocked)
        .expect("Failed to count pages");
    assert_eq!(blocked, 1);

    drop(store);
    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_dir_all(&blob_path);
}

#[tokio::test]
async fn test_fetch_errors_fail_campaign_at_threshold() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Plain 500s are definite errors, not blocks, so they feed the
    // failure streak
    Mock::given(method("GET"))
        .and(path("/err1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/err2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let db_path = format!("/tmp/test_threshold_{}.db", std::process::id());
    let blob_path = format!("/tmp/test_threshold_blobs_{}", std::process::id());
    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_dir_all(&blob_path);

    let mut config = create_test_config(&db_path, &blob_path);
    config.worker.max_consecutive_failures = Some(2);

    let runtime = CrawlRuntime::new(config).expect("Failed to create runtime");
    install_fast_policy(&runtime, &host_of(&base_url));

    let file = campaign_file(
        "threshold",
        vec![format!("{}/err1", base_url), format!("{}/err2", base_url)],
        10,
        false,
    );
    let campaign_id = runtime
        .submit_campaign(&file)
        .await
        .expect("Failed to submit campaign");
    runtime.run_until_idle().await.expect("Crawl failed");

    let storage = runtime.storage();
    let store = storage.lock().unwrap();
    let campaign = store.get_campaign(campaign_id).expect("Failed to load campaign");
    assert_eq!(campaign.status, CampaignStatus::Failed);
    assert!(campaign.finished_at.is_some());

    let failed = store
        .count_pages_by_status(campaign_id, PageStatus::Failed)
        .expect("Failed to count pages");
    assert_eq!(failed, 2);

    drop(store);
    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_dir_all(&blob_path);
}

#[tokio::test]
async fn test_pause_keeps_inflight_work_and_stops_expansion() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page(
                    "Home",
                    &format!(r#"<a href="{}/page1">Next</a>"#, base_url),
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    // Expansion is suppressed while paused, so the link is never pulled
    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page("Page 1", "Never reached"))
                .insert_header("content-type", "text/html"),
        )
        .expect(0)
        .mount(&mock_server)
        .await;

    let db_path = format!("/tmp/test_pause_{}.db", std::process::id());
    let blob_path = format!("/tmp/test_pause_blobs_{}", std::process::id());
    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_dir_all(&blob_path);

    let config = create_test_config(&db_path, &blob_path);
    let runtime = CrawlRuntime::new(config).expect("Failed to create runtime");
    install_fast_policy(&runtime, &host_of(&base_url));

    let file = campaign_file("pause", vec![format!("{}/", base_url)], 10, true);
    let campaign_id = runtime
        .submit_campaign(&file)
        .await
        .expect("Failed to submit campaign");

    // Pause lands while the seed is in flight
    runtime.pause_campaign(campaign_id).expect("Failed to pause");
    runtime.run_until_idle().await.expect("Crawl failed");

    {
        let storage = runtime.storage();
        let store = storage.lock().unwrap();
        let campaign = store.get_campaign(campaign_id).expect("Failed to load campaign");

        // The in-flight fetch was still recorded
        assert_eq!(campaign.status, CampaignStatus::Paused);
        assert_eq!(campaign.pages_collected, 1);
        assert_eq!(campaign.tasks_inflight, 0);
    }

    // Resuming a drained campaign completes it on the spot
    runtime
        .resume_campaign(campaign_id)
        .await
        .expect("Failed to resume");

    let storage = runtime.storage();
    let store = storage.lock().unwrap();
    let campaign = store.get_campaign(campaign_id).expect("Failed to load campaign");
    assert_eq!(campaign.status, CampaignStatus::Completed);
    assert_eq!(campaign.pages_collected, 1);

    drop(store);
    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_dir_all(&blob_path);
}

#[tokio::test]
async fn test_duplicate_links_fetched_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Both the index and page1 link to /shared
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page(
                    "Home",
                    &format!(
                        r#"<a href="{}/page1">Page 1</a><a href="{}/shared">Shared</a>"#,
                        base_url, base_url
                    ),
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page(
                    "Page 1",
                    &format!(r#"<a href="{}/shared">Shared again</a>"#, base_url),
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/shared"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(html_page("Shared", "Fetched once"))
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let db_path = format!("/tmp/test_dedup_{}.db", std::process::id());
    let blob_path = format!("/tmp/test_dedup_blobs_{}", std::process::id());
    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_dir_all(&blob_path);

    let config = create_test_config(&db_path, &blob_path);
    let runtime = CrawlRuntime::new(config).expect("Failed to create runtime");
    install_fast_policy(&runtime, &host_of(&base_url));

    let file = campaign_file("dedup", vec![format!("{}/", base_url)], 10, true);
    let campaign_id = runtime
        .submit_campaign(&file)
        .await
        .expect("Failed to submit campaign");
    runtime.run_until_idle().await.expect("Crawl failed");

    let storage = runtime.storage();
    let store = storage.lock().unwrap();
    let campaign = store.get_campaign(campaign_id).expect("Failed to load campaign");
    assert_eq!(campaign.status, CampaignStatus::Completed);
    assert_eq!(campaign.pages_collected, 3);

    drop(store);
    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_dir_all(&blob_path);
}
