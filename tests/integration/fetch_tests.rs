//! Integration tests for fetch execution
//!
//! These tests run the selector against wiremock servers to cover
//! classification over live sockets: clean pages, block statuses,
//! challenge bodies, and transport failures.

use seine::config::{
    BrowserConfig, Config, HttpConfig, ProxyConfig, StorageConfig, WorkerConfig,
};
use seine::fetch::{FetchSelector, FetchStatus};
use seine::policy::{AttemptPlan, FetchMethod};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a selector with the browser transport disabled
///
/// The selector never touches the storage paths, so dummy values are
/// fine here.
fn http_selector(extra_markers: Vec<String>) -> FetchSelector {
    FetchSelector::new(&Config {
        worker: WorkerConfig {
            count: 1,
            queue_redeliveries: 0,
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
            database_path: "unused.db".to_string(),
            blob_path: "unused-blobs".to_string(),
        },
        block_markers: extra_markers,
    })
}

fn http_plan() -> AttemptPlan {
    AttemptPlan {
        method: FetchMethod::Http,
        proxy: None,
        delay: Duration::ZERO,
        max_retries: 0,
        user_agent: None,
        block_resources: false,
        max_concurrency: 2,
    }
}

#[tokio::test]
async fn test_success_extracts_title_and_links() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    r#"<html><head><title>Widgets</title></head><body>
                    <a href="{}/catalog">Catalog</a>
                    <a href="/about">About</a>
                    </body></html>"#,
                    base_url
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let selector = http_selector(vec![]);
    let url = Url::parse(&format!("{}/", base_url)).unwrap();
    let outcome = selector.execute(&url, &http_plan()).await;

    assert_eq!(outcome.status, FetchStatus::Success);
    assert_eq!(outcome.http_status, Some(200));
    assert_eq!(outcome.title.as_deref(), Some("Widgets"));
    assert_eq!(outcome.method_used, FetchMethod::Http);
    assert!(!outcome.is_retryable());

    // Relative links come back absolute
    assert!(outcome.links.contains(&format!("{}/catalog", base_url)));
    assert!(outcome.links.contains(&format!("{}/about", base_url)));
}

#[tokio::test]
async fn test_block_status_classified() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/denied"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .mount(&mock_server)
        .await;

    let selector = http_selector(vec![]);
    let url = Url::parse(&format!("{}/denied", base_url)).unwrap();
    let outcome = selector.execute(&url, &http_plan()).await;

    assert_eq!(outcome.status, FetchStatus::Blocked);
    assert_eq!(outcome.http_status, Some(403));
    assert_eq!(outcome.error_message.as_deref(), Some("http status 403"));
    assert!(outcome.is_retryable());
}

#[tokio::test]
async fn test_challenge_body_with_ok_status() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Challenge pages answer 200, so the body scan has to catch them
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    "<html><head><title>Just a moment...</title></head><body></body></html>",
                )
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let selector = http_selector(vec![]);
    let url = Url::parse(&format!("{}/", base_url)).unwrap();
    let outcome = selector.execute(&url, &http_plan()).await;

    assert_eq!(outcome.status, FetchStatus::Blocked);
    assert_eq!(outcome.http_status, Some(200));
    assert_eq!(
        outcome.error_message.as_deref(),
        Some("challenge marker 'just a moment'")
    );
}

#[tokio::test]
async fn test_definite_error_is_not_retryable() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not found"))
        .mount(&mock_server)
        .await;

    let selector = http_selector(vec![]);
    let url = Url::parse(&format!("{}/missing", base_url)).unwrap();
    let outcome = selector.execute(&url, &http_plan()).await;

    assert_eq!(outcome.status, FetchStatus::Error);
    assert_eq!(outcome.http_status, Some(404));
    assert!(!outcome.is_retryable());
}

#[tokio::test]
async fn test_connection_refused_is_retryable_error() {
    // Bind a port, then free it so the connection is refused. The
    // dedicated builder server closes its listener on drop, unlike the
    // pooled `MockServer::start`, which keeps the port open for reuse.
    let mock_server = MockServer::builder().start().await;
    let base_url = mock_server.uri();
    drop(mock_server);

    let selector = http_selector(vec![]);
    let url = Url::parse(&format!("{}/", base_url)).unwrap();
    let outcome = selector.execute(&url, &http_plan()).await;

    assert_eq!(outcome.status, FetchStatus::Error);
    assert_eq!(outcome.http_status, None);
    assert!(outcome.is_retryable());
    assert!(outcome.error_message.is_some());
}

#[tokio::test]
async fn test_auto_without_browser_stays_on_http() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // A bare SPA shell would normally escalate to the browser
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"<html><body><div id="__next"></div></body></html>"#)
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let selector = http_selector(vec![]);
    let url = Url::parse(&format!("{}/", base_url)).unwrap();
    let mut plan = http_plan();
    plan.method = FetchMethod::Auto;
    let outcome = selector.execute(&url, &plan).await;

    assert_eq!(outcome.status, FetchStatus::Success);
    assert_eq!(outcome.method_used, FetchMethod::Http);
}

#[tokio::test]
async fn test_configured_marker_blocks_response() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body><p>Request quota exhausted.</p></body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let selector = http_selector(vec!["quota exhausted".to_string()]);
    let url = Url::parse(&format!("{}/", base_url)).unwrap();
    let outcome = selector.execute(&url, &http_plan()).await;

    assert_eq!(outcome.status, FetchStatus::Blocked);
    assert_eq!(
        outcome.error_message.as_deref(),
        Some("challenge marker 'quota exhausted'")
    );
}

#[tokio::test]
async fn test_plan_user_agent_overrides_default() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // The mock only answers the per-plan agent, not the config default
    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "PolicyAgent/2.0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><head><title>Agent check</title></head></html>")
                .insert_header("content-type", "text/html"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let selector = http_selector(vec![]);
    let url = Url::parse(&format!("{}/", base_url)).unwrap();
    let mut plan = http_plan();
    plan.user_agent = Some("PolicyAgent/2.0".to_string());
    let outcome = selector.execute(&url, &plan).await;

    assert_eq!(outcome.status, FetchStatus::Success);
    assert_eq!(outcome.title.as_deref(), Some("Agent check"));
}
