//! Integration tests for the HTTP API over a real listener.

mod support;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use patent_bundler::BundleService;
use patent_bundler::server::{AppState, ClientRateLimiter, router, serve_on};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use wiremock::MockServer;

use support::{config_for, entries_in, mount_patent};

const ORIGIN: &str = "http://localhost:5173";

/// A running API server; shuts down when dropped.
struct TestApi {
    base: String,
    client: reqwest::Client,
    _shutdown: oneshot::Sender<()>,
}

impl TestApi {
    async fn start(site: &MockServer, root: &Path, limiter: ClientRateLimiter) -> Self {
        let service = BundleService::new(&config_for(site, root)).unwrap();
        let state = AppState::new(Arc::new(service), Arc::new(limiter));
        let app = router(state, ORIGIN).unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            let shutdown = async {
                let _ = rx.await;
            };
            serve_on(listener, app, shutdown).await.unwrap();
        });

        Self {
            base: format!("http://{addr}"),
            client: reqwest::Client::new(),
            _shutdown: tx,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    async fn post_bundle(&self, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/bundle"))
            .json(&body)
            .send()
            .await
            .unwrap()
    }
}

fn unlimited() -> ClientRateLimiter {
    ClientRateLimiter::disabled()
}

fn header<'a>(response: &'a reqwest::Response, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .unwrap_or_else(|| panic!("missing header {name}"))
        .to_str()
        .unwrap()
}

async fn wait_until_empty(root: &Path) -> usize {
    for _ in 0..50 {
        if entries_in(root) == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    entries_in(root)
}

#[tokio::test]
async fn test_health_reports_service() {
    let site = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let api = TestApi::start(&site, root.path(), unlimited()).await;

    let response = api.client.get(api.url("/api/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["service"], "patent-bundler");
    assert!(body["time"].as_str().is_some_and(|t| t.ends_with("GMT")));
}

#[tokio::test]
async fn test_bundle_streams_zip_with_download_headers() {
    let site = MockServer::start().await;
    mount_patent(&site, "US11162431B2").await;
    let root = TempDir::new().unwrap();
    let api = TestApi::start(&site, root.path(), unlimited()).await;

    let response = api
        .post_bundle(json!({ "text": "Please fetch US 11,162,431 B2." }))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header(&response, "content-type"), "application/zip");
    assert_eq!(header(&response, "cache-control"), "no-store");
    assert_eq!(header(&response, "x-tokens-truncated"), "false");
    let disposition = header(&response, "content-disposition");
    assert!(
        disposition.starts_with("attachment; filename=\"patent_bundle_")
            && disposition.ends_with(".zip\""),
        "{disposition}"
    );

    let body = response.bytes().await.unwrap();
    assert!(body.starts_with(b"PK"));
    assert_eq!(wait_until_empty(root.path()).await, 0);
}

#[tokio::test]
async fn test_bundle_accepts_patents_array() {
    let site = MockServer::start().await;
    mount_patent(&site, "US11162431B2").await;
    mount_patent(&site, "EP1234567B1").await;
    let root = TempDir::new().unwrap();
    let api = TestApi::start(&site, root.path(), unlimited()).await;

    let response = api
        .post_bundle(json!({
            "text": "ignored when patents is present",
            "patents": ["US11162431B2", "EP1234567B1"]
        }))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = response.bytes().await.unwrap();
    let archive = zip::ZipArchive::new(std::io::Cursor::new(body.to_vec())).unwrap();
    let mut names: Vec<&str> = archive.file_names().collect();
    names.sort_unstable();
    assert_eq!(names, ["EP1234567B1.pdf", "US11162431B2.pdf", "manifest.csv"]);
}

#[tokio::test]
async fn test_bundle_without_identifiers_is_bad_request() {
    let site = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let api = TestApi::start(&site, root.path(), unlimited()).await;

    let response = api.post_bundle(json!({ "text": "nothing to see here" })).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body,
        json!({ "error": "No patent identifiers found.", "code": "NO_TOKENS" })
    );
}

#[tokio::test]
async fn test_bundle_missing_text_is_bad_request() {
    let site = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let api = TestApi::start(&site, root.path(), unlimited()).await;

    let response = api.post_bundle(json!({})).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["code"], "NO_TOKENS");
}

#[tokio::test]
async fn test_bundle_with_no_documents_is_not_found() {
    let site = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let api = TestApi::start(&site, root.path(), unlimited()).await;

    let response = api
        .post_bundle(json!({ "text": "US1111111, US2222222" }))
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No PDFs could be resolved.");
    assert_eq!(body["code"], "NO_PDFS");
    let details = body["details"].as_array().unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details[0]["token"], "US1111111");
    assert_eq!(details[0]["code"], "RESOLVE_FAIL");
    assert_eq!(details[1]["token"], "US2222222");
    assert_eq!(entries_in(root.path()), 0);
}

#[tokio::test]
async fn test_rate_limit_rejects_excess_bundle_requests() {
    let site = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let limiter = ClientRateLimiter::new(1, Duration::from_secs(60));
    let api = TestApi::start(&site, root.path(), limiter).await;

    let first = api.post_bundle(json!({ "text": "no ids" })).await;
    assert_eq!(first.status(), StatusCode::BAD_REQUEST);

    let second = api.post_bundle(json!({ "text": "no ids" })).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = header(&second, "retry-after").parse().unwrap();
    assert!((1..=60).contains(&retry_after));
    let body: Value = second.json().await.unwrap();
    assert_eq!(body["code"], "RATE_LIMITED");

    let health = api.client.get(api.url("/api/health")).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend_origin() {
    let site = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let api = TestApi::start(&site, root.path(), unlimited()).await;

    let response = api
        .client
        .request(reqwest::Method::OPTIONS, api.url("/api/bundle"))
        .header("Origin", ORIGIN)
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .unwrap();

    assert!(response.status().is_success());
    assert_eq!(header(&response, "access-control-allow-origin"), ORIGIN);
}

#[tokio::test]
async fn test_cors_ignores_other_origins() {
    let site = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let api = TestApi::start(&site, root.path(), unlimited()).await;

    let response = api
        .client
        .get(api.url("/api/health"))
        .header("Origin", "https://evil.example")
        .send()
        .await
        .unwrap();

    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let site = MockServer::start().await;
    let root = TempDir::new().unwrap();
    let api = TestApi::start(&site, root.path(), unlimited()).await;

    let text = "x".repeat(2 * 1024 * 1024);
    let response = api.post_bundle(json!({ "text": text })).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}
