//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint against a canned
//! transport.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use fetch_cache::{api::create_router, AppState, CacheManager, FetchError, Transport};
use serde_json::{json, Value};
use tower::ServiceExt;

const DATA_URL: &str = "https://api.test.com/data";
const BROKEN_URL: &str = "https://api.test.com/broken";

// == Helper Functions ==

/// Serves fixed JSON bodies after a short delay and counts calls.
struct CannedTransport {
    responses: HashMap<String, Value>,
    calls: AtomicUsize,
}

impl CannedTransport {
    fn new() -> Self {
        let mut responses = HashMap::new();
        responses.insert(DATA_URL.to_string(), json!({"test": "data"}));
        Self {
            responses,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for CannedTransport {
    async fn retrieve(&self, key: &str) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;

        self.responses
            .get(key)
            .cloned()
            .ok_or_else(|| FetchError::Transport("Network error".to_string()))
    }
}

fn create_test_app() -> (Router, Arc<CannedTransport>) {
    let transport = Arc::new(CannedTransport::new());
    let cache = CacheManager::new(transport.clone());
    (create_router(AppState::new(cache)), transport)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn with_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn key_uri(path: &str, key: &str) -> String {
    format!("{}?key={}", path, key)
}

// == SET / GET Endpoint Tests ==

#[tokio::test]
async fn test_set_then_get() {
    let (app, _) = create_test_app();

    let (status, json) = send(
        &app,
        with_json("PUT", "/set", json!({"key": "a", "value": {"x": 1}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["message"].as_str().unwrap().contains("a"));
    assert_eq!(json["key"], "a");
    assert_eq!(json["size"], 7);

    let (status, json) = send(&app, get(&key_uri("/get", "a"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "a");
    assert_eq!(json["data"], json!({"x": 1}));
}

#[tokio::test]
async fn test_set_overwrites() {
    let (app, _) = create_test_app();

    send(&app, with_json("PUT", "/set", json!({"key": "k", "value": "old"}))).await;
    send(&app, with_json("PUT", "/set", json!({"key": "k", "value": "new"}))).await;

    let (_, json) = send(&app, get(&key_uri("/get", "k"))).await;
    assert_eq!(json["data"], "new");
}

#[tokio::test]
async fn test_get_endpoint_not_found() {
    let (app, _) = create_test_app();

    let (status, json) = send(&app, get(&key_uri("/get", "nonexistent"))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("nonexistent"));
}

// == FETCH Endpoint Tests ==

#[tokio::test]
async fn test_fetch_retrieves_then_serves_from_cache() {
    let (app, transport) = create_test_app();

    let (status, json) = send(&app, get(&key_uri("/fetch", DATA_URL))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], json!({"test": "data"}));
    assert_eq!(json["cached"], false);

    let (status, json) = send(&app, get(&key_uri("/fetch", DATA_URL))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], json!({"test": "data"}));
    assert_eq!(json["cached"], true);

    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_fetches_share_one_retrieval() {
    let (app, transport) = create_test_app();
    let uri = key_uri("/fetch", DATA_URL);

    let ((status1, json1), (status2, json2)) =
        tokio::join!(send(&app, get(&uri)), send(&app, get(&uri)));

    assert_eq!(status1, StatusCode::OK);
    assert_eq!(status2, StatusCode::OK);
    assert_eq!(json1["data"], json2["data"]);
    assert_eq!(transport.calls(), 1);

    let (_, stats) = send(&app, get("/stats")).await;
    assert_eq!(stats["fetches"], 1);
    assert_eq!(stats["coalesced"], 1);
}

#[tokio::test]
async fn test_fetch_failure_leaves_cache_empty() {
    let (app, _) = create_test_app();

    let (status, json) = send(&app, get(&key_uri("/fetch", BROKEN_URL))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["error"].as_str().unwrap().contains("Network error"));

    let (status, _) = send(&app, get(&key_uri("/get", BROKEN_URL))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// == PRELOAD Endpoint Tests ==

#[tokio::test]
async fn test_preload_populates_cache() {
    let (app, transport) = create_test_app();

    let (status, _) = send(&app, with_json("POST", "/preload", json!({"key": DATA_URL}))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(&app, get(&key_uri("/fetch", DATA_URL))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["cached"], true);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn test_preload_failure() {
    let (app, _) = create_test_app();

    let (status, json) =
        send(&app, with_json("POST", "/preload", json!({"key": BROKEN_URL}))).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json.get("error").is_some());
}

// == EXPORT / IMPORT Endpoint Tests ==

#[tokio::test]
async fn test_export_import_between_servers() {
    let (source, _) = create_test_app();
    send(&source, with_json("PUT", "/set", json!({"key": "a", "value": {"x": 1}}))).await;

    let (status, snapshot) = send(&source, get("/export")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot[0][0], "a");
    assert_eq!(snapshot[0][1]["data"], json!({"x": 1}));
    assert_eq!(snapshot[0][1]["size"], 7);

    let (target, _) = create_test_app();
    let request = Request::builder()
        .method("POST")
        .uri("/import")
        .body(Body::from(snapshot.to_string()))
        .unwrap();
    let (status, json) = send(&target, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["entries"], 1);

    let (status, json) = send(&target, get(&key_uri("/get", "a"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], json!({"x": 1}));

    let (status, _) = send(&target, get(&key_uri("/get", "b"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_import_malformed_snapshot_keeps_current_cache() {
    let (app, _) = create_test_app();
    send(&app, with_json("PUT", "/set", json!({"key": "kept", "value": 1}))).await;

    let request = Request::builder()
        .method("POST")
        .uri("/import")
        .body(Body::from("[[\"a\""))
        .unwrap();
    let (status, json) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Invalid snapshot"));

    let (status, _) = send(&app, get(&key_uri("/get", "kept"))).await;
    assert_eq!(status, StatusCode::OK);
}

// == CLEAR Endpoint Tests ==

#[tokio::test]
async fn test_clear_endpoint() {
    let (app, transport) = create_test_app();
    send(&app, get(&key_uri("/fetch", DATA_URL))).await;
    send(&app, with_json("PUT", "/set", json!({"key": "other", "value": true}))).await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/clear")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, get(&key_uri("/get", "other"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A cleared key is retrieved again
    let (_, json) = send(&app, get(&key_uri("/fetch", DATA_URL))).await;
    assert_eq!(json["cached"], false);
    assert_eq!(transport.calls(), 2);
}

// == STATS Endpoint Tests ==

#[tokio::test]
async fn test_stats_endpoint() {
    let (app, _) = create_test_app();

    send(&app, with_json("PUT", "/set", json!({"key": "s", "value": "v"}))).await;
    send(&app, get(&key_uri("/get", "s"))).await; // hit
    send(&app, get(&key_uri("/get", "missing"))).await; // miss

    let (status, json) = send(&app, get("/stats")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["hits"], 1);
    assert_eq!(json["misses"], 1);
    assert_eq!(json["total_entries"], 1);
    assert_eq!(json["total_bytes"], 3);
    assert_eq!(json["max_size_bytes"], 50 * 1024 * 1024);
    assert_eq!(json["hit_rate"], 0.5);
}

// == HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let (app, _) = create_test_app();

    let (status, json) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json.get("timestamp").is_some());
}

// == Error Response Tests ==

#[tokio::test]
async fn test_invalid_json_request() {
    let (app, _) = create_test_app();

    let request = Request::builder()
        .method("PUT")
        .uri("/set")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_empty_key_request() {
    let (app, _) = create_test_app();

    let (status, json) = send(&app, with_json("PUT", "/set", json!({"key": "", "value": 1}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json.get("error").is_some());

    let (status, _) = send(&app, get("/fetch?key=")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
