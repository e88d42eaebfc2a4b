//! HTTP tests for the daemon router, driven in-process with `tower::ServiceExt`.

use std::sync::Arc;

use axum::{body::Body, Router};
use binscan::{
    config::{self, InventoryConfig},
    daemon::{ErrorBody, GenerateQrResponse, InventoryDaemon},
    InventoryServiceImpl, TableStore,
};
use http::{header, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use serial_test::serial;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

const SCAN_BASE: &str = "http://10.0.0.5:3000/scan.html";

fn app(body: &str) -> (TempDir, Router) {
    let root = tempdir().unwrap();
    let path = root.path().join("inventory_data.csv");
    std::fs::write(&path, body).unwrap();
    let service = Arc::new(InventoryServiceImpl::new(TableStore::new(path)));
    let router = InventoryDaemon::new(service, SCAN_BASE).router();
    (root, router)
}

async fn call(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let response = router
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_skus_and_inventory() {
    let (_root, router) = app("Bin No.,WIDGET,GADGET\nA1,10,\nA2,1,2\n");

    let (status, skus) = call(&router, Method::GET, "/api/skus", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(skus, json!(["WIDGET", "GADGET"]));

    let (status, rows) = call(&router, Method::GET, "/api/inventory", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        rows,
        json!([
            {"Bin No.": "A1", "WIDGET": "10", "GADGET": ""},
            {"Bin No.": "A2", "WIDGET": "1", "GADGET": "2"}
        ])
    );
}

#[tokio::test]
async fn test_search_bins_accepts_string_or_number() {
    let (_root, router) = app("Bin No.,WIDGET\nA1,10\n");

    let (status, rows) = call(
        &router,
        Method::POST,
        "/api/search-bins",
        Some(json!({"sku": "WIDGET", "value": 5})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows, json!([{"Bin No.": "A1", "WIDGET": "10"}]));

    let (_, rows) = call(
        &router,
        Method::POST,
        "/api/search-bins",
        Some(json!({"sku": "WIDGET", "value": "10"})),
    )
    .await;
    assert_eq!(rows, json!([]));
}

#[tokio::test]
async fn test_search_bins_rejects_bad_threshold() {
    let (_root, router) = app("Bin No.,WIDGET\nA1,10\n");
    let (status, body) = call(
        &router,
        Method::POST,
        "/api/search-bins",
        Some(json!({"sku": "WIDGET", "value": "lots"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("lots"));
}

#[tokio::test]
async fn test_generate_qr() {
    let (_root, router) = app("Bin No.,WIDGET\nA1,10\n");
    let (status, body) = call(
        &router,
        Method::POST,
        "/api/generate-qr",
        Some(json!({"binNo": "A 1", "sku": "WIDGET", "value": "3"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let qr: GenerateQrResponse = serde_json::from_value(body).unwrap();
    assert!(qr.qr_code.starts_with("data:image/svg+xml;base64,"));
    assert_eq!(
        qr.scan_url,
        format!("{SCAN_BASE}?binNo=A%201&sku=WIDGET&value=3")
    );
}

#[tokio::test]
async fn test_generate_qr_rejects_non_positive_value() {
    let (_root, router) = app("Bin No.,WIDGET\nA1,10\n");
    let (status, body) = call(
        &router,
        Method::POST,
        "/api/generate-qr",
        Some(json!({"binNo": "A1", "sku": "WIDGET", "value": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let err: ErrorBody = serde_json::from_value(body).unwrap();
    assert!(err.error.contains("positive"));
}

#[tokio::test]
async fn test_generate_qr_too_large_is_500() {
    let (_root, router) = app("Bin No.,WIDGET\nA1,10\n");
    let (status, body) = call(
        &router,
        Method::POST,
        "/api/generate-qr",
        Some(json!({"binNo": "A1", "sku": "W".repeat(5000), "value": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let err: ErrorBody = serde_json::from_value(body).unwrap();
    assert!(err.error.contains("QR"));
}

#[tokio::test]
async fn test_process_scan_clamps() {
    let (root, router) = app("Bin No.,WIDGET\nA1,10\n");
    let (status, body) = call(
        &router,
        Method::POST,
        "/api/process-scan",
        Some(json!({"binNo": "A1", "sku": "WIDGET", "value": 15})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "binNo": "A1",
            "sku": "WIDGET",
            "previousValue": 10,
            "newValue": 0,
            "subtracted": 15
        })
    );
    let text = std::fs::read_to_string(root.path().join("inventory_data.csv")).unwrap();
    assert_eq!(text, "Bin No.,WIDGET\nA1,0\n");
}

#[tokio::test]
async fn test_process_scan_unknown_bin() {
    let (root, router) = app("Bin No.,WIDGET\nA1,10\n");
    let (status, body) = call(
        &router,
        Method::POST,
        "/api/process-scan",
        Some(json!({"binNo": "Z9", "sku": "WIDGET", "value": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Bin not found"}));
    let text = std::fs::read_to_string(root.path().join("inventory_data.csv")).unwrap();
    assert_eq!(text, "Bin No.,WIDGET\nA1,10\n");
}

#[tokio::test]
async fn test_process_scan_missing_field() {
    let (_root, router) = app("Bin No.,WIDGET\nA1,10\n");
    let (status, body) = call(
        &router,
        Method::POST,
        "/api/process-scan",
        Some(json!({"binNo": "A1", "value": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "missing field `sku`"}));
}

#[tokio::test]
async fn test_malformed_json_gets_error_body() {
    let (_root, router) = app("Bin No.,WIDGET\nA1,10\n");
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/process-scan")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let err: ErrorBody = serde_json::from_slice(&bytes).unwrap();
    assert!(!err.error.is_empty());
}

#[tokio::test]
async fn test_storage_failure_is_500() {
    let (root, router) = app("Bin No.,WIDGET\nA1,10\n");
    std::fs::write(root.path().join("inventory_data.csv"), "Bin No.,WIDGET\nA1,1,2\n").unwrap();
    let (status, body) = call(&router, Method::GET, "/api/inventory", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("malformed"));
}

#[tokio::test]
async fn test_process_scan_non_numeric_cell_is_500() {
    let body = "Bin No.,WIDGET\nA1,7 pcs\n";
    let (root, router) = app(body);
    let (status, reply) = call(
        &router,
        Method::POST,
        "/api/process-scan",
        Some(json!({"binNo": "A1", "sku": "WIDGET", "value": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(reply["error"].as_str().unwrap().contains("7 pcs"));
    assert_eq!(
        std::fs::read_to_string(root.path().join("inventory_data.csv")).unwrap(),
        body
    );
}

#[tokio::test]
async fn test_health() {
    let (root, router) = app("Bin No.,WIDGET\nA1,10\n");
    let (status, body) = call(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "bins": 1, "skus": 1}));

    std::fs::remove_file(root.path().join("inventory_data.csv")).unwrap();
    let (status, body) = call(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "degraded");
}

#[test]
#[serial]
fn test_global_config_installs_once() {
    let root = tempdir().unwrap();
    let path = root.path().join("binscan.toml");
    std::fs::write(&path, "port = 4100\ndata_file = \"stock.csv\"\n").unwrap();

    // the global is per process; tolerate a config installed by an earlier test
    match config::init_config(&path) {
        Ok(()) => {
            assert_eq!(config::listen_addr().port(), 4100);
            assert_eq!(config::data_file(), std::path::PathBuf::from("stock.csv"));
            assert_eq!(config::scan_base_url(), "http://localhost:4100/scan.html");
        }
        Err(e) => assert!(e.contains("already initialized")),
    }
    let err = config::set_config(InventoryConfig::default()).unwrap_err();
    assert!(err.contains("already initialized"));
}
