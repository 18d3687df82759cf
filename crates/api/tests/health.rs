//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{body_json, get, post_raw, success_outcome, CountingRunner};

fn app() -> axum::Router {
    let config = common::test_config(&std::env::temp_dir(), Duration::from_secs(30));
    common::build_test_app(config, CountingRunner::new(success_outcome()))
}

// ---------------------------------------------------------------------------
// Test: GET /health returns 200 with the exact status body
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_healthy() {
    let response = get(app(), "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json, serde_json::json!({ "status": "healthy" }));
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let response = get(app(), "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: GET /execute is not allowed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn execute_rejects_get() {
    let response = get(app(), "/execute").await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let response = get(app(), "/health").await;

    assert_eq!(response.status(), StatusCode::OK);

    let request_id = response.headers().get("x-request-id");
    assert!(
        request_id.is_some(),
        "Response must contain an x-request-id header"
    );

    // The value should be a valid UUID (36 chars with hyphens).
    let id_str = request_id.unwrap().to_str().unwrap();
    assert_eq!(id_str.len(), 36, "x-request-id should be a UUID string");
}

// ---------------------------------------------------------------------------
// Test: Oversized bodies are refused with a JSON error before validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn oversized_body_is_rejected() {
    let mut config = common::test_config(&std::env::temp_dir(), Duration::from_secs(30));
    config.max_body_bytes = 64;
    let runner = CountingRunner::new(success_outcome());
    let app = common::build_test_app(config, runner.clone());

    let body = format!(r#"{{"script": "def main():\n    return '{}'"}}"#, "x".repeat(256));
    let response = post_raw(app, "/execute", Some("application/json"), body).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    let json = body_json(response).await;
    let message = json["error"].as_str().expect("JSON error body");
    assert!(message.contains("length limit"), "error: {message}");
    assert_eq!(runner.launches(), 0);
}
