//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycles through the gateway router against a
//! scripted upstream.

mod common;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use resilient_gateway::{api::create_router, client::ApiResponse, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{context_with_threshold, fast_client_config, ok, status, ScriptedTransport};

// == Helper Functions ==

fn create_test_app(transport: Arc<ScriptedTransport>, failure_threshold: u32) -> Router {
    let state = AppState::with_transport(
        transport,
        context_with_threshold(failure_threshold),
        fast_client_config(0),
    );
    create_router(state)
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    match body {
        Some(json) => send_raw(app, method, uri, Some("application/json"), json).await,
        None => send_raw(app, method, uri, None, "").await,
    }
}

async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    content_type: Option<&str>,
    body: &str,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }

    let response = app
        .clone()
        .oneshot(builder.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_to_json(response.into_body()).await)
}

// == HEALTH Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(ScriptedTransport::new([]), 5);

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert!(json["timestamp"].is_string());
}

// == PROXY Endpoint Tests ==

#[tokio::test]
async fn test_proxy_get_returns_upstream_body_and_caches() {
    let transport = ScriptedTransport::new([ok(json!({"widgets": [1, 2]}))]);
    let app = create_test_app(transport.clone(), 5);

    let (status, json) = send(&app, "GET", "/proxy/api/widgets?page=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"widgets": [1, 2]}));

    let (status, json) = send(&app, "GET", "/proxy/api/widgets?page=1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"widgets": [1, 2]}));

    assert_eq!(transport.calls(), 1);
    assert_eq!(transport.requests()[0].url, "/api/widgets?page=1");
}

#[tokio::test]
async fn test_proxy_post_forwards_json_body() {
    let transport = ScriptedTransport::new([ok(json!({"id": 9}))]);
    let app = create_test_app(transport.clone(), 5);

    let (status, json) = send(&app, "POST", "/proxy/api/items", Some(r#"{"name":"bolt"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["id"], 9);
    assert_eq!(transport.requests()[0].body, Some(json!({"name": "bolt"})));
}

#[tokio::test]
async fn test_proxy_permanent_failure_keeps_upstream_status() {
    let transport = ScriptedTransport::new([status(404)]);
    let app = create_test_app(transport, 5);

    let (status, json) = send(&app, "GET", "/proxy/api/nothing", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "permanent");
}

#[tokio::test]
async fn test_proxy_exhausted_retries_is_bad_gateway() {
    let transport = ScriptedTransport::new([status(503)]);
    let app = create_test_app(transport, 5);

    let (status, json) = send(&app, "GET", "/proxy/api/flaky", None).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["kind"], "terminal");
}

#[tokio::test]
async fn test_proxy_write_keeps_upstream_success_status() {
    let transport = ScriptedTransport::new([
        Ok(ApiResponse::new(201, json!({"id": 4}))),
        Ok(ApiResponse::new(204, Value::Null)),
    ]);
    let app = create_test_app(transport, 5);

    let (status, json) = send(&app, "POST", "/proxy/api/items", Some(r#"{"name":"nut"}"#)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["id"], 4);

    let (status, json) = send(&app, "DELETE", "/proxy/api/items/4", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(json.is_null());
}

#[tokio::test]
async fn test_proxy_malformed_body_is_rejected_before_upstream() {
    let transport = ScriptedTransport::new([]);
    let app = create_test_app(transport.clone(), 5);

    let (status, json) = send(&app, "POST", "/proxy/api/items", Some(r#"{"name": "#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "invalid_body");

    let (status, _) = send_raw(&app, "PUT", "/proxy/api/items/1", Some("text/plain"), "name=a").await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (status, _) = send(&app, "PATCH", "/proxy/api/items/1", Some("{}")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    assert_eq!(transport.calls(), 0);
}

// == CIRCUITS Endpoint Tests ==

#[tokio::test]
async fn test_open_circuit_returns_service_unavailable_until_reset() {
    let transport = ScriptedTransport::new([status(500)]);
    let app = create_test_app(transport.clone(), 1);

    let (status, _) = send(&app, "GET", "/proxy/api/widgets", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, json) = send(&app, "GET", "/proxy/api/widgets?page=2", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["kind"], "circuit_open");
    assert_eq!(transport.calls(), 1);

    let (_, json) = send(&app, "GET", "/circuits", None).await;
    let circuit = &json["circuits"][0];
    assert_eq!(circuit["service"], "/api/widgets");
    assert_eq!(circuit["state"], "OPEN");
    assert_eq!(circuit["failure_count"], 1);
    assert!(circuit["retry_in_ms"].as_u64().unwrap() > 0);

    let (status, json) = send(
        &app,
        "POST",
        "/circuits/reset",
        Some(r#"{"service":"/api/widgets"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["service"], "/api/widgets");

    let (status, _) = send(&app, "GET", "/proxy/api/widgets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(transport.calls(), 2);
}

#[tokio::test]
async fn test_reset_without_body_resets_all() {
    let transport = ScriptedTransport::new([status(500), status(500)]);
    let app = create_test_app(transport, 1);

    send(&app, "GET", "/proxy/a", None).await;
    send(&app, "GET", "/proxy/b", None).await;
    let (_, json) = send(&app, "GET", "/circuits", None).await;
    assert_eq!(json["circuits"].as_array().unwrap().len(), 2);

    let (status, json) = send(&app, "POST", "/circuits/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["service"].is_null());

    let (_, json) = send(&app, "GET", "/circuits", None).await;
    assert!(json["circuits"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_reset_with_unreadable_body_leaves_circuits_open() {
    let transport = ScriptedTransport::new([status(500), status(500)]);
    let app = create_test_app(transport, 1);

    send(&app, "GET", "/proxy/a", None).await;
    send(&app, "GET", "/proxy/b", None).await;

    let (status, json) = send(&app, "POST", "/circuits/reset", Some(r#"{"service": "/a""#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "invalid_body");

    let (status, _) = send(&app, "POST", "/circuits/reset", Some(r#"{"service": 5}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send_raw(&app, "POST", "/circuits/reset", Some("text/plain"), "/a").await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let (_, json) = send(&app, "GET", "/circuits", None).await;
    let circuits = json["circuits"].as_array().unwrap();
    assert_eq!(circuits.len(), 2);
    assert!(circuits.iter().all(|c| c["state"] == "OPEN"));
}

#[tokio::test]
async fn test_reset_with_empty_object_resets_all() {
    let transport = ScriptedTransport::new([status(500)]);
    let app = create_test_app(transport, 1);

    send(&app, "GET", "/proxy/a", None).await;

    let (status, json) = send(&app, "POST", "/circuits/reset", Some("{}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["service"].is_null());

    let (_, json) = send(&app, "GET", "/circuits", None).await;
    assert!(json["circuits"].as_array().unwrap().is_empty());
}

// == ERRORS Endpoint Tests ==

#[tokio::test]
async fn test_errors_snapshot_and_drain() {
    let transport = ScriptedTransport::new([status(400)]);
    let app = create_test_app(transport, 5);

    send(&app, "PUT", "/proxy/api/items/1", Some("{}")).await;

    let (status, json) = send(&app, "GET", "/errors", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 1);
    assert_eq!(json["capacity"], 50);
    assert_eq!(json["errors"][0]["kind"], "permanent");
    assert_eq!(json["errors"][0]["status"], 400);
    assert_eq!(json["errors"][0]["url"], "/api/items/1");

    let (_, json) = send(&app, "DELETE", "/errors", None).await;
    assert_eq!(json["count"], 1);

    let (_, json) = send(&app, "GET", "/errors", None).await;
    assert_eq!(json["count"], 0);
}

// == CACHE / STATS Endpoint Tests ==

#[tokio::test]
async fn test_clear_single_url_and_stats() {
    let transport = ScriptedTransport::new([ok(json!(1)), ok(json!(2)), ok(json!(3))]);
    let app = create_test_app(transport.clone(), 5);

    send(&app, "GET", "/proxy/a", None).await;
    send(&app, "GET", "/proxy/b", None).await;
    send(&app, "GET", "/proxy/a", None).await;

    let (_, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(stats["size"], 2);
    assert_eq!(stats["keys"], json!(["/a", "/b"]));
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["misses"], 2);

    let (status, json) = send(&app, "DELETE", "/cache?url=/a", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["removed"], 1);

    let (_, json) = send(&app, "GET", "/proxy/a", None).await;
    assert_eq!(json, json!(3));
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn test_clear_whole_cache() {
    let transport = ScriptedTransport::new([]);
    let app = create_test_app(transport, 5);

    send(&app, "GET", "/proxy/a", None).await;
    send(&app, "GET", "/proxy/b", None).await;

    let (_, json) = send(&app, "DELETE", "/cache", None).await;
    assert_eq!(json["removed"], 2);

    let (_, stats) = send(&app, "GET", "/stats", None).await;
    assert_eq!(stats["size"], 0);
}
