//! Tests for handlers module

use super::*;
use axum::{body::Body, http::Request};
use http_body_util::BodyExt;
use serde_json::json;
use tower::ServiceExt;
use wiremock::MockServer;

use crate::routes::create_router;
use crate::testing::{sign, test_state};

const SECRET: &str = "webhook-secret";

fn delivery(event: &str, body: &[u8], signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/github/hook")
        .header("content-type", "application/json")
        .header(EVENT_HEADER, event)
        .header(DELIVERY_HEADER, "72d3162e-cc78-11e3-81ab-4c9367dc0958");
    if let Some(signature) = signature {
        builder = builder.header(SIGNATURE_HEADER, signature);
    }
    builder.body(Body::from(body.to_vec())).unwrap()
}

#[tokio::test]
async fn test_health_check_returns_json() {
    let response = health_check().await;

    assert_eq!(response.0.status, "healthy");
    assert_eq!(response.0.version, Some(env!("CARGO_PKG_VERSION").to_string()));
    assert!(chrono::DateTime::parse_from_rfc3339(&response.0.timestamp).is_ok());
}

#[tokio::test]
async fn test_signed_ping_is_accepted() {
    let mock_server = MockServer::start().await;
    let app = create_router(test_state(&mock_server, Some(SECRET)));
    let body = br#"{"zen":"Keep it logically awesome.","hook_id":1}"#;

    let response = app
        .oneshot(delivery("ping", body, sign(body, SECRET.as_bytes())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_bad_signature_is_rejected() {
    let mock_server = MockServer::start().await;
    let app = create_router(test_state(&mock_server, Some(SECRET)));
    let body = br#"{"zen":"Keep it logically awesome."}"#;

    let response = app
        .oneshot(delivery("ping", body, sign(body, b"wrong secret")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let error: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(error["error"]["code"], "InvalidSignature");
}

#[tokio::test]
async fn test_missing_signature_is_rejected_when_secret_is_configured() {
    let mock_server = MockServer::start().await;
    let app = create_router(test_state(&mock_server, Some(SECRET)));

    let response = app.oneshot(delivery("ping", b"{}", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unsigned_delivery_is_accepted_without_secret() {
    let mock_server = MockServer::start().await;
    let app = create_router(test_state(&mock_server, None));

    let response = app.oneshot(delivery("ping", b"{}", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unhandled_event_is_accepted_without_work() {
    let mock_server = MockServer::start().await;
    let app = create_router(test_state(&mock_server, None));
    let body = serde_json::to_vec(&json!({ "action": "published" })).unwrap();

    let response = app.oneshot(delivery("release", &body, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_event_header_is_a_bad_request() {
    let mock_server = MockServer::start().await;
    let app = create_router(test_state(&mock_server, None));
    let request = Request::builder()
        .method("POST")
        .uri("/api/github/hook")
        .body(Body::from("{}"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_payload_is_a_bad_request() {
    let mock_server = MockServer::start().await;
    let app = create_router(test_state(&mock_server, None));

    let response = app
        .oneshot(delivery("pull_request", b"not json", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
