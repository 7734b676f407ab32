//! Tests for routes module

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use tower::ServiceExt;
use wiremock::MockServer;

use crate::testing::test_state;

#[tokio::test]
async fn test_health_route() {
    let mock_server = MockServer::start().await;
    let app = create_router(test_state(&mock_server, None));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_hook_only_accepts_post() {
    let mock_server = MockServer::start().await;
    let app = create_router(test_state(&mock_server, None));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/github/hook")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let mock_server = MockServer::start().await;
    let app = create_router(test_state(&mock_server, None));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/repositories")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
