//! HTTP routing configuration
//!
//! - POST   /api/github/hook - GitHub webhook deliveries
//! - GET    /api/health      - Health check

use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{handlers, AppState};

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;

/// Requests are cut off after this long; GitHub itself gives up after ten seconds.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Create the complete API router with all routes configured.
pub fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new())
        .on_response(DefaultOnResponse::new());

    let api = Router::new()
        .route("/github/hook", post(handlers::github_webhook))
        .route("/health", get(handlers::health_check))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(trace_layer)
        .with_state(state);

    Router::new().nest("/api", api)
}
