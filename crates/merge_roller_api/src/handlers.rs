//! HTTP request handlers
//!
//! - `POST /api/github/hook` receives webhook deliveries
//! - `GET /api/health` is the liveness probe

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::{
    errors::ApiError,
    events::{handle_event, Disposition},
    signature::{verify_signature, SIGNATURE_HEADER},
    AppState,
};

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;

/// Header naming the event type of a delivery.
pub const EVENT_HEADER: &str = "x-github-event";

/// Header carrying the unique id of a delivery.
pub const DELIVERY_HEADER: &str = "x-github-delivery";

/// POST /api/github/hook
///
/// Verifies and evaluates a webhook delivery. Answers `200 OK` once the event has been
/// evaluated and `202 Accepted` for events the bot does not react to. Merges and updates
/// started by the delivery keep running after the response is sent.
#[instrument(skip_all, fields(event, delivery))]
pub async fn github_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    if let Some(secret) = &state.webhook_secret {
        let signature = header_value(&headers, SIGNATURE_HEADER).unwrap_or_default();
        if !verify_signature(&body, signature, secret.as_bytes()) {
            return Err(ApiError::InvalidSignature);
        }
    }

    let event =
        header_value(&headers, EVENT_HEADER).ok_or(ApiError::MissingHeader("X-GitHub-Event"))?;
    let span = tracing::Span::current();
    span.record("event", event);
    if let Some(delivery) = header_value(&headers, DELIVERY_HEADER) {
        span.record("delivery", delivery);
    }

    match handle_event(&state, event, &body).await? {
        Disposition::Ignored => Ok(StatusCode::ACCEPTED),
        Disposition::Processed(tasks) => {
            info!(started = tasks.len(), "Processed webhook delivery");
            Ok(StatusCode::OK)
        }
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

/// GET /api/health
///
/// Returns service health status with version and timestamp.
pub async fn health_check() -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckResponse {
    /// Service status
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Current timestamp (ISO 8601)
    pub timestamp: String,
}
