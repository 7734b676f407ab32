//! Error handling and HTTP error conversion
//!
//! Webhook deliveries fail with an [`ApiError`], which turns into a JSON error body with a
//! status code GitHub shows in the delivery log. Startup problems are reported through
//! [`ServerConfigError`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Standard error response for all API errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetails {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,
}

/// Errors raised while handling a webhook delivery.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Webhook signature is missing or does not match the payload")]
    InvalidSignature,

    #[error("Required header {0} is missing")]
    MissingHeader(&'static str),

    #[error("Failed to parse the {event} payload: {reason}")]
    InvalidPayload { event: String, reason: String },

    #[error("The event does not name an app installation")]
    MissingInstallation,

    #[error("GitHub request failed: {0}")]
    GitHub(#[from] github_client::Error),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::InvalidSignature => (StatusCode::UNAUTHORIZED, "InvalidSignature"),
            ApiError::MissingHeader(_) => (StatusCode::BAD_REQUEST, "MissingHeader"),
            ApiError::InvalidPayload { .. } => (StatusCode::BAD_REQUEST, "InvalidPayload"),
            ApiError::MissingInstallation => (StatusCode::BAD_REQUEST, "MissingInstallation"),
            ApiError::GitHub(github_client::Error::AuthError(_)) => {
                (StatusCode::BAD_GATEWAY, "GitHubAuthenticationError")
            }
            ApiError::GitHub(_) => (StatusCode::BAD_GATEWAY, "GitHubError"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        log_error(&self, status);

        let body = ErrorResponse {
            error: ErrorDetails {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Log error with appropriate level based on HTTP status
fn log_error(error: &ApiError, status: StatusCode) {
    if status.is_server_error() {
        tracing::error!(status = %status, error = %error, "Webhook delivery failed");
    } else {
        tracing::warn!(status = %status, error = %error, "Webhook delivery rejected");
    }
}

/// Errors raised while loading the server configuration.
#[derive(Error, Debug)]
pub enum ServerConfigError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    #[error("Missing required setting {0}")]
    MissingSetting(&'static str),

    #[error("Fallback policy {path} is invalid: {source}")]
    FallbackPolicy {
        path: String,
        #[source]
        source: config_manager::ConfigurationError,
    },
}
