//! Error types for GitHub client operations.
//!
//! This module defines the error types that can occur when interacting with the GitHub API
//! through the github_client crate. The merge and update loops inspect
//! [`Error::status_code`] to separate terminal API rejections from transient failures, so
//! every failed HTTP exchange that produced a status is reported as
//! [`Error::RequestFailed`].

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors that can occur during GitHub client operations.
///
/// ## Examples
///
/// ```rust
/// use github_client::Error;
///
/// let error = Error::RequestFailed {
///     status: 405,
///     message: "Required status check \"ci\" is expected.".to_string(),
/// };
/// assert_eq!(error.status_code(), Some(405));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A generic API request failure without a usable response.
    ///
    /// This is the error produced for transport failures (connection resets, timeouts,
    /// cancelled requests) where GitHub never returned a status code.
    #[error("API request failed")]
    ApiError(),

    /// Authentication or GitHub client initialization failure.
    #[error("Failed to authenticate or initialize GitHub client: {0}")]
    AuthError(String),

    /// Error deserializing the response from GitHub.
    #[error("Failed to deserialize GitHub response: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// The GitHub API returned a response in an unexpected format.
    #[error("Invalid response format")]
    InvalidResponse,

    /// The requested resource was not found.
    #[error("Resource not found")]
    NotFound,

    /// GitHub API rate limit has been exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// GitHub answered the request with a non-success status code.
    ///
    /// The status is kept so that callers can classify the failure: a `405` from the merge
    /// endpoint means a branch protection condition is unmet, a `409` means the head moved
    /// or the merge conflicts.
    #[error("GitHub request failed with status {status}: {message}")]
    RequestFailed {
        /// HTTP status code returned by GitHub
        status: u16,
        /// Message returned by GitHub
        message: String,
    },
}

impl Error {
    /// Returns the HTTP status code GitHub answered with, if there was one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::RequestFailed { status, .. } => Some(*status),
            Error::NotFound => Some(404),
            Error::RateLimitExceeded => Some(429),
            _ => None,
        }
    }

    /// Returns `true` when GitHub reported that the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}
