use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Errors raised while evaluating or acting on a pull request.
#[derive(Error, Debug)]
pub enum MergeRollerError {
    /// Reading pull request state from GitHub failed.
    #[error("Failed to load pull request data: {0}")]
    PullRequestData(#[from] github_client::Error),

    /// A configured branch pattern is not a valid regular expression.
    #[error("Invalid branch pattern {pattern:?}: {reason}")]
    InvalidBranchPattern { pattern: String, reason: String },

    #[error("Failed to determine if the pull request is ignored: {0}")]
    IgnoreCheck(#[source] Box<MergeRollerError>),

    #[error("Failed to determine if the pull request is triggered: {0}")]
    TriggerCheck(#[source] Box<MergeRollerError>),

    #[error("Failed to determine the status checks of the pull request: {0}")]
    StatusCheck(#[source] Box<MergeRollerError>),
}

impl MergeRollerError {
    /// Returns the HTTP status GitHub answered with, looking through wrapped errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            MergeRollerError::PullRequestData(e) => e.status_code(),
            MergeRollerError::IgnoreCheck(inner)
            | MergeRollerError::TriggerCheck(inner)
            | MergeRollerError::StatusCheck(inner) => inner.status_code(),
            MergeRollerError::InvalidBranchPattern { .. } => None,
        }
    }
}

/// Result type alias for merge_roller_core operations.
pub type MergeRollerResult<T> = Result<T, MergeRollerError>;
