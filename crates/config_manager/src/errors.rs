//! Configuration system error types.
//!
//! Domain-specific errors for loading and parsing the repository merge policy.

use thiserror::Error;

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;

/// Configuration system errors.
///
/// These errors occur when a repository policy file cannot be read or cannot be turned into
/// a [`crate::Config`]. They surface at config-fetch time; no merge or update decision is
/// attempted for a repository whose policy fails to load.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("Failed to access configuration file: {path} - {reason}")]
    FileAccessError { path: String, reason: String },

    #[error("Failed to parse configuration: {reason}")]
    ParseError { reason: String },

    #[error("Unsupported configuration version: {version}")]
    UnsupportedVersion { version: i64 },

    #[error("Unknown v0 configuration mode: {mode:?}")]
    UnknownLegacyMode { mode: String },
}

/// Result type alias for configuration operations.
pub type ConfigurationResult<T> = Result<T, ConfigurationError>;
