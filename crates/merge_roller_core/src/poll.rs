//! Polling cadence shared by the merge and update loops.

use std::time::Duration;

#[cfg(test)]
#[path = "poll_tests.rs"]
mod tests;

/// Bounds the work done for one pull request to `max_attempts * delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Number of attempts before giving up
    pub max_attempts: u32,
    /// Wait before each attempt
    pub delay: Duration,
}

impl PollConfig {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_DELAY)
    }
}
