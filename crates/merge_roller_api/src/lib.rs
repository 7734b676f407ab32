//! MergeRoller webhook server
//!
//! This crate receives GitHub webhook deliveries for the MergeRoller app and turns them into
//! merge and update decisions from `merge_roller_core`.
//!
//! # Architecture
//!
//! This crate exists in the HTTP layer and handles:
//! - Webhook signature verification
//! - Event dispatch to the merge and update logic
//! - Server configuration and startup
//!
//! The dependency flows: HTTP API → Business Logic, never the reverse.

use std::sync::Arc;

use config_manager::{Config, DEFAULT_CONFIG_PATHS};
use merge_roller_core::PollConfig;

pub mod config;
pub mod errors;
pub mod events;
pub mod github;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod signature;

#[cfg(test)]
mod testing;

// Re-export key types for convenience
pub use config::ServerConfig;
pub use errors::{ApiError, ErrorResponse, ServerConfigError};
pub use github::{ClientProvider, GitHubAppClients};
pub use server::{ApiConfig, ApiServer};

/// Default API port
pub const DEFAULT_PORT: u16 = 8080;

/// How the bot evaluates repositories.
#[derive(Debug, Clone)]
pub struct BotOptions {
    /// Repository policy paths, tried in order
    pub config_paths: Vec<String>,
    /// Policy used for repositories without a policy file
    pub fallback_policy: Option<Config>,
    /// Attempt budget of the merge and update loops
    pub poll: PollConfig,
}

impl Default for BotOptions {
    fn default() -> Self {
        Self {
            config_paths: DEFAULT_CONFIG_PATHS.iter().map(|p| p.to_string()).collect(),
            fallback_policy: None,
            poll: PollConfig::default(),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Secret used to verify delivery signatures; `None` accepts unsigned deliveries
    pub webhook_secret: Option<String>,
    pub clients: Arc<dyn ClientProvider>,
    pub options: Arc<BotOptions>,
}

impl AppState {
    pub fn new(
        webhook_secret: Option<String>,
        clients: Arc<dyn ClientProvider>,
        options: BotOptions,
    ) -> Self {
        Self {
            webhook_secret,
            clients,
            options: Arc::new(options),
        }
    }
}
