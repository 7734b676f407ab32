//! MergeRoller webhook server
//!
//! Main binary for running the webhook server.
//!
//! # Environment Variables
//!
//! - `MERGE_ROLLER_CONFIG`: Path of the TOML configuration (default: merge-roller.toml)
//! - `GITHUB_APP_ID`, `GITHUB_PRIVATE_KEY`: GitHub App credentials
//! - `GITHUB_WEBHOOK_SECRET`: Secret used to verify deliveries
//! - `GITHUB_PUSH_RESTRICTED_TOKEN`: Token used to merge into push-restricted branches
//! - `API_HOST`, `API_PORT`: Listener address (default: 0.0.0.0:8080)
//! - `RUST_LOG`: Log filter (default: `logging.level` from the configuration)

use std::sync::Arc;

use merge_roller_api::{
    ApiConfig, ApiServer, AppState, BotOptions, GitHubAppClients, ServerConfig,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_environment()?;
    init_tracing(&config);

    let clients = GitHubAppClients::new(
        config.app_id()?,
        &config.private_key()?,
        config.github.api_url.as_deref(),
        config.options.push_restricted_token.as_deref(),
    )?;

    if config.github.webhook_secret.is_none() {
        tracing::warn!("No webhook secret configured, deliveries are not verified");
    }

    let options = BotOptions {
        config_paths: config.options.config_paths.clone(),
        fallback_policy: config.fallback_policy()?,
        poll: config.poll_config(),
    };
    let state = AppState::new(
        config.github.webhook_secret.clone(),
        Arc::new(clients),
        options,
    );

    let server = ApiServer::new(
        ApiConfig {
            addr: config.socket_addr()?,
        },
        state,
    );

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting MergeRoller");

    server.serve().await
}

fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
