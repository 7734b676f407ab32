//! Shared helpers for the handler and event tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use github_client::{create_token_client, GitHubClient};
use merge_roller_core::PollConfig;
use serde_json::{json, Value};
use wiremock::MockServer;

use crate::{errors::ApiError, AppState, BotOptions, ClientProvider};

/// Hands out token clients pointed at a mock server.
pub(crate) struct StaticClients {
    pub client: GitHubClient,
    pub push_restricted: Option<GitHubClient>,
    pub require_installation: bool,
}

#[async_trait]
impl ClientProvider for StaticClients {
    async fn installation_client(
        &self,
        installation_id: Option<u64>,
        _owner: &str,
        _repo: &str,
    ) -> Result<GitHubClient, ApiError> {
        if self.require_installation && installation_id.is_none() {
            return Err(ApiError::MissingInstallation);
        }
        Ok(self.client.clone())
    }

    fn push_restricted_client(&self) -> Option<GitHubClient> {
        self.push_restricted.clone()
    }
}

pub(crate) fn mock_client(mock_server: &MockServer) -> GitHubClient {
    GitHubClient::new(create_token_client("test-token", Some(&mock_server.uri())).unwrap())
}

pub(crate) fn test_state(mock_server: &MockServer, webhook_secret: Option<&str>) -> AppState {
    let clients = StaticClients {
        client: mock_client(mock_server),
        push_restricted: None,
        require_installation: true,
    };
    let options = BotOptions {
        poll: PollConfig::new(1, Duration::ZERO),
        ..Default::default()
    };
    AppState::new(
        webhook_secret.map(|s| s.to_string()),
        Arc::new(clients),
        options,
    )
}

pub(crate) fn repository() -> Value {
    json!({
        "id": 1,
        "name": "widgets",
        "full_name": "acme/widgets",
        "owner": { "login": "acme" }
    })
}

pub(crate) fn pull_request(number: u64, state: &str) -> Value {
    json!({
        "number": number,
        "title": "Add widget support",
        "body": "Adds widgets",
        "state": state,
        "draft": false,
        "head": {
            "ref": "feature/widgets",
            "sha": "abc123",
            "label": "acme:feature/widgets",
            "repo": repository()
        },
        "base": {
            "ref": "main",
            "sha": "def456",
            "label": "acme:main",
            "repo": repository()
        },
        "labels": []
    })
}

/// A policy file as returned by the contents API.
pub(crate) fn policy_file(yaml: &str) -> Value {
    use base64::Engine;
    json!({
        "type": "file",
        "encoding": "base64",
        "content": base64::engine::general_purpose::STANDARD.encode(yaml),
        "path": ".merge-roller.v1.yml"
    })
}

/// Computes the signature header GitHub would send for `body`.
pub(crate) fn sign(body: &[u8], secret: &[u8]) -> Option<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret).ok()?;
    mac.update(body);
    Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}
