//! GitHub clients used to act on webhook deliveries
//!
//! Every delivery names the app installation it was sent to; work for that delivery runs
//! with an installation token for the repository. A separately configured personal token is
//! used only for merges into branches with push restrictions.

use async_trait::async_trait;
use github_client::{
    authenticate_with_access_token, create_app_client, create_token_client, GitHubClient,
};
use octocrab::Octocrab;
use tracing::info;

use crate::errors::ApiError;

/// Hands out authenticated clients for webhook processing.
#[async_trait]
pub trait ClientProvider: Send + Sync {
    /// Returns a client acting as the installation that received the delivery.
    async fn installation_client(
        &self,
        installation_id: Option<u64>,
        owner: &str,
        repo: &str,
    ) -> Result<GitHubClient, ApiError>;

    /// Returns the client used to merge into branches with push restrictions.
    fn push_restricted_client(&self) -> Option<GitHubClient>;
}

/// Clients backed by GitHub App credentials.
pub struct GitHubAppClients {
    app: Octocrab,
    push_restricted: Option<GitHubClient>,
}

impl GitHubAppClients {
    /// Builds the app client and, when a token is given, the push-restricted client.
    pub fn new(
        app_id: u64,
        private_key: &str,
        api_url: Option<&str>,
        push_restricted_token: Option<&str>,
    ) -> Result<Self, github_client::Error> {
        let app = create_app_client(app_id, private_key, api_url)?;
        let push_restricted = push_restricted_token
            .map(|token| create_token_client(token, api_url).map(GitHubClient::new))
            .transpose()?;
        if push_restricted.is_some() {
            info!("Merges into branches with push restrictions use the configured token");
        }
        Ok(Self {
            app,
            push_restricted,
        })
    }
}

#[async_trait]
impl ClientProvider for GitHubAppClients {
    async fn installation_client(
        &self,
        installation_id: Option<u64>,
        owner: &str,
        repo: &str,
    ) -> Result<GitHubClient, ApiError> {
        let installation_id = installation_id.ok_or(ApiError::MissingInstallation)?;
        let client = authenticate_with_access_token(&self.app, installation_id, owner, repo).await?;
        Ok(GitHubClient::new(client))
    }

    fn push_restricted_client(&self) -> Option<GitHubClient> {
        self.push_restricted.clone()
    }
}
