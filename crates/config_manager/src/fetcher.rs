//! Loading the policy file from a repository.
//!
//! The policy is read from the target branch of a pull request, so a change to the policy
//! only takes effect once it has been merged. Candidate paths are tried in order and the first
//! file that exists wins.

use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::parsers::parse_config;
use crate::policy::Config;
use async_trait::async_trait;
use github_client::GitHubClient;
use tracing::{debug, info, warn};

#[cfg(test)]
#[path = "fetcher_tests.rs"]
mod tests;

/// Policy paths tried when none are configured.
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = [".merge-roller.v1.yml", ".merge-roller.yml"];

/// The outcome of looking up a repository's policy.
///
/// `Missing` and `Invalid` are states, not errors: callers take no action for them.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedConfig {
    /// None of the candidate paths exist
    Missing { paths: Vec<String> },
    /// A policy file exists but could not be parsed
    Invalid {
        path: String,
        error: ConfigurationError,
    },
    /// A policy was found and parsed
    Valid { path: String, config: Config },
}

/// Supplies the policy for a repository at a given reference.
#[async_trait]
pub trait ConfigFetcher: Send + Sync {
    /// Looks up the policy of `owner/repo` at `git_ref`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::FileAccessError` when the repository cannot be read. A
    /// policy file that is absent or malformed is reported through [`FetchedConfig`] instead.
    async fn fetch_config(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> ConfigurationResult<FetchedConfig>;
}

/// Reads the policy file through the GitHub contents API.
#[derive(Debug, Clone)]
pub struct GitHubConfigFetcher {
    client: GitHubClient,
    paths: Vec<String>,
    fallback: Option<Config>,
}

impl GitHubConfigFetcher {
    /// Creates a fetcher that looks at [`DEFAULT_CONFIG_PATHS`].
    pub fn new(client: GitHubClient) -> Self {
        Self {
            client,
            paths: DEFAULT_CONFIG_PATHS.iter().map(|p| p.to_string()).collect(),
            fallback: None,
        }
    }

    /// Replaces the candidate paths. An empty list keeps the defaults.
    pub fn with_paths(mut self, paths: Vec<String>) -> Self {
        if !paths.is_empty() {
            self.paths = paths;
        }
        self
    }

    /// Sets the policy used for repositories that have no policy file.
    pub fn with_fallback(mut self, fallback: Option<Config>) -> Self {
        self.fallback = fallback;
        self
    }
}

#[async_trait]
impl ConfigFetcher for GitHubConfigFetcher {
    async fn fetch_config(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> ConfigurationResult<FetchedConfig> {
        for path in &self.paths {
            let content = self
                .client
                .get_file_contents(owner, repo, path, git_ref)
                .await
                .map_err(|e| ConfigurationError::FileAccessError {
                    path: format!("{owner}/{repo}/{path}@{git_ref}"),
                    reason: e.to_string(),
                })?;

            let Some(content) = content else {
                debug!(owner = owner, repo = repo, path = %path, "Policy file not present");
                continue;
            };

            return Ok(match parse_config(&content) {
                Ok(config) => FetchedConfig::Valid {
                    path: path.clone(),
                    config,
                },
                Err(error) => {
                    warn!(
                        owner = owner,
                        repo = repo,
                        path = %path,
                        error = %error,
                        "Policy file is invalid"
                    );
                    FetchedConfig::Invalid {
                        path: path.clone(),
                        error,
                    }
                }
            });
        }

        if let Some(fallback) = &self.fallback {
            info!(owner = owner, repo = repo, "No policy file found, using the fallback policy");
            return Ok(FetchedConfig::Valid {
                path: "<fallback>".to_string(),
                config: fallback.clone(),
            });
        }

        Ok(FetchedConfig::Missing {
            paths: self.paths.clone(),
        })
    }
}
