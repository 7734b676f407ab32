//! Crate for interacting with the GitHub REST API.
//!
//! This crate provides a client for making authenticated requests to GitHub, either as a
//! GitHub App installation or with a personal access token. It exposes exactly the calls the
//! merge bot needs: reading pull request state (labels, comments, commits, statuses, branch
//! protection), merging, moving and deleting references, comparing commits and reading the
//! repository policy file.

use base64::Engine;
use jsonwebtoken::EncodingKey;
use octocrab::Octocrab;
use secrecy::ExposeSecret;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, instrument, warn};

pub mod errors;
pub use errors::Error;

pub mod models;
pub use models::MergeMethod;

pub mod webhook;
pub use webhook::WebhookEvent;

// Reference the tests module in the separate file
#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;

/// Number of items requested per page from list endpoints.
const PAGE_SIZE: usize = 100;

/// Upper bound on the number of pages fetched from a single list endpoint.
const MAX_PAGES: u32 = 10;

/// A client for interacting with the GitHub API.
///
/// The client is cheap to clone; clones share the underlying HTTP connection pool.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Octocrab,
}

#[derive(Serialize)]
struct PageParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base: Option<&'a str>,
    per_page: usize,
    page: u32,
}

#[derive(Serialize)]
struct RefParams<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
}

impl GitHubClient {
    /// Creates a new `GitHubClient` from an already authenticated `Octocrab` instance.
    pub fn new(client: Octocrab) -> Self {
        Self { client }
    }

    /// Fetches a single pull request.
    ///
    /// The response contains GitHub's current view of the mergeability of the pull request,
    /// which is why the merge loop calls this on every attempt.
    ///
    /// # Errors
    /// Returns `Error::NotFound` if the pull request does not exist and
    /// `Error::RequestFailed` for any other unsuccessful response.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, number = number))]
    pub async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<models::PullRequest, Error> {
        let path = format!("/repos/{owner}/{repo}/pulls/{number}");
        self.get_json(&path, None::<&()>, "Failed to get pull request")
            .await
    }

    /// Lists the open pull requests of a repository, optionally filtered by base branch.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo))]
    pub async fn list_open_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        base: Option<&str>,
    ) -> Result<Vec<models::PullRequest>, Error> {
        let path = format!("/repos/{owner}/{repo}/pulls");
        self.get_all_pages(&path, Some("open"), base, "Failed to list pull requests")
            .await
    }

    /// Lists the pull requests whose head is the given commit.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, sha = %sha))]
    pub async fn list_pull_requests_for_commit(
        &self,
        owner: &str,
        repo: &str,
        sha: &str,
    ) -> Result<Vec<models::PullRequest>, Error> {
        let path = format!("/repos/{owner}/{repo}/commits/{sha}/pulls");
        self.get_all_pages(&path, None, None, "Failed to list pull requests for commit")
            .await
    }

    /// Lists the issue comments of a pull request, oldest first.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, number = number))]
    pub async fn list_issue_comments(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<models::Comment>, Error> {
        let path = format!("/repos/{owner}/{repo}/issues/{number}/comments");
        self.get_all_pages(&path, None, None, "Failed to list issue comments")
            .await
    }

    /// Lists the commits of a pull request, oldest first.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, number = number))]
    pub async fn list_pull_request_commits(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<models::Commit>, Error> {
        let path = format!("/repos/{owner}/{repo}/pulls/{number}/commits");
        self.get_all_pages(&path, None, None, "Failed to list pull request commits")
            .await
    }

    /// Lists the labels currently applied to an issue or pull request.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, number = number))]
    pub async fn list_issue_labels(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<models::Label>, Error> {
        let path = format!("/repos/{owner}/{repo}/issues/{number}/labels");
        self.get_all_pages(&path, None, None, "Failed to list issue labels")
            .await
    }

    /// Returns the names of the status checks branch protection requires on a branch.
    ///
    /// An unprotected branch has no required checks, so a `404` yields an empty list.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, branch = %branch))]
    pub async fn get_required_status_checks(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<Vec<String>, Error> {
        let path = format!("/repos/{owner}/{repo}/branches/{branch}/protection/required_status_checks");
        match self
            .get_json::<models::RequiredStatusChecks, ()>(
                &path,
                None,
                "Failed to get required status checks",
            )
            .await
        {
            Ok(checks) => Ok(checks.names()),
            Err(e) if e.is_not_found() => {
                debug!(branch = branch, "Branch has no required status checks");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Returns `true` when pushes to the branch are restricted to specific actors.
    ///
    /// GitHub answers `404` when the branch is unprotected or has no push restrictions.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, branch = %branch))]
    pub async fn has_push_restrictions(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<bool, Error> {
        let path = format!("/repos/{owner}/{repo}/branches/{branch}/protection/restrictions");
        match self
            .get_json::<serde_json::Value, ()>(&path, None, "Failed to get push restrictions")
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Fetches the combined commit status of a reference.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, git_ref = %git_ref))]
    pub async fn get_combined_status(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<models::CombinedStatus, Error> {
        let path = format!("/repos/{owner}/{repo}/commits/{git_ref}/status");
        self.get_json(&path, None::<&()>, "Failed to get combined status")
            .await
    }

    /// Lists the check runs reported against a reference.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, git_ref = %git_ref))]
    pub async fn list_check_runs(
        &self,
        owner: &str,
        repo: &str,
        git_ref: &str,
    ) -> Result<Vec<models::CheckRun>, Error> {
        let path = format!("/repos/{owner}/{repo}/commits/{git_ref}/check-runs");
        let mut runs = Vec::new();
        for page in 1..=MAX_PAGES {
            let params = PageParams {
                state: None,
                base: None,
                per_page: PAGE_SIZE,
                page,
            };
            let list: models::CheckRunList = self
                .get_json(&path, Some(&params), "Failed to list check runs")
                .await?;
            let received = list.check_runs.len();
            runs.extend(list.check_runs);
            if received < PAGE_SIZE || runs.len() as u64 >= list.total_count {
                break;
            }
        }
        Ok(runs)
    }

    /// Merges a pull request.
    ///
    /// # Errors
    /// GitHub answers `405` when the pull request is not mergeable (for instance because
    /// required reviews or checks are missing) and `409` when the head SHA no longer matches.
    /// Both are returned as `Error::RequestFailed` with the status preserved.
    #[instrument(skip(self, request), fields(owner = %owner, repo = %repo, number = number, merge_method = %request.merge_method))]
    pub async fn merge_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        request: &models::MergeRequest,
    ) -> Result<models::MergeResult, Error> {
        let path = format!("/repos/{owner}/{repo}/pulls/{number}/merge");
        let result: models::MergeResult = self
            .client
            .put(path, Some(request))
            .await
            .map_err(|e| map_octocrab_error("Failed to merge pull request", e))?;

        info!(sha = %result.sha, "Merged pull request");
        Ok(result)
    }

    /// Moves a branch to a new commit.
    ///
    /// With `force` set to `false` GitHub only accepts fast-forward updates, which is what the
    /// `ff-only` merge method relies on.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, branch = %branch, sha = %sha))]
    pub async fn update_reference(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        sha: &str,
        force: bool,
    ) -> Result<(), Error> {
        let path = format!("/repos/{owner}/{repo}/git/refs/heads/{branch}");
        let body = serde_json::json!({ "sha": sha, "force": force });
        let _: serde_json::Value = self
            .client
            .patch(path, Some(&body))
            .await
            .map_err(|e| map_octocrab_error("Failed to update reference", e))?;
        Ok(())
    }

    /// Deletes a branch.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, branch = %branch))]
    pub async fn delete_reference(&self, owner: &str, repo: &str, branch: &str) -> Result<(), Error> {
        let path = format!("/repos/{owner}/{repo}/git/refs/heads/{branch}");
        let response = self
            .client
            ._delete(path, None::<&()>)
            .await
            .map_err(|e| map_octocrab_error("Failed to delete reference", e))?;
        octocrab::map_github_error(response)
            .await
            .map_err(|e| map_octocrab_error("Failed to delete reference", e))?;
        Ok(())
    }

    /// Compares two commits, returning how far `head` is ahead of and behind `base`.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, base = %base, head = %head))]
    pub async fn compare_commits(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<models::Comparison, Error> {
        let path = format!("/repos/{owner}/{repo}/compare/{base}...{head}");
        self.get_json(&path, None::<&()>, "Failed to compare commits")
            .await
    }

    /// Merges `head` into the branch `base` using the repository merges API.
    ///
    /// GitHub answers `204` when there is nothing to merge and `409` on a merge conflict.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, base = %base, head = %head))]
    pub async fn merge_branches(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<(), Error> {
        let path = format!("/repos/{owner}/{repo}/merges");
        let body = serde_json::json!({ "base": base, "head": head });
        let response = self
            .client
            ._post(path, Some(&body))
            .await
            .map_err(|e| map_octocrab_error("Failed to merge branches", e))?;
        octocrab::map_github_error(response)
            .await
            .map_err(|e| map_octocrab_error("Failed to merge branches", e))?;
        Ok(())
    }

    /// Reads a file from a repository at the given reference.
    ///
    /// Returns `Ok(None)` when the file does not exist.
    #[instrument(skip(self), fields(owner = %owner, repo = %repo, path = %path, git_ref = %git_ref))]
    pub async fn get_file_contents(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<String>, Error> {
        let route = format!("/repos/{owner}/{repo}/contents/{path}");
        let params = RefParams { git_ref };
        let file: models::FileContent = match self
            .get_json(&route, Some(&params), "Failed to get file contents")
            .await
        {
            Ok(file) => file,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };

        if file.encoding != "base64" {
            warn!(encoding = %file.encoding, "Unexpected file content encoding");
            return Err(Error::InvalidResponse);
        }

        let cleaned: String = file.content.split_whitespace().collect();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(cleaned)
            .map_err(|e| {
                error!(error = %e, "File content is not valid base64");
                Error::InvalidResponse
            })?;
        let text = String::from_utf8(bytes).map_err(|e| {
            error!(error = %e, "File content is not valid UTF-8");
            Error::InvalidResponse
        })?;
        Ok(Some(text))
    }

    async fn get_json<R, P>(&self, path: &str, params: Option<&P>, message: &str) -> Result<R, Error>
    where
        R: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.client
            .get(path, params)
            .await
            .map_err(|e| map_octocrab_error(message, e))
    }

    async fn get_all_pages<R>(
        &self,
        path: &str,
        state: Option<&str>,
        base: Option<&str>,
        message: &str,
    ) -> Result<Vec<R>, Error>
    where
        R: DeserializeOwned,
    {
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let params = PageParams {
                state,
                base,
                per_page: PAGE_SIZE,
                page,
            };
            let batch: Vec<R> = self.get_json(path, Some(&params), message).await?;
            let received = batch.len();
            items.extend(batch);
            if received < PAGE_SIZE {
                break;
            }
        }
        Ok(items)
    }
}

/// Authenticates with GitHub using an installation access token for a specific app installation.
///
/// # Errors
///
/// Returns `Error::AuthError` when the token for the installation cannot be created.
#[instrument(skip(octocrab))]
pub async fn authenticate_with_access_token(
    octocrab: &Octocrab,
    installation_id: u64,
    repository_owner: &str,
    source_repository: &str,
) -> Result<Octocrab, Error> {
    debug!(
        repository_owner = repository_owner,
        repository = source_repository,
        installation_id,
        "Finding installation"
    );

    let (api_with_token, token) = octocrab
        .installation_and_token(installation_id.into())
        .await
        .map_err(|e| {
            error!(
                repository_owner = repository_owner,
                repository = source_repository,
                installation_id,
                "Failed to create a token for the installation",
            );
            log_octocrab_error("Failed to create installation token", e);

            Error::AuthError(format!(
                "Failed to create an access token for installation {installation_id}"
            ))
        })?;

    debug!(
        token_length = token.expose_secret().len(),
        "Received installation token"
    );
    info!(
        repository_owner = repository_owner,
        repository = source_repository,
        installation_id,
        "Created access token for installation",
    );

    Ok(api_with_token)
}

/// Creates an `Octocrab` client authenticated as a GitHub App using a JWT token.
///
/// `base_uri` points the client at a GitHub Enterprise instance; `None` uses `api.github.com`.
///
/// # Errors
///
/// Returns `Error::AuthError` if the private key cannot be parsed or the client cannot be
/// built.
#[instrument(skip(private_key))]
pub fn create_app_client(
    app_id: u64,
    private_key: &str,
    base_uri: Option<&str>,
) -> Result<Octocrab, Error> {
    info!(
        app_id = app_id,
        key_length = private_key.len(),
        "Creating GitHub App client with provided credentials"
    );

    let key = EncodingKey::from_rsa_pem(private_key.as_bytes()).map_err(|e| {
        error!(
            app_id = app_id,
            error = %e,
            "Failed to parse RSA private key - key format is invalid"
        );
        Error::AuthError(format!(
            "Failed to translate the private key. Error was: {e}"
        ))
    })?;

    let mut builder = Octocrab::builder();
    if let Some(uri) = base_uri {
        builder = builder
            .base_uri(uri)
            .map_err(|e| Error::AuthError(format!("Invalid GitHub API URL '{uri}': {e}")))?;
    }

    let octocrab = builder.app(app_id.into(), key).build().map_err(|e| {
        error!(
            app_id = app_id,
            error = ?e,
            "Failed to build Octocrab client with GitHub App credentials"
        );
        Error::AuthError("Failed to build the GitHub App client.".to_string())
    })?;

    info!(app_id = app_id, "Successfully created GitHub App client");

    Ok(octocrab)
}

/// Creates an `Octocrab` client authenticated with a personal access token.
///
/// # Errors
///
/// Returns `Error::AuthError` if the client cannot be built.
#[instrument(skip(token))]
pub fn create_token_client(token: &str, base_uri: Option<&str>) -> Result<Octocrab, Error> {
    let mut builder = Octocrab::builder();
    if let Some(uri) = base_uri {
        builder = builder
            .base_uri(uri)
            .map_err(|e| Error::AuthError(format!("Invalid GitHub API URL '{uri}': {e}")))?;
    }

    builder
        .personal_token(token.to_string())
        .build()
        .map_err(|e| Error::AuthError(format!("Failed to build token client: {e}")))
}

/// Logs an octocrab error and converts it to the crate error type.
fn map_octocrab_error(message: &str, e: octocrab::Error) -> Error {
    let mapped = match &e {
        octocrab::Error::GitHub { source, .. } => {
            let status = source.status_code.as_u16();
            let is_rate_limited = status == 429
                || (status == 403 && source.message.to_lowercase().contains("rate limit"));
            if status == 404 {
                Error::NotFound
            } else if is_rate_limited {
                Error::RateLimitExceeded
            } else {
                Error::RequestFailed {
                    status,
                    message: source.message.clone(),
                }
            }
        }
        octocrab::Error::Serde { .. } | octocrab::Error::Json { .. } => Error::InvalidResponse,
        _ => Error::ApiError(),
    };

    // Missing resources are an expected answer for several lookups.
    if matches!(mapped, Error::NotFound) {
        debug!(error_message = %e, "{}. Resource not found", message);
    } else {
        log_octocrab_error(message, e);
    }

    mapped
}

fn log_octocrab_error(message: &str, e: octocrab::Error) {
    match e {
        octocrab::Error::GitHub { source, backtrace } => {
            let err = source;
            error!(
                error_message = err.message,
                status = err.status_code.as_u16(),
                backtrace = backtrace.to_string(),
                "{}. Received an error from GitHub",
                message
            )
        }
        octocrab::Error::UriParse { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. Failed to parse URI.",
            message
        ),

        octocrab::Error::Uri { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}, Failed to parse URI.",
            message
        ),
        octocrab::Error::InvalidHeaderValue { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. One of the header values was invalid.",
            message
        ),
        octocrab::Error::InvalidUtf8 { source, backtrace } => error!(
            error_message = source.to_string(),
            backtrace = backtrace.to_string(),
            "{}. The message wasn't valid UTF-8.",
            message,
        ),
        _ => error!(error_message = e.to_string(), message),
    };
}
