//! Webhook event dispatch
//!
//! Each handled event is reduced to the set of pull requests it may have changed. Merge
//! relevant events lead to a merge decision for those pull requests, pushes lead to update
//! decisions for the pull requests targeting the pushed branch. Positive decisions start
//! detached merge or update loops; the returned handles are only used by tests.

use std::sync::Arc;

use config_manager::{Config, ConfigFetcher, FetchedConfig, GitHubConfigFetcher};
use github_client::models::{PullRequest, RepositoryRef};
use github_client::webhook::{
    CheckRunEvent, IssueCommentEvent, PullRequestEvent, PullRequestReviewEvent, PushEvent,
    StatusEvent,
};
use github_client::{GitHubClient, WebhookEvent};
use merge_roller_core::{
    merge_pr, should_merge_pr, should_update_pr, update_pr, GitHubMerger, GitHubPullContext,
    GitHubUpdater, MergeOutcome, Merger, PullContext, PushRestrictionMerger, UpdateOutcome,
};
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::ApiError;
use crate::AppState;

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;

/// `pull_request` actions that can change a merge decision.
pub const PULL_REQUEST_ACTIONS: [&str; 8] = [
    "opened",
    "reopened",
    "synchronize",
    "edited",
    "labeled",
    "unlabeled",
    "ready_for_review",
    "auto_merge_enabled",
];

/// `issue_comment` actions that can change a merge decision.
pub const COMMENT_ACTIONS: [&str; 2] = ["created", "edited"];

/// A loop started for a delivery.
#[derive(Debug)]
pub enum Spawned {
    Merge(JoinHandle<MergeOutcome>),
    Update(JoinHandle<UpdateOutcome>),
}

/// What a delivery led to.
#[derive(Debug)]
pub enum Disposition {
    /// The event or action is not one the bot reacts to
    Ignored,
    /// The event was evaluated; any loops that were started are listed
    Processed(Vec<Spawned>),
}

/// Evaluates a webhook delivery.
///
/// # Errors
///
/// Returns an error when the payload cannot be parsed, the installation cannot be
/// authenticated, or the pull requests affected by the event cannot be listed. Failures while
/// deciding about a single pull request are logged and do not fail the delivery.
pub async fn handle_event(
    state: &AppState,
    event: &str,
    body: &[u8],
) -> Result<Disposition, ApiError> {
    let Some(kind) = WebhookEvent::from_header(event) else {
        debug!(event, "Ignoring unhandled event");
        return Ok(Disposition::Ignored);
    };

    match kind {
        WebhookEvent::Ping => {
            info!("Received ping");
            Ok(Disposition::Processed(Vec::new()))
        }
        WebhookEvent::PullRequest => {
            let payload: PullRequestEvent = parse(kind, body)?;
            if !PULL_REQUEST_ACTIONS.contains(&payload.action.as_str()) {
                return Ok(ignored_action(kind, &payload.action));
            }
            let (owner, repo) = coordinates(&payload.repository);
            let client = installation_client(state, &payload.installation, &owner, &repo).await?;
            let tasks = evaluate_merges(state, &client, &owner, &repo, vec![payload.pull_request])
                .await;
            Ok(Disposition::Processed(tasks))
        }
        WebhookEvent::PullRequestReview => {
            let payload: PullRequestReviewEvent = parse(kind, body)?;
            if payload.action != "submitted" {
                return Ok(ignored_action(kind, &payload.action));
            }
            let (owner, repo) = coordinates(&payload.repository);
            let client = installation_client(state, &payload.installation, &owner, &repo).await?;
            let tasks = evaluate_merges(state, &client, &owner, &repo, vec![payload.pull_request])
                .await;
            Ok(Disposition::Processed(tasks))
        }
        WebhookEvent::IssueComment => {
            let payload: IssueCommentEvent = parse(kind, body)?;
            if !payload.is_pull_request() {
                debug!(issue = payload.issue.number, "Ignoring comment on an issue");
                return Ok(Disposition::Ignored);
            }
            if !COMMENT_ACTIONS.contains(&payload.action.as_str()) {
                return Ok(ignored_action(kind, &payload.action));
            }
            let (owner, repo) = coordinates(&payload.repository);
            let client = installation_client(state, &payload.installation, &owner, &repo).await?;
            let pull_request = client
                .get_pull_request(&owner, &repo, payload.issue.number)
                .await?;
            let tasks = evaluate_merges(state, &client, &owner, &repo, vec![pull_request]).await;
            Ok(Disposition::Processed(tasks))
        }
        WebhookEvent::Status => {
            let payload: StatusEvent = parse(kind, body)?;
            if payload.state != "success" {
                debug!(context = %payload.context, state = %payload.state, "Ignoring unsuccessful status");
                return Ok(Disposition::Ignored);
            }
            let (owner, repo) = coordinates(&payload.repository);
            let client = installation_client(state, &payload.installation, &owner, &repo).await?;
            let pull_requests: Vec<PullRequest> = client
                .list_pull_requests_for_commit(&owner, &repo, &payload.sha)
                .await?
                .into_iter()
                .filter(|pr| !pr.is_closed() && pr.head.sha == payload.sha)
                .collect();
            let tasks = evaluate_merges(state, &client, &owner, &repo, pull_requests).await;
            Ok(Disposition::Processed(tasks))
        }
        WebhookEvent::CheckRun => {
            let payload: CheckRunEvent = parse(kind, body)?;
            let succeeded = payload.check_run.run.conclusion.as_deref() == Some("success");
            if payload.action != "completed" || !succeeded {
                return Ok(ignored_action(kind, &payload.action));
            }
            let (owner, repo) = coordinates(&payload.repository);
            let client = installation_client(state, &payload.installation, &owner, &repo).await?;
            let mut pull_requests = Vec::new();
            for link in &payload.check_run.pull_requests {
                pull_requests.push(client.get_pull_request(&owner, &repo, link.number).await?);
            }
            let tasks = evaluate_merges(state, &client, &owner, &repo, pull_requests).await;
            Ok(Disposition::Processed(tasks))
        }
        WebhookEvent::Push => {
            let payload: PushEvent = parse(kind, body)?;
            let Some(branch) = payload.branch().filter(|_| !payload.deleted) else {
                debug!(git_ref = %payload.git_ref, "Ignoring push that did not update a branch");
                return Ok(Disposition::Ignored);
            };
            let (owner, repo) = coordinates(&payload.repository);
            let client = installation_client(state, &payload.installation, &owner, &repo).await?;
            let tasks = evaluate_updates(state, &client, &owner, &repo, branch).await?;
            Ok(Disposition::Processed(tasks))
        }
    }
}

fn parse<T: DeserializeOwned>(kind: WebhookEvent, body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::InvalidPayload {
        event: kind.to_string(),
        reason: e.to_string(),
    })
}

fn ignored_action(kind: WebhookEvent, action: &str) -> Disposition {
    debug!(event = %kind, action, "Ignoring unhandled action");
    Disposition::Ignored
}

/// Returns the owner and name of a repository.
fn coordinates(repository: &RepositoryRef) -> (String, String) {
    if !repository.owner.login.is_empty() {
        return (repository.owner.login.clone(), repository.name.clone());
    }
    match repository.full_name.split_once('/') {
        Some((owner, name)) => (owner.to_string(), name.to_string()),
        None => (String::new(), repository.name.clone()),
    }
}

async fn installation_client(
    state: &AppState,
    installation: &Option<github_client::models::InstallationRef>,
    owner: &str,
    repo: &str,
) -> Result<GitHubClient, ApiError> {
    state
        .clients
        .installation_client(installation.as_ref().map(|i| i.id), owner, repo)
        .await
}

/// Loads the repository policy at `git_ref`, logging why there is none.
async fn load_policy(
    state: &AppState,
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    git_ref: &str,
) -> Option<Config> {
    let fetcher = GitHubConfigFetcher::new(client.clone())
        .with_paths(state.options.config_paths.clone())
        .with_fallback(state.options.fallback_policy.clone());

    match fetcher.fetch_config(owner, repo, git_ref).await {
        Ok(FetchedConfig::Valid { config, .. }) => Some(config),
        Ok(FetchedConfig::Missing { paths }) => {
            debug!(owner, repo, git_ref, ?paths, "Repository has no policy");
            None
        }
        Ok(FetchedConfig::Invalid { path, error }) => {
            warn!(owner, repo, git_ref, path = %path, error = %error, "Repository policy is invalid");
            None
        }
        Err(e) => {
            warn!(owner, repo, git_ref, error = %e, "Failed to load the repository policy");
            None
        }
    }
}

fn merger_for(state: &AppState, client: &GitHubClient) -> Arc<dyn Merger> {
    let restricted = state
        .clients
        .push_restricted_client()
        .map(|c| Arc::new(GitHubMerger::new(c)) as Arc<dyn Merger>);
    Arc::new(PushRestrictionMerger::new(
        Arc::new(GitHubMerger::new(client.clone())),
        restricted,
    ))
}

async fn evaluate_merges(
    state: &AppState,
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    pull_requests: Vec<PullRequest>,
) -> Vec<Spawned> {
    let mut tasks = Vec::new();
    for pull_request in pull_requests {
        if pull_request.is_closed() {
            debug!(owner, repo, number = pull_request.number, "Pull request is closed");
            continue;
        }

        let base = pull_request.base.ref_name.clone();
        let Some(policy) = load_policy(state, client, owner, repo, &base).await else {
            continue;
        };

        let ctx = GitHubPullContext::new(client.clone(), owner, repo, pull_request);
        match should_merge_pr(&ctx, &policy.merge).await {
            Ok(true) => {
                info!(pull_request = %ctx.locator(), "Merging pull request");
                let ctx: Arc<dyn PullContext> = Arc::new(ctx);
                let handle = merge_pr(
                    ctx,
                    merger_for(state, client),
                    policy.merge,
                    state.options.poll,
                );
                tasks.push(Spawned::Merge(handle));
            }
            Ok(false) => {}
            Err(e) => {
                warn!(pull_request = %ctx.locator(), error = %e, "Failed to decide whether to merge");
            }
        }
    }
    tasks
}

async fn evaluate_updates(
    state: &AppState,
    client: &GitHubClient,
    owner: &str,
    repo: &str,
    branch: &str,
) -> Result<Vec<Spawned>, ApiError> {
    let pull_requests = client
        .list_open_pull_requests(owner, repo, Some(branch))
        .await?;
    if pull_requests.is_empty() {
        debug!(owner, repo, branch, "No open pull requests target the branch");
        return Ok(Vec::new());
    }

    let Some(policy) = load_policy(state, client, owner, repo, branch).await else {
        return Ok(Vec::new());
    };

    let updater = Arc::new(GitHubUpdater::new(client.clone()));
    let mut tasks = Vec::new();
    for pull_request in pull_requests {
        let ctx = GitHubPullContext::new(client.clone(), owner, repo, pull_request);
        match should_update_pr(&ctx, &policy.update).await {
            Ok(true) => {
                info!(pull_request = %ctx.locator(), base = branch, "Updating pull request");
                let ctx: Arc<dyn PullContext> = Arc::new(ctx);
                let handle = update_pr(ctx, updater.clone(), branch.to_string(), state.options.poll);
                tasks.push(Spawned::Update(handle));
            }
            Ok(false) => {}
            Err(e) => {
                warn!(pull_request = %ctx.locator(), error = %e, "Failed to decide whether to update");
            }
        }
    }
    Ok(tasks)
}
