//! Keeping pull requests up to date with their target branch.
//!
//! After a push to a branch, [`update_pr`] merges that branch into the head branch of every
//! pull request that should be updated. The loop uses the same attempt budget as the merge
//! loop: failures to compare or to merge are retried until the budget is spent, except for a
//! merge conflict, which ends the loop.

use async_trait::async_trait;
use github_client::GitHubClient;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::poll::PollConfig;
use crate::pull_context::PullContext;
use crate::MergeRollerResult;

#[cfg(test)]
#[path = "update_tests.rs"]
mod tests;

/// Compares and merges branches on behalf of the update loop.
#[async_trait]
pub trait Updater: Send + Sync {
    /// Returns how many commits of `base_ref` the current head of the pull request lacks.
    async fn behind_by(&self, ctx: &dyn PullContext, base_ref: &str) -> MergeRollerResult<u64>;

    /// Merges `base_ref` into the head branch of the pull request.
    async fn merge_forward(&self, ctx: &dyn PullContext, base_ref: &str) -> MergeRollerResult<()>;
}

/// An [`Updater`] that calls the GitHub API.
#[derive(Debug, Clone)]
pub struct GitHubUpdater {
    client: GitHubClient,
}

impl GitHubUpdater {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Updater for GitHubUpdater {
    async fn behind_by(&self, ctx: &dyn PullContext, base_ref: &str) -> MergeRollerResult<u64> {
        // The head may have moved since the snapshot was taken.
        let current = self
            .client
            .get_pull_request(ctx.owner(), ctx.repo(), ctx.number())
            .await?;
        let comparison = self
            .client
            .compare_commits(ctx.owner(), ctx.repo(), base_ref, &current.head.sha)
            .await?;
        Ok(comparison.behind_by)
    }

    async fn merge_forward(&self, ctx: &dyn PullContext, base_ref: &str) -> MergeRollerResult<()> {
        let head = ctx.branches().head;
        self.client
            .merge_branches(ctx.owner(), ctx.repo(), &head, base_ref)
            .await?;
        Ok(())
    }
}

/// How an update loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The base was merged into the head branch
    Updated,
    /// The head already contains the base
    UpToDate,
    /// The head branch lives in a fork and cannot be updated
    Fork,
    /// Merging the base into the head conflicts
    Conflict,
    /// The attempt budget was spent
    GaveUp,
}

/// Runs the update loop to completion on the current task.
pub async fn run_update(
    ctx: &dyn PullContext,
    updater: &dyn Updater,
    base_ref: &str,
    poll: &PollConfig,
) -> UpdateOutcome {
    let locator = ctx.locator();
    let branches = ctx.branches();

    if branches.head_is_fork() {
        debug!(pull_request = %locator, head = %branches.head, "Head branch is in a fork, not updating");
        return UpdateOutcome::Fork;
    }

    for attempt in 1..=poll.max_attempts {
        tokio::time::sleep(poll.delay).await;

        let behind = match updater.behind_by(ctx, base_ref).await {
            Ok(behind) => behind,
            Err(e) => {
                warn!(pull_request = %locator, attempt, error = %e, "Failed to compare the head with {}", base_ref);
                continue;
            }
        };

        if behind == 0 {
            debug!(pull_request = %locator, base = base_ref, "Pull request is up to date");
            return UpdateOutcome::UpToDate;
        }

        match updater.merge_forward(ctx, base_ref).await {
            Ok(()) => {
                info!(pull_request = %locator, base = base_ref, behind_by = behind, "Updated pull request");
                return UpdateOutcome::Updated;
            }
            Err(e) if e.status_code() == Some(409) => {
                info!(pull_request = %locator, base = base_ref, error = %e, "Updating the pull request conflicts");
                return UpdateOutcome::Conflict;
            }
            Err(e) => {
                warn!(pull_request = %locator, attempt, error = %e, "Failed to update the pull request, retrying");
            }
        }
    }

    info!(
        pull_request = %locator,
        attempts = poll.max_attempts,
        "Gave up updating the pull request"
    );
    UpdateOutcome::GaveUp
}

/// Starts the update loop as a detached task.
///
/// Like [`crate::merge::merge_pr`], the task outlives the caller and reports only through the
/// log.
pub fn update_pr(
    ctx: Arc<dyn PullContext>,
    updater: Arc<dyn Updater>,
    base_ref: String,
    poll: PollConfig,
) -> JoinHandle<UpdateOutcome> {
    let span = info_span!("update_pr", pull_request = %ctx.locator(), base = %base_ref);
    tokio::spawn(
        async move { run_update(ctx.as_ref(), updater.as_ref(), &base_ref, &poll).await }
            .instrument(span),
    )
}
