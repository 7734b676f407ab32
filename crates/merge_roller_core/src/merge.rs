//! Merging pull requests.
//!
//! [`merge_pr`] spawns the merge loop as a detached task. The loop polls GitHub's mergeability
//! until the pull request can be merged, is closed, is reported unmergeable, or the attempt
//! budget is spent. Nothing is returned to the code that triggered the merge; the outcome is
//! logged and is available through the task's `JoinHandle` for callers that want it.

use async_trait::async_trait;
use config_manager::{BodyStrategy, MergeConfig, SquashOptions, TitleStrategy};
use github_client::models::MergeRequest;
use github_client::{GitHubClient, MergeMethod};
use regex::Regex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::poll::PollConfig;
use crate::pull_context::PullContext;
use crate::MergeRollerResult;

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;

/// Sent as the commit message when the body must be empty. GitHub replaces an empty message
/// with its own default.
pub const EMPTY_COMMIT_MESSAGE: &str = "\u{200B}";

/// The body of a merge commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CommitMessage {
    /// Let GitHub choose
    #[default]
    Default,
    /// Explicitly empty
    Empty,
    Text(String),
}

impl CommitMessage {
    /// Returns the value to send to GitHub; `None` lets GitHub choose.
    pub fn to_request_value(&self) -> Option<String> {
        match self {
            CommitMessage::Default => None,
            CommitMessage::Empty => Some(EMPTY_COMMIT_MESSAGE.to_string()),
            CommitMessage::Text(text) => Some(text.clone()),
        }
    }
}

/// Title and body of a merge commit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitMessages {
    /// `None` lets GitHub choose
    pub title: Option<String>,
    pub message: CommitMessage,
}

/// Performs merges and branch deletions on behalf of the merge loop.
#[async_trait]
pub trait Merger: Send + Sync {
    /// Merges the pull request and returns the SHA of the resulting commit.
    async fn merge(
        &self,
        ctx: &dyn PullContext,
        method: &MergeMethod,
        messages: &CommitMessages,
    ) -> MergeRollerResult<String>;

    /// Deletes the head branch of the pull request.
    async fn delete_head(&self, ctx: &dyn PullContext) -> MergeRollerResult<()>;
}

/// A [`Merger`] that calls the GitHub API.
#[derive(Debug, Clone)]
pub struct GitHubMerger {
    client: GitHubClient,
}

impl GitHubMerger {
    pub fn new(client: GitHubClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Merger for GitHubMerger {
    async fn merge(
        &self,
        ctx: &dyn PullContext,
        method: &MergeMethod,
        messages: &CommitMessages,
    ) -> MergeRollerResult<String> {
        // GitHub has no fast-forward merge method; moving the target branch without force
        // only succeeds when it is a fast-forward.
        if *method == MergeMethod::FastForwardOnly {
            let base = ctx.branches().base;
            self.client
                .update_reference(ctx.owner(), ctx.repo(), &base, ctx.head_sha(), false)
                .await?;
            return Ok(ctx.head_sha().to_string());
        }

        let request = MergeRequest {
            commit_title: messages.title.clone(),
            commit_message: messages.message.to_request_value(),
            sha: Some(ctx.head_sha().to_string()),
            merge_method: method.as_str().to_string(),
        };
        let result = self
            .client
            .merge_pull_request(ctx.owner(), ctx.repo(), ctx.number(), &request)
            .await?;
        Ok(result.sha)
    }

    async fn delete_head(&self, ctx: &dyn PullContext) -> MergeRollerResult<()> {
        let head = ctx.branches().head;
        self.client
            .delete_reference(ctx.owner(), ctx.repo(), &head)
            .await?;
        Ok(())
    }
}

/// Uses a separate merger for target branches that restrict pushes.
///
/// The restricted merger typically authenticates as a user that is allowed to push to
/// protected branches. Without one, every merge goes through the normal merger.
pub struct PushRestrictionMerger {
    normal: Arc<dyn Merger>,
    restricted: Option<Arc<dyn Merger>>,
}

impl PushRestrictionMerger {
    pub fn new(normal: Arc<dyn Merger>, restricted: Option<Arc<dyn Merger>>) -> Self {
        Self { normal, restricted }
    }

    async fn select(&self, ctx: &dyn PullContext) -> MergeRollerResult<&dyn Merger> {
        if let Some(restricted) = &self.restricted {
            if ctx.push_restrictions().await? {
                debug!(pull_request = %ctx.locator(), "Target branch has push restrictions, using the restricted merger");
                return Ok(restricted.as_ref());
            }
        }
        Ok(self.normal.as_ref())
    }
}

#[async_trait]
impl Merger for PushRestrictionMerger {
    async fn merge(
        &self,
        ctx: &dyn PullContext,
        method: &MergeMethod,
        messages: &CommitMessages,
    ) -> MergeRollerResult<String> {
        self.select(ctx).await?.merge(ctx, method, messages).await
    }

    async fn delete_head(&self, ctx: &dyn PullContext) -> MergeRollerResult<()> {
        self.select(ctx).await?.delete_head(ctx).await
    }
}

/// How a merge loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged { sha: String },
    /// The pull request was closed or merged by someone else
    Closed,
    /// GitHub reported the pull request as not mergeable
    NotMergeable,
    /// GitHub answered `405`: a protection condition such as a review is unmet
    RejectedByCondition,
    /// GitHub answered `409`: the head moved or the merge conflicts
    RejectedInvalid,
    /// The attempt budget was spent, or the commit message could not be computed
    GaveUp,
}

/// Computes the squash commit title.
///
/// Returns `None` to let GitHub choose. A non-empty title gets the ` (#N)` suffix.
pub async fn calculate_commit_title(
    ctx: &dyn PullContext,
    options: &SquashOptions,
) -> MergeRollerResult<Option<String>> {
    let title = match options.title {
        TitleStrategy::PullRequestTitle => ctx.title().to_string(),
        TitleStrategy::FirstCommitTitle => ctx
            .commits()
            .await?
            .first()
            .and_then(|c| c.message.lines().next())
            .unwrap_or_default()
            .to_string(),
        TitleStrategy::GithubDefault => String::new(),
    };

    if title.is_empty() {
        return Ok(None);
    }
    Ok(Some(format!("{title} (#{})", ctx.number())))
}

/// Computes the squash commit body.
pub async fn calculate_commit_message(
    ctx: &dyn PullContext,
    options: &SquashOptions,
) -> MergeRollerResult<CommitMessage> {
    match options.body {
        BodyStrategy::PullRequestBody => {
            let body = ctx.body();
            if options.message_delimiter.is_empty() {
                return Ok(if body.is_empty() {
                    CommitMessage::Empty
                } else {
                    CommitMessage::Text(body.to_string())
                });
            }
            Ok(match delimited_text(body, &options.message_delimiter) {
                Some(text) => CommitMessage::Text(text),
                None => CommitMessage::Empty,
            })
        }
        BodyStrategy::SummarizeCommits => {
            let commits = ctx.commits().await?;
            if commits.is_empty() {
                return Ok(CommitMessage::Default);
            }
            let summary: String = commits
                .iter()
                .map(|c| format!("* {}\n", c.message))
                .collect();
            Ok(CommitMessage::Text(summary))
        }
        BodyStrategy::EmptyBody => Ok(CommitMessage::Empty),
    }
}

/// Extracts the text between the first pair of delimiter lines.
fn delimited_text(body: &str, delimiter: &str) -> Option<String> {
    let delimiter = regex::escape(delimiter);
    let pattern = format!(r"(?sm:({delimiter}\s*)^(.*)$(\s*{delimiter}))");
    // The delimiter is escaped, so the pattern always compiles.
    let re = Regex::new(&pattern).ok()?;
    re.captures(body)
        .and_then(|c| c.get(2))
        .map(|m| m.as_str().to_string())
}

async fn commit_messages(
    ctx: &dyn PullContext,
    config: &MergeConfig,
    method: &MergeMethod,
) -> MergeRollerResult<CommitMessages> {
    if *method != MergeMethod::Squash {
        return Ok(CommitMessages::default());
    }

    let options = config.squash_options();
    Ok(CommitMessages {
        title: calculate_commit_title(ctx, &options).await?,
        message: calculate_commit_message(ctx, &options).await?,
    })
}

/// Runs the merge loop to completion on the current task.
pub async fn run_merge(
    ctx: &dyn PullContext,
    merger: &dyn Merger,
    config: &MergeConfig,
    poll: &PollConfig,
) -> MergeOutcome {
    let locator = ctx.locator();
    let base = ctx.branches().base;
    let method = config.effective_method(&base);

    let messages = match commit_messages(ctx, config, &method).await {
        Ok(messages) => messages,
        Err(e) => {
            error!(pull_request = %locator, error = %e, "Failed to compute the commit message, not merging");
            return MergeOutcome::GaveUp;
        }
    };

    for attempt in 1..=poll.max_attempts {
        tokio::time::sleep(poll.delay).await;

        let state = match ctx.merge_state().await {
            Ok(state) => state,
            Err(e) => {
                warn!(pull_request = %locator, attempt, error = %e, "Failed to read the merge state");
                continue;
            }
        };

        if state.closed {
            info!(pull_request = %locator, attempt, "Pull request is closed, nothing to merge");
            return MergeOutcome::Closed;
        }

        match state.mergeable {
            None => {
                debug!(pull_request = %locator, attempt, "Mergeability is not known yet");
                continue;
            }
            Some(false) => {
                info!(pull_request = %locator, attempt, "Pull request is not mergeable");
                return MergeOutcome::NotMergeable;
            }
            Some(true) => {}
        }

        match merger.merge(ctx, &method, &messages).await {
            Ok(sha) => {
                info!(pull_request = %locator, sha = %sha, merge_method = %method, "Merged pull request");
                if config.delete_after_merge {
                    delete_head_branch(ctx, merger).await;
                }
                return MergeOutcome::Merged { sha };
            }
            Err(e) => match e.status_code() {
                Some(405) => {
                    info!(pull_request = %locator, error = %e, "GitHub refused the merge because a branch condition is unmet");
                    return MergeOutcome::RejectedByCondition;
                }
                Some(409) => {
                    info!(pull_request = %locator, error = %e, "GitHub refused the merge because it is no longer valid");
                    return MergeOutcome::RejectedInvalid;
                }
                _ => {
                    warn!(pull_request = %locator, attempt, error = %e, "Merge attempt failed, retrying");
                }
            },
        }
    }

    info!(
        pull_request = %locator,
        attempts = poll.max_attempts,
        "Gave up merging the pull request"
    );
    MergeOutcome::GaveUp
}

/// Deletes the head branch after a merge. Failures are logged and otherwise ignored.
async fn delete_head_branch(ctx: &dyn PullContext, merger: &dyn Merger) {
    let locator = ctx.locator();
    let head = ctx.branches().head;

    if head.contains(':') {
        info!(pull_request = %locator, head = %head, "Head branch is in a fork, not deleting it");
        return;
    }

    match ctx.is_targeted().await {
        Ok(true) => {
            info!(pull_request = %locator, head = %head, "Another open pull request targets the head branch, not deleting it");
            return;
        }
        Ok(false) => {}
        Err(e) => {
            warn!(pull_request = %locator, error = %e, "Failed to check whether the head branch is targeted, not deleting it");
            return;
        }
    }

    match merger.delete_head(ctx).await {
        Ok(()) => info!(pull_request = %locator, head = %head, "Deleted head branch"),
        Err(e) => error!(pull_request = %locator, head = %head, error = %e, "Failed to delete head branch"),
    }
}

/// Starts the merge loop as a detached task.
///
/// The task is not tied to the caller: dropping the handle does not cancel it, and its only
/// failure channel is the log.
pub fn merge_pr(
    ctx: Arc<dyn PullContext>,
    merger: Arc<dyn Merger>,
    config: MergeConfig,
    poll: PollConfig,
) -> JoinHandle<MergeOutcome> {
    let span = info_span!("merge_pr", pull_request = %ctx.locator());
    tokio::spawn(
        async move { run_merge(ctx.as_ref(), merger.as_ref(), &config, &poll).await }
            .instrument(span),
    )
}
