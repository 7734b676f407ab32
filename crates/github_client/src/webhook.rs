//! GitHub webhook event types and payloads.
//!
//! Only the events that can change whether a pull request should be merged or updated are
//! modelled. Each payload struct keeps the handful of fields the dispatcher reads.

use serde::{Deserialize, Serialize};

use crate::models::{Account, CheckRun, Comment, InstallationRef, PullRequest, RepositoryRef};

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;

/// GitHub webhook event types handled by the bot.
///
/// See [GitHub webhook events documentation](https://docs.github.com/en/webhooks/webhook-events-and-payloads).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookEvent {
    /// Check run created, completed or re-requested
    CheckRun,
    /// Issue or pull request comment activity
    IssueComment,
    /// Webhook configuration test delivery
    Ping,
    /// Activity related to pull requests
    PullRequest,
    /// Activity related to pull request reviews
    PullRequestReview,
    /// Any Git push to a repository
    Push,
    /// Commit status changes
    Status,
}

impl WebhookEvent {
    /// Converts the value of the `X-GitHub-Event` header to a `WebhookEvent`.
    ///
    /// Returns `None` for events the bot does not handle.
    pub fn from_header(s: &str) -> Option<Self> {
        match s {
            "check_run" => Some(Self::CheckRun),
            "issue_comment" => Some(Self::IssueComment),
            "ping" => Some(Self::Ping),
            "pull_request" => Some(Self::PullRequest),
            "pull_request_review" => Some(Self::PullRequestReview),
            "push" => Some(Self::Push),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    /// Converts the WebhookEvent to its header spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CheckRun => "check_run",
            Self::IssueComment => "issue_comment",
            Self::Ping => "ping",
            Self::PullRequest => "pull_request",
            Self::PullRequestReview => "pull_request_review",
            Self::Push => "push",
            Self::Status => "status",
        }
    }
}

impl std::fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a `pull_request` event.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    /// What happened, e.g. `opened`, `labeled`, `synchronize`
    pub action: String,
    /// The pull request after the change
    pub pull_request: PullRequest,
    /// The repository of the pull request
    pub repository: RepositoryRef,
    /// The app installation that received the event
    pub installation: Option<InstallationRef>,
}

/// Payload of a `pull_request_review` event.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestReviewEvent {
    /// What happened, e.g. `submitted`
    pub action: String,
    /// The reviewed pull request
    pub pull_request: PullRequest,
    /// The repository of the pull request
    pub repository: RepositoryRef,
    /// The app installation that received the event
    pub installation: Option<InstallationRef>,
}

/// The issue an `issue_comment` event refers to.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueRef {
    /// The issue or pull request number
    pub number: u64,
    /// Present when the issue is a pull request
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

/// Payload of an `issue_comment` event.
#[derive(Debug, Clone, Deserialize)]
pub struct IssueCommentEvent {
    /// What happened, e.g. `created`, `edited`
    pub action: String,
    /// The issue or pull request that was commented on
    pub issue: IssueRef,
    /// The comment itself
    pub comment: Comment,
    /// The repository of the issue
    pub repository: RepositoryRef,
    /// The app installation that received the event
    pub installation: Option<InstallationRef>,
}

impl IssueCommentEvent {
    /// Returns `true` when the comment was made on a pull request rather than an issue.
    pub fn is_pull_request(&self) -> bool {
        self.issue.pull_request.is_some()
    }
}

/// Payload of a `status` event.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusEvent {
    /// The commit the status was reported for
    pub sha: String,
    /// `pending`, `success`, `failure` or `error`
    pub state: String,
    /// The status context
    pub context: String,
    /// The repository of the commit
    pub repository: RepositoryRef,
    /// The app installation that received the event
    pub installation: Option<InstallationRef>,
}

/// A pull request reference listed in a check run.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PullRequestLink {
    /// The pull request number
    pub number: u64,
}

/// Check run data embedded in a `check_run` event.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRunPayload {
    /// The check run itself
    #[serde(flatten)]
    pub run: CheckRun,
    /// Pull requests whose head matches the checked commit
    #[serde(default)]
    pub pull_requests: Vec<PullRequestLink>,
}

/// Payload of a `check_run` event.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRunEvent {
    /// What happened, e.g. `completed`
    pub action: String,
    /// The check run
    pub check_run: CheckRunPayload,
    /// The repository of the commit
    pub repository: RepositoryRef,
    /// The app installation that received the event
    pub installation: Option<InstallationRef>,
}

/// Payload of a `push` event.
#[derive(Debug, Clone, Deserialize)]
pub struct PushEvent {
    /// The full reference that was pushed, e.g. `refs/heads/main`
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// The SHA the reference points to after the push
    pub after: String,
    /// Whether the push deleted the reference
    #[serde(default)]
    pub deleted: bool,
    /// The repository that was pushed to
    pub repository: RepositoryRef,
    /// The user who pushed
    #[serde(default)]
    pub sender: Option<Account>,
    /// The app installation that received the event
    pub installation: Option<InstallationRef>,
}

impl PushEvent {
    /// Returns the branch name when the push updated a branch.
    pub fn branch(&self) -> Option<&str> {
        self.git_ref.strip_prefix("refs/heads/")
    }
}
