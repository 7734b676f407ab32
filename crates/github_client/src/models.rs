//! # Models
//!
//! This module contains the data models exchanged with the GitHub REST API.
//!
//! The structs mirror the subset of the GitHub payloads that the bot reads: pull requests,
//! comments, commits, commit statuses, check runs, branch protection and comparisons.
//! Fields that GitHub may omit or send as `null` are either `Option` or defaulted so that
//! partial payloads (for example those embedded in webhook events) still deserialize.

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "models_tests.rs"]
mod tests;

/// Represents a GitHub account (user or organization).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Account {
    /// The login name of the account
    pub login: String,
}

/// Represents a GitHub App installation reference as embedded in webhook payloads.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct InstallationRef {
    /// The unique ID of the installation
    pub id: u64,
}

/// Minimal repository information embedded in pull request and event payloads.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RepositoryRef {
    /// The unique ID of the repository
    pub id: u64,

    /// The repository name, without the owner
    pub name: String,

    /// The `owner/name` form of the repository name
    pub full_name: String,

    /// The owner of the repository
    #[serde(default)]
    pub owner: Account,
}

/// One side (head or base) of a pull request.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct BranchRef {
    /// The branch name, e.g. `feature/login`
    #[serde(rename = "ref")]
    pub ref_name: String,

    /// The commit SHA the branch pointed to when the payload was produced
    pub sha: String,

    /// The `owner:branch` label of the branch
    #[serde(default)]
    pub label: String,

    /// The repository holding the branch; `None` when a fork was deleted
    #[serde(default)]
    pub repo: Option<RepositoryRef>,
}

/// Represents a label on a pull request.
///
/// # Examples
///
/// ```
/// use github_client::models::Label;
///
/// let label = Label {
///     name: "merge when ready".to_string(),
/// };
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Label {
    /// The name of the label
    pub name: String,
}

/// Represents a pull request as returned by `GET /repos/{owner}/{repo}/pulls/{number}`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PullRequest {
    /// The pull request number
    pub number: u64,

    /// The title of the pull request
    pub title: String,

    /// The description of the pull request; GitHub sends `null` for an empty body
    #[serde(default)]
    pub body: Option<String>,

    /// `open` or `closed`
    pub state: String,

    /// Whether the pull request has been merged
    #[serde(default)]
    pub merged: bool,

    /// GitHub's asynchronously computed mergeability; `None` while it is being computed
    #[serde(default)]
    pub mergeable: Option<bool>,

    /// Indicates if the pull request is a draft or not
    #[serde(default)]
    pub draft: bool,

    /// The branch holding the proposed changes
    pub head: BranchRef,

    /// The branch the changes are proposed for
    pub base: BranchRef,

    /// The labels currently applied to the pull request
    #[serde(default)]
    pub labels: Vec<Label>,

    /// The native GitHub auto-merge request, when enabled
    #[serde(default)]
    pub auto_merge: Option<serde_json::Value>,

    /// The user who opened the pull request
    #[serde(default)]
    pub user: Option<Account>,
}

impl PullRequest {
    /// Returns `true` when the pull request is closed (merged or not).
    pub fn is_closed(&self) -> bool {
        self.state.eq_ignore_ascii_case("closed")
    }

    /// Returns `true` when the head branch lives in a different repository than the base.
    pub fn is_from_fork(&self) -> bool {
        match (&self.head.repo, &self.base.repo) {
            (Some(head), Some(base)) => head.id != base.id,
            // A deleted fork has no repository information left.
            (None, _) => true,
            _ => false,
        }
    }

    /// Returns `true` when GitHub auto-merge has been enabled for the pull request.
    pub fn auto_merge_enabled(&self) -> bool {
        self.auto_merge
            .as_ref()
            .map(|v| !v.is_null())
            .unwrap_or(false)
    }
}

/// Represents a comment on an issue or pull request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    /// The unique identifier of the comment
    pub id: u64,

    /// The text content of the comment
    #[serde(default)]
    pub body: String,

    /// The user who made the comment
    #[serde(default)]
    pub user: Option<Account>,
}

/// Git commit details nested in a pull request commit listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitDetails {
    /// The full commit message
    pub message: String,
}

/// A commit in a pull request, as returned by `GET /pulls/{number}/commits`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Commit {
    /// The commit SHA
    pub sha: String,

    /// The git commit data
    pub commit: CommitDetails,
}

/// A single commit status context.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommitStatus {
    /// The status context, e.g. `ci/build`
    pub context: String,

    /// `error`, `failure`, `pending` or `success`
    pub state: String,
}

/// The combined status of a reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CombinedStatus {
    /// The aggregate state of all statuses
    pub state: String,

    /// The latest status for each context
    #[serde(default)]
    pub statuses: Vec<CommitStatus>,
}

/// A single check run reported against a commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckRun {
    /// The unique identifier of the check run
    #[serde(default)]
    pub id: u64,

    /// The check run name as shown in the checks list
    pub name: String,

    /// `queued`, `in_progress` or `completed`
    #[serde(default)]
    pub status: String,

    /// The conclusion of a completed run, e.g. `success` or `failure`
    #[serde(default)]
    pub conclusion: Option<String>,

    /// The commit the check ran against
    #[serde(default)]
    pub head_sha: String,
}

/// A page of check runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckRunList {
    /// Total number of check runs for the reference
    pub total_count: u64,

    /// The check runs on this page
    #[serde(default)]
    pub check_runs: Vec<CheckRun>,
}

/// A named check required by branch protection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequiredCheck {
    /// The status context or check run name
    pub context: String,
}

/// The required status checks of a protected branch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequiredStatusChecks {
    /// Whether the branch must be up to date before merging
    #[serde(default)]
    pub strict: bool,

    /// Legacy list of required contexts
    #[serde(default)]
    pub contexts: Vec<String>,

    /// Required checks including their app restrictions
    #[serde(default)]
    pub checks: Vec<RequiredCheck>,
}

impl RequiredStatusChecks {
    /// Returns the de-duplicated names of all required checks.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let all = self
            .contexts
            .iter()
            .chain(self.checks.iter().map(|c| &c.context));
        for name in all {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// The result of comparing two commits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comparison {
    /// `diverged`, `ahead`, `behind` or `identical`
    pub status: String,

    /// Number of commits the head has that the base does not
    pub ahead_by: u64,

    /// Number of commits the base has that the head does not
    pub behind_by: u64,
}

/// The response of a successful pull request merge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeResult {
    /// The SHA of the merge commit
    pub sha: String,

    /// Whether the pull request was merged
    pub merged: bool,

    /// The message GitHub returned
    #[serde(default)]
    pub message: String,
}

/// The method used to merge a pull request.
///
/// Unrecognized values are preserved rather than rejected so that a repository policy with a
/// typo can still be loaded; the merge loop falls back to a merge commit for them.
///
/// # Examples
///
/// ```rust
/// use github_client::models::MergeMethod;
///
/// assert_eq!(MergeMethod::from("ff-only".to_string()), MergeMethod::FastForwardOnly);
/// assert_eq!(MergeMethod::Squash.as_str(), "squash");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MergeMethod {
    /// Create a merge commit
    #[default]
    Merge,
    /// Squash all commits into a single commit
    Squash,
    /// Rebase the commits onto the base branch
    Rebase,
    /// Move the base branch to the head commit without creating a commit
    FastForwardOnly,
    /// A value GitHub does not know about
    Unrecognized(String),
}

impl MergeMethod {
    /// Returns the configuration spelling of the method.
    pub fn as_str(&self) -> &str {
        match self {
            MergeMethod::Merge => "merge",
            MergeMethod::Squash => "squash",
            MergeMethod::Rebase => "rebase",
            MergeMethod::FastForwardOnly => "ff-only",
            MergeMethod::Unrecognized(value) => value,
        }
    }
}

impl From<String> for MergeMethod {
    fn from(value: String) -> Self {
        match value.as_str() {
            "merge" => MergeMethod::Merge,
            "squash" => MergeMethod::Squash,
            "rebase" => MergeMethod::Rebase,
            "ff-only" => MergeMethod::FastForwardOnly,
            _ => MergeMethod::Unrecognized(value),
        }
    }
}

impl From<MergeMethod> for String {
    fn from(value: MergeMethod) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for MergeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request body for `PUT /repos/{owner}/{repo}/pulls/{number}/merge`.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct MergeRequest {
    /// Title of the commit GitHub creates; GitHub picks one when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_title: Option<String>,

    /// Extra detail for the commit message; GitHub picks one when omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,

    /// The SHA the head must still be at for the merge to go ahead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,

    /// `merge`, `squash` or `rebase`
    pub merge_method: String,
}

/// File content returned by the repository contents API.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FileContent {
    /// The file path relative to the repository root
    pub path: String,

    /// Encoded content; base64 for regular files
    #[serde(default)]
    pub content: String,

    /// The encoding of `content`
    #[serde(default)]
    pub encoding: String,
}
