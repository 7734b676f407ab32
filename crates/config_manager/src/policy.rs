//! Repository merge policy model.
//!
//! These are the normalised types every consumer works with. A policy file is read into the
//! raw shapes in [`crate::legacy`] first, so the legacy field names (`whitelist`, `blacklist`,
//! `allow`, `deny`) and the v0 layout never appear here.
//!
//! # YAML Format
//!
//! ```yaml
//! version: 1
//! merge:
//!   trigger:
//!     labels: ["merge when ready"]
//!   ignore:
//!     labels: ["do not merge"]
//!   method: squash
//!   options:
//!     squash:
//!       title: pull_request_title
//!       body: summarize_commits
//!   delete_after_merge: true
//! update:
//!   trigger:
//!     labels: ["update me"]
//! ```

use github_client::MergeMethod;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;

/// The set of predicates configured for one role, e.g. the merge trigger or the update ignore.
///
/// A kind with no configured values is disabled and never consulted. `max_commits` is
/// disabled when zero or negative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Signals {
    /// Labels, compared case-insensitively
    pub labels: Vec<String>,
    /// Exact comment (or pull request body) text
    pub comments: Vec<String>,
    /// Substrings searched for in the body and every comment
    pub comment_substrings: Vec<String>,
    /// Substrings searched for in the pull request body only
    pub pr_body_substrings: Vec<String>,
    /// Exact target branch names
    pub branches: Vec<String>,
    /// Regular expressions matched against the whole target branch name
    pub branch_patterns: Vec<String>,
    /// Maximum number of commits, inclusive
    pub max_commits: i64,
    /// Match pull requests with GitHub auto-merge enabled
    pub auto_merge: bool,
    /// Match draft pull requests
    pub draft: bool,
}

/// How the title of a squash commit is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitleStrategy {
    PullRequestTitle,
    FirstCommitTitle,
    #[default]
    GithubDefault,
}

/// How the body of a squash commit is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyStrategy {
    PullRequestBody,
    #[default]
    SummarizeCommits,
    EmptyBody,
}

/// Options applied when the effective merge method is `squash`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SquashOptions {
    pub title: TitleStrategy,
    pub body: BodyStrategy,
    /// When set with [`BodyStrategy::PullRequestBody`], only the text between two occurrences
    /// of this marker is used as the commit body.
    pub message_delimiter: String,
}

/// Method specific merge options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub squash: Option<SquashOptions>,
}

/// Policy controlling when and how pull requests are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConfig {
    pub trigger: Signals,
    pub ignore: Signals,
    pub method: MergeMethod,
    /// Per target branch override of `method`
    pub branch_method: HashMap<String, MergeMethod>,
    pub options: MergeOptions,
    /// Status checks required in addition to those from branch protection
    pub required_statuses: Vec<String>,
    pub delete_after_merge: bool,
    /// Allows merging when a pull request has neither required nor successful checks
    pub allow_merge_with_no_checks: bool,
}

impl MergeConfig {
    /// Returns the method to use for a pull request targeting `base_branch`.
    ///
    /// A branch override wins over the default method. Unrecognised methods fall back to
    /// [`MergeMethod::Merge`].
    pub fn effective_method(&self, base_branch: &str) -> MergeMethod {
        let method = self.branch_method.get(base_branch).unwrap_or(&self.method);
        match method {
            MergeMethod::Unrecognized(_) => MergeMethod::Merge,
            other => other.clone(),
        }
    }

    /// Returns the squash options, or the defaults when none were configured.
    pub fn squash_options(&self) -> SquashOptions {
        self.options.squash.clone().unwrap_or_default()
    }
}

/// Policy controlling when pull requests are brought up to date with their target branch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateConfig {
    pub trigger: Signals,
    pub ignore: Signals,
    /// `Some(true)` excludes drafts; `None` and `Some(false)` leave drafts alone
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_drafts: Option<bool>,
    pub required_statuses: Vec<String>,
}

/// A repository's complete, normalised policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub version: i64,
    pub merge: MergeConfig,
    pub update: UpdateConfig,
}
