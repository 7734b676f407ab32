//! # MergeRoller Core
//!
//! This crate holds the decision and action logic of MergeRoller, a bot that merges pull
//! requests once they are ready and keeps open pull requests up to date with their target
//! branch.
//!
//! ## Overview
//!
//! - [`signals`] decides whether a pull request matches a set of trigger or ignore signals
//!   (labels, comments, body text, branch names, commit counts, auto-merge and draft state).
//! - [`evaluate`] combines the signals with commit statuses into the two decisions the bot
//!   makes: [`should_merge_pr`] and [`should_update_pr`].
//! - [`merge`] runs the merge loop, polling GitHub until the pull request can be merged.
//! - [`update`] merges the target branch into the head branch of a pull request.
//!
//! All GitHub reads go through the [`PullContext`] trait and all writes through the
//! [`Merger`] and [`Updater`] traits, so the logic can be exercised without a GitHub server.
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use config_manager::MergeConfig;
//! use github_client::GitHubClient;
//! use merge_roller_core::{
//!     merge_pr, should_merge_pr, GitHubMerger, GitHubPullContext, PollConfig, PullContext,
//! };
//!
//! # async fn example(client: GitHubClient) -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = GitHubPullContext::load(client.clone(), "acme", "widgets", 42).await?;
//! let config = MergeConfig::default();
//!
//! if should_merge_pr(&ctx, &config).await? {
//!     let ctx: Arc<dyn PullContext> = Arc::new(ctx);
//!     merge_pr(ctx, Arc::new(GitHubMerger::new(client)), config, PollConfig::default());
//! }
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub use errors::{MergeRollerError, MergeRollerResult};

pub mod evaluate;
pub use evaluate::{should_merge_pr, should_update_pr, unsatisfied_statuses};

pub mod merge;
pub use merge::{
    calculate_commit_message, calculate_commit_title, merge_pr, run_merge, CommitMessage,
    CommitMessages, GitHubMerger, MergeOutcome, Merger, PushRestrictionMerger,
    EMPTY_COMMIT_MESSAGE,
};

pub mod poll;
pub use poll::PollConfig;

pub mod pull_context;
pub use pull_context::{Branches, CommitInfo, GitHubPullContext, MergeState, PullContext};

pub mod signals;
pub use signals::{MatchResult, Signal, SignalsExt};

pub mod update;
pub use update::{run_update, update_pr, GitHubUpdater, UpdateOutcome, Updater};

#[cfg(test)]
mod testing;
