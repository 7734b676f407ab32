//! Signal matching.
//!
//! A [`Signal`] is one configured predicate kind borrowed from a
//! [`config_manager::Signals`] set. [`SignalsExt`] combines the kinds of a set with ANY or ALL
//! semantics. Disabled kinds never touch the pull request.

use async_trait::async_trait;
use config_manager::Signals;
use regex::Regex;

use crate::pull_context::PullContext;
use crate::{MergeRollerError, MergeRollerResult};

#[cfg(test)]
#[path = "signals_tests.rs"]
mod tests;

/// The outcome of matching a signal, with a reason suitable for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub matched: bool,
    pub reason: String,
}

impl MatchResult {
    fn matched(reason: String) -> Self {
        Self {
            matched: true,
            reason,
        }
    }

    fn unmatched(reason: impl Into<String>) -> Self {
        Self {
            matched: false,
            reason: reason.into(),
        }
    }
}

/// One predicate kind and its configured values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal<'a> {
    /// Case-insensitive label equality
    Labels(&'a [String]),
    /// Exact equality with the body or a comment
    Comments(&'a [String]),
    /// Substring of the body or a comment
    CommentSubstrings(&'a [String]),
    /// Substring of the body
    PrBodySubstrings(&'a [String]),
    /// Exact target branch name
    Branches(&'a [String]),
    /// Full-string regular expression on the target branch name
    BranchPatterns(&'a [String]),
    /// Inclusive upper bound on the number of commits
    MaxCommits(i64),
    AutoMerge(bool),
    Draft(bool),
}

impl Signal<'_> {
    /// Returns `true` when the kind has configured values.
    pub fn enabled(&self) -> bool {
        match self {
            Signal::Labels(values)
            | Signal::Comments(values)
            | Signal::CommentSubstrings(values)
            | Signal::PrBodySubstrings(values)
            | Signal::Branches(values)
            | Signal::BranchPatterns(values) => !values.is_empty(),
            Signal::MaxCommits(max) => *max > 0,
            Signal::AutoMerge(enabled) | Signal::Draft(enabled) => *enabled,
        }
    }

    /// Matches the signal against a pull request.
    ///
    /// A disabled signal returns an unmatched result with an empty reason without reading the
    /// pull request. Errors only come from loading pull request data or from an invalid branch
    /// pattern.
    pub async fn matches(
        &self,
        ctx: &dyn PullContext,
        tag: &str,
    ) -> MergeRollerResult<MatchResult> {
        if !self.enabled() {
            return Ok(MatchResult::unmatched(""));
        }

        match self {
            Signal::Labels(values) => {
                let labels = ctx.labels().await?;
                let found = labels.iter().find_map(|label| {
                    let label = label.to_lowercase();
                    values.iter().find(|wanted| wanted.to_lowercase() == label)
                });
                Ok(match found {
                    Some(label) => {
                        MatchResult::matched(format!("pull request has a {tag} label: {label:?}"))
                    }
                    None => MatchResult::unmatched(""),
                })
            }
            Signal::Comments(values) => {
                if values.iter().any(|c| c == ctx.body()) {
                    return Ok(MatchResult::matched(format!(
                        "pull request body is a {tag} comment"
                    )));
                }
                let comments = ctx.comments().await?;
                for comment in &comments {
                    if let Some(value) = values.iter().find(|v| *v == comment) {
                        return Ok(MatchResult::matched(format!(
                            "pull request has a {tag} comment: {value:?}"
                        )));
                    }
                }
                Ok(MatchResult::unmatched(""))
            }
            Signal::CommentSubstrings(values) => {
                if let Some(value) = values.iter().find(|v| ctx.body().contains(v.as_str())) {
                    return Ok(MatchResult::matched(format!(
                        "pull request body contains a {tag} substring: {value:?}"
                    )));
                }
                let comments = ctx.comments().await?;
                for comment in &comments {
                    if let Some(value) = values.iter().find(|v| comment.contains(v.as_str())) {
                        return Ok(MatchResult::matched(format!(
                            "pull request comment contains a {tag} substring: {value:?}"
                        )));
                    }
                }
                Ok(MatchResult::unmatched(""))
            }
            Signal::PrBodySubstrings(values) => {
                Ok(match values.iter().find(|v| ctx.body().contains(v.as_str())) {
                    Some(value) => MatchResult::matched(format!(
                        "pull request body contains a {tag} pr_body_substring: {value:?}"
                    )),
                    None => MatchResult::unmatched(""),
                })
            }
            Signal::Branches(values) => {
                let target = ctx.branches().base;
                Ok(match values.iter().find(|b| **b == target) {
                    Some(branch) => MatchResult::matched(format!(
                        "pull request target is a {tag} branch: {branch:?}"
                    )),
                    None => MatchResult::unmatched(""),
                })
            }
            Signal::BranchPatterns(patterns) => {
                let target = ctx.branches().base;
                for pattern in patterns.iter() {
                    if anchored(pattern)?.is_match(&target) {
                        return Ok(MatchResult::matched(format!(
                            "pull request target branch ({target:?}) matches pattern: {pattern:?}"
                        )));
                    }
                }
                Ok(MatchResult::unmatched(""))
            }
            Signal::MaxCommits(max) => {
                let count = ctx.commits().await?.len() as i64;
                Ok(if count <= *max {
                    MatchResult::matched(format!(
                        "pull request has {count} commits, no more than the {tag} maximum of {max}"
                    ))
                } else {
                    MatchResult::unmatched("")
                })
            }
            Signal::AutoMerge(_) => Ok(if ctx.auto_merge() {
                MatchResult::matched(format!("pull request is configured to {tag} with auto-merge"))
            } else {
                MatchResult::unmatched("")
            }),
            Signal::Draft(_) => Ok(if ctx.is_draft() {
                MatchResult::matched(format!("pull request is a draft and {tag} matches drafts"))
            } else {
                MatchResult::unmatched("")
            }),
        }
    }
}

fn anchored(pattern: &str) -> MergeRollerResult<Regex> {
    Regex::new(&format!("^(?:{pattern})$")).map_err(|e| MergeRollerError::InvalidBranchPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Enablement and ANY/ALL matching for a signal set.
#[async_trait]
pub trait SignalsExt {
    /// Returns `true` when at least one kind is enabled.
    fn enabled(&self) -> bool;

    /// Returns on the first enabled kind that matches.
    ///
    /// Kinds are tried in the order labels, comment substrings, comments, body substrings,
    /// branches, branch patterns, auto-merge, draft. `max_commits` is not consulted.
    async fn matches_any(&self, ctx: &dyn PullContext, tag: &str)
        -> MergeRollerResult<MatchResult>;

    /// Requires every enabled kind, including `max_commits`, to match.
    async fn matches_all(&self, ctx: &dyn PullContext, tag: &str)
        -> MergeRollerResult<MatchResult>;
}

fn any_order(signals: &Signals) -> [Signal<'_>; 8] {
    [
        Signal::Labels(&signals.labels),
        Signal::CommentSubstrings(&signals.comment_substrings),
        Signal::Comments(&signals.comments),
        Signal::PrBodySubstrings(&signals.pr_body_substrings),
        Signal::Branches(&signals.branches),
        Signal::BranchPatterns(&signals.branch_patterns),
        Signal::AutoMerge(signals.auto_merge),
        Signal::Draft(signals.draft),
    ]
}

fn all_order(signals: &Signals) -> [Signal<'_>; 9] {
    [
        Signal::Labels(&signals.labels),
        Signal::CommentSubstrings(&signals.comment_substrings),
        Signal::Comments(&signals.comments),
        Signal::PrBodySubstrings(&signals.pr_body_substrings),
        Signal::Branches(&signals.branches),
        Signal::BranchPatterns(&signals.branch_patterns),
        Signal::MaxCommits(signals.max_commits),
        Signal::AutoMerge(signals.auto_merge),
        Signal::Draft(signals.draft),
    ]
}

fn nothing_enabled(tag: &str) -> MatchResult {
    MatchResult::unmatched(format!("no {tag} signals provided to match against"))
}

#[async_trait]
impl SignalsExt for Signals {
    fn enabled(&self) -> bool {
        all_order(self).iter().any(Signal::enabled)
    }

    async fn matches_any(
        &self,
        ctx: &dyn PullContext,
        tag: &str,
    ) -> MergeRollerResult<MatchResult> {
        if !SignalsExt::enabled(self) {
            return Ok(nothing_enabled(tag));
        }

        for signal in any_order(self) {
            let result = signal.matches(ctx, tag).await?;
            if result.matched {
                return Ok(result);
            }
        }

        Ok(MatchResult::unmatched(format!(
            "pull request does not match the {tag}"
        )))
    }

    async fn matches_all(
        &self,
        ctx: &dyn PullContext,
        tag: &str,
    ) -> MergeRollerResult<MatchResult> {
        if !SignalsExt::enabled(self) {
            return Ok(nothing_enabled(tag));
        }

        for signal in all_order(self) {
            if !signal.enabled() {
                continue;
            }
            if !signal.matches(ctx, tag).await?.matched {
                return Ok(MatchResult::unmatched(format!(
                    "pull request does not match all {tag} signals"
                )));
            }
        }

        Ok(MatchResult::matched(format!(
            "pull request matches all {tag} signals"
        )))
    }
}
