//! Merge and update decisions.
//!
//! Both decisions fail closed: when the ignore or trigger check cannot be evaluated the pull
//! request is treated as ignored or not triggered, and the error is returned alongside the
//! `false` decision.
//!
//! Review requirements are not evaluated here. GitHub rejects a merge that lacks approvals and
//! the merge loop classifies that rejection.

use config_manager::{MergeConfig, Signals, UpdateConfig};
use tracing::{debug, info};

use crate::pull_context::PullContext;
use crate::signals::SignalsExt;
use crate::{MergeRollerError, MergeRollerResult};

#[cfg(test)]
#[path = "evaluate_tests.rs"]
mod tests;

/// Status contexts that are satisfied by any of their provider specific variants.
const STATUS_ALIASES: &[(&str, &[&str])] = &[(
    "continuous-integration/travis-ci",
    &[
        "continuous-integration/travis-ci/push",
        "continuous-integration/travis-ci/pr",
    ],
)];

fn is_satisfied(required: &str, successful: &[String]) -> bool {
    if successful.iter().any(|s| s == required) {
        return true;
    }
    STATUS_ALIASES
        .iter()
        .filter(|(name, _)| *name == required)
        .flat_map(|(_, aliases)| aliases.iter())
        .any(|alias| successful.iter().any(|s| s == alias))
}

/// Returns the required statuses that have not succeeded, in the order they are required.
pub fn unsatisfied_statuses(required: &[String], successful: &[String]) -> Vec<String> {
    required
        .iter()
        .filter(|r| !is_satisfied(r, successful))
        .cloned()
        .collect()
}

/// Applies the ignore and trigger sets. `Ok(false)` means the pull request must be left alone.
async fn passes_ignore_and_trigger(
    ctx: &dyn PullContext,
    ignore: &Signals,
    trigger: &Signals,
    action: &str,
) -> MergeRollerResult<bool> {
    let locator = ctx.locator();

    if ignore.enabled() {
        let result = ignore
            .matches_any(ctx, "ignore")
            .await
            .map_err(|e| MergeRollerError::IgnoreCheck(Box::new(e)))?;
        if result.matched {
            info!(pull_request = %locator, reason = %result.reason, "Pull request is ignored for {}", action);
            return Ok(false);
        }
        debug!(pull_request = %locator, reason = %result.reason, "Pull request is not ignored");
    } else {
        debug!(pull_request = %locator, "No ignore signals configured for {}", action);
    }

    if trigger.enabled() {
        let result = trigger
            .matches_any(ctx, "trigger")
            .await
            .map_err(|e| MergeRollerError::TriggerCheck(Box::new(e)))?;
        if !result.matched {
            info!(pull_request = %locator, reason = %result.reason, "Pull request is not triggered for {}", action);
            return Ok(false);
        }
        debug!(pull_request = %locator, reason = %result.reason, "Pull request is triggered");
    } else {
        debug!(pull_request = %locator, "No trigger signals configured for {}", action);
    }

    Ok(true)
}

/// Decides whether a pull request should be merged.
///
/// The pull request must not match the ignore set, must match the trigger set when one is
/// configured, and every status required by branch protection or by the policy must have
/// succeeded. A pull request with no required and no successful statuses is only merged when
/// `allow_merge_with_no_checks` is set.
///
/// # Errors
///
/// On any error the decision is `false`; the error is returned so that the caller can log it.
pub async fn should_merge_pr(
    ctx: &dyn PullContext,
    config: &MergeConfig,
) -> MergeRollerResult<bool> {
    if !passes_ignore_and_trigger(ctx, &config.ignore, &config.trigger, "merge").await? {
        return Ok(false);
    }

    let locator = ctx.locator();
    let status_error = |e| MergeRollerError::StatusCheck(Box::new(e));

    let mut required = ctx.required_statuses().await.map_err(status_error)?;
    for status in &config.required_statuses {
        if !required.contains(status) {
            required.push(status.clone());
        }
    }
    let successful = ctx
        .current_successful_statuses()
        .await
        .map_err(status_error)?;

    let unsatisfied = unsatisfied_statuses(&required, &successful);
    if !unsatisfied.is_empty() {
        info!(
            pull_request = %locator,
            unsatisfied = ?unsatisfied,
            "Pull request is waiting for required statuses"
        );
        return Ok(false);
    }

    if required.is_empty() && successful.is_empty() && !config.allow_merge_with_no_checks {
        info!(
            pull_request = %locator,
            "Pull request has no status checks and merging without checks is not allowed"
        );
        return Ok(false);
    }

    debug!(pull_request = %locator, "Pull request should be merged");
    Ok(true)
}

/// Decides whether a pull request should be brought up to date with its target branch.
///
/// Uses the same ignore and trigger rules as [`should_merge_pr`]. Drafts are skipped only
/// when `ignore_drafts` is explicitly `true`, and the policy's `required_statuses`, if any,
/// must all have succeeded.
///
/// # Errors
///
/// On any error the decision is `false`; the error is returned so that the caller can log it.
pub async fn should_update_pr(
    ctx: &dyn PullContext,
    config: &UpdateConfig,
) -> MergeRollerResult<bool> {
    if config.ignore_drafts == Some(true) && ctx.is_draft() {
        info!(pull_request = %ctx.locator(), "Draft pull requests are not updated");
        return Ok(false);
    }

    if !passes_ignore_and_trigger(ctx, &config.ignore, &config.trigger, "update").await? {
        return Ok(false);
    }

    if !config.required_statuses.is_empty() {
        let successful = ctx
            .current_successful_statuses()
            .await
            .map_err(|e| MergeRollerError::StatusCheck(Box::new(e)))?;
        let unsatisfied = unsatisfied_statuses(&config.required_statuses, &successful);
        if !unsatisfied.is_empty() {
            info!(
                pull_request = %ctx.locator(),
                unsatisfied = ?unsatisfied,
                "Pull request is waiting for statuses required before updating"
            );
            return Ok(false);
        }
    }

    Ok(true)
}
