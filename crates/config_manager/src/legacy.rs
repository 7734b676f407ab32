//! Raw policy file shapes and their normalisation.
//!
//! Three generations of policy files are accepted:
//!
//! - v0: a flat `mode`/`strategy` document with no `version` key
//! - v1 with `whitelist`/`blacklist` (or the older `allow`/`deny`) signal sets
//! - v1 with `trigger`/`ignore`
//!
//! Everything is turned into [`Config`] exactly once, here. When a new-style field is present
//! it always wins; otherwise `whitelist` then `allow` stand in for `trigger`, and `blacklist`
//! then `deny` stand in for `ignore`.

use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::policy::{
    BodyStrategy, Config, MergeConfig, MergeOptions, Signals, SquashOptions, UpdateConfig,
};
use github_client::MergeMethod;
use serde::Deserialize;
use std::collections::HashMap;

#[cfg(test)]
#[path = "legacy_tests.rs"]
mod tests;

const V0_UPDATE_LABELS: [&str; 3] = ["update me", "update-me", "update_me"];
const V0_TRIGGER_LABELS: [&str; 3] = ["merge when ready", "merge-when-ready", "merge_when_ready"];
const V0_IGNORE_LABELS: [&str; 3] = ["do not merge", "do-not-merge", "do_not_merge"];
const V0_BODY_MARKER: &str = "==MERGE_WHEN_READY==";
const V0_COMMIT_MESSAGE_DELIMITER: &str = "==COMMIT_MSG==";

/// Picks the first signal set that is present, in priority order.
fn first_present(candidates: [Option<Signals>; 3]) -> Signals {
    candidates.into_iter().flatten().next().unwrap_or_default()
}

/// The `merge` section as written in a v1 file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawMergeConfig {
    trigger: Option<Signals>,
    ignore: Option<Signals>,
    whitelist: Option<Signals>,
    blacklist: Option<Signals>,
    allow: Option<Signals>,
    deny: Option<Signals>,
    method: MergeMethod,
    branch_method: HashMap<String, MergeMethod>,
    options: MergeOptions,
    required_statuses: Vec<String>,
    delete_after_merge: bool,
    allow_merge_with_no_checks: bool,
}

impl From<RawMergeConfig> for MergeConfig {
    fn from(raw: RawMergeConfig) -> Self {
        MergeConfig {
            trigger: first_present([raw.trigger, raw.whitelist, raw.allow]),
            ignore: first_present([raw.ignore, raw.blacklist, raw.deny]),
            method: raw.method,
            branch_method: raw.branch_method,
            options: raw.options,
            required_statuses: raw.required_statuses,
            delete_after_merge: raw.delete_after_merge,
            allow_merge_with_no_checks: raw.allow_merge_with_no_checks,
        }
    }
}

/// The `update` section as written in a v1 file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawUpdateConfig {
    trigger: Option<Signals>,
    ignore: Option<Signals>,
    whitelist: Option<Signals>,
    blacklist: Option<Signals>,
    allow: Option<Signals>,
    deny: Option<Signals>,
    ignore_drafts: Option<bool>,
    required_statuses: Vec<String>,
}

impl From<RawUpdateConfig> for UpdateConfig {
    fn from(raw: RawUpdateConfig) -> Self {
        UpdateConfig {
            trigger: first_present([raw.trigger, raw.whitelist, raw.allow]),
            ignore: first_present([raw.ignore, raw.blacklist, raw.deny]),
            ignore_drafts: raw.ignore_drafts,
            required_statuses: raw.required_statuses,
        }
    }
}

/// A complete v1 file before normalisation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct RawConfigV1 {
    version: i64,
    merge: RawMergeConfig,
    update: RawUpdateConfig,
}

impl From<RawConfigV1> for Config {
    fn from(raw: RawConfigV1) -> Self {
        Config {
            version: raw.version,
            merge: raw.merge.into(),
            update: raw.update.into(),
        }
    }
}

/// A v0 policy file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ConfigV0 {
    /// Absent, null or `0` by the time this shape is chosen
    #[allow(dead_code)]
    version: Option<i64>,
    mode: String,
    strategy: MergeMethod,
    #[serde(alias = "deleteAfterMerge")]
    delete_after_merge: bool,
    #[serde(alias = "ignoreSquashedMessages")]
    ignore_squashed_messages: bool,
}

impl ConfigV0 {
    /// Translates the v0 document into the v1 model.
    ///
    /// Returns `ConfigurationError::UnknownLegacyMode` for any mode other than `whitelist`,
    /// `blacklist` or `body`.
    pub(crate) fn into_config(self) -> ConfigurationResult<Config> {
        let squash_body = if self.ignore_squashed_messages {
            BodyStrategy::EmptyBody
        } else {
            BodyStrategy::SummarizeCommits
        };

        let mut merge = MergeConfig {
            method: self.strategy,
            delete_after_merge: self.delete_after_merge,
            options: MergeOptions {
                squash: Some(SquashOptions {
                    body: squash_body,
                    ..Default::default()
                }),
            },
            ..Default::default()
        };

        match self.mode.as_str() {
            "whitelist" => {
                merge.trigger.labels = to_strings(&V0_TRIGGER_LABELS);
            }
            "blacklist" => {
                merge.ignore.labels = to_strings(&V0_IGNORE_LABELS);
            }
            "body" => {
                merge.trigger.comment_substrings = vec![V0_BODY_MARKER.to_string()];
                merge.options.squash = Some(SquashOptions {
                    body: BodyStrategy::PullRequestBody,
                    message_delimiter: V0_COMMIT_MESSAGE_DELIMITER.to_string(),
                    ..Default::default()
                });
            }
            other => {
                return Err(ConfigurationError::UnknownLegacyMode {
                    mode: other.to_string(),
                })
            }
        }

        Ok(Config {
            version: 1,
            merge,
            update: UpdateConfig {
                trigger: Signals {
                    labels: to_strings(&V0_UPDATE_LABELS),
                    ..Default::default()
                },
                ..Default::default()
            },
        })
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
