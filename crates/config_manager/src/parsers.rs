//! Policy file parser.
//!
//! The version is read from the untyped YAML document first so that a v0 file (no `version`
//! key, or `version: 0`) and a v1 file can be deserialised into their own raw shapes before
//! being normalised into [`Config`].

use crate::errors::{ConfigurationError, ConfigurationResult};
use crate::legacy::{ConfigV0, RawConfigV1};
use crate::policy::Config;
use serde_yaml::Value;
use tracing::debug;

#[cfg(test)]
#[path = "parsers_tests.rs"]
mod tests;

/// Parses the text of a policy file.
///
/// # Errors
///
/// - `ConfigurationError::ParseError` when the text is not valid YAML or a field has the wrong
///   type
/// - `ConfigurationError::UnsupportedVersion` for any version other than 0 or 1
/// - `ConfigurationError::UnknownLegacyMode` for a v0 file with an unknown `mode`
///
/// # Examples
///
/// ```rust
/// use config_manager::parse_config;
///
/// let config = parse_config("version: 1\nmerge:\n  whitelist:\n    labels: [\"ship it\"]\n").unwrap();
/// assert_eq!(config.merge.trigger.labels, vec!["ship it"]);
/// ```
pub fn parse_config(text: &str) -> ConfigurationResult<Config> {
    let document: Value = serde_yaml::from_str(text).map_err(parse_error)?;
    if !document.is_mapping() {
        return Err(ConfigurationError::ParseError {
            reason: "policy file must be a YAML mapping".to_string(),
        });
    }

    let version = match document.get("version") {
        None | Some(Value::Null) => 0,
        Some(value) => value
            .as_i64()
            .ok_or_else(|| ConfigurationError::ParseError {
                reason: format!("version must be an integer, found {value:?}"),
            })?,
    };
    debug!(version = version, "Parsing policy file");

    match version {
        0 => {
            let raw: ConfigV0 = serde_yaml::from_value(document).map_err(parse_error)?;
            raw.into_config()
        }
        1 => {
            let raw: RawConfigV1 = serde_yaml::from_value(document).map_err(parse_error)?;
            Ok(raw.into())
        }
        other => Err(ConfigurationError::UnsupportedVersion { version: other }),
    }
}

fn parse_error(error: serde_yaml::Error) -> ConfigurationError {
    ConfigurationError::ParseError {
        reason: error.to_string(),
    }
}
