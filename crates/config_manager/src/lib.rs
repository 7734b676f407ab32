//! Repository merge policy for MergeRoller.
//!
//! A repository describes when its pull requests are merged or kept up to date in a YAML
//! policy file on its default branch. This crate owns that file format:
//!
//! - [`policy`]: the normalised model (`Config`, `MergeConfig`, `UpdateConfig`, `Signals`)
//! - [`parsers`]: YAML parsing with version detection
//! - `legacy`: translation of v0 files and the `whitelist`/`blacklist`/`allow`/`deny` aliases
//! - [`fetcher`]: loading the policy from a repository ref
//!
//! # Examples
//!
//! ```rust
//! use config_manager::parse_config;
//!
//! let yaml = r#"
//! version: 1
//! merge:
//!   trigger:
//!     labels: ["merge when ready"]
//!   method: squash
//! "#;
//!
//! let config = parse_config(yaml).unwrap();
//! assert_eq!(config.merge.trigger.labels, vec!["merge when ready"]);
//! ```

pub mod errors;
pub mod fetcher;
mod legacy;
pub mod parsers;
pub mod policy;

pub use errors::{ConfigurationError, ConfigurationResult};
pub use fetcher::{ConfigFetcher, FetchedConfig, GitHubConfigFetcher, DEFAULT_CONFIG_PATHS};
pub use parsers::parse_config;
pub use policy::{
    BodyStrategy, Config, MergeConfig, MergeOptions, Signals, SquashOptions, TitleStrategy,
    UpdateConfig,
};
