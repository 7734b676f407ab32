//! Server configuration
//!
//! The server reads a TOML file named by `MERGE_ROLLER_CONFIG` (default
//! [`DEFAULT_CONFIG_FILENAME`]) and then applies environment overrides, so secrets never have
//! to be written to disk.
//!
//! # Example TOML Configuration
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//!
//! [github]
//! app_id = 12345
//! private_key_path = "/secrets/app.pem"
//!
//! [options]
//! config_paths = [".merge-roller.v1.yml", ".merge-roller.yml"]
//! poll_attempts = 5
//! poll_delay_ms = 2000
//!
//! [logging]
//! level = "info"
//! json = true
//! ```

use std::{
    fs,
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
    time::Duration,
};

use config_manager::{parse_config, Config, DEFAULT_CONFIG_PATHS};
use merge_roller_core::PollConfig;
use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::ServerConfigError;
use crate::DEFAULT_PORT;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILENAME: &str = "merge-roller.toml";

/// Environment variable naming the configuration file
pub const CONFIG_PATH_VARIABLE: &str = "MERGE_ROLLER_CONFIG";

/// Complete server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub github: GitHubSection,
    pub options: OptionsSection,
    pub logging: LoggingSection,
}

/// Where the HTTP listener binds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// GitHub App credentials.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GitHubSection {
    /// API base URL; `None` means `https://api.github.com`
    pub api_url: Option<String>,
    pub app_id: Option<u64>,
    /// PEM encoded private key
    pub private_key: Option<String>,
    /// File holding the PEM encoded private key, used when `private_key` is not set
    pub private_key_path: Option<PathBuf>,
    /// Secret used to sign webhook deliveries; unsigned deliveries are accepted when unset
    pub webhook_secret: Option<String>,
}

/// Bot behaviour.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OptionsSection {
    /// Repository policy paths, tried in order
    pub config_paths: Vec<String>,
    /// Policy file applied to repositories that have none
    pub fallback_policy_path: Option<PathBuf>,
    /// Personal access token used to merge into branches with push restrictions
    pub push_restricted_token: Option<String>,
    pub poll_attempts: u32,
    pub poll_delay_ms: u64,
}

impl Default for OptionsSection {
    fn default() -> Self {
        Self {
            config_paths: DEFAULT_CONFIG_PATHS.iter().map(|p| p.to_string()).collect(),
            fallback_policy_path: None,
            push_restricted_token: None,
            poll_attempts: PollConfig::DEFAULT_MAX_ATTEMPTS,
            poll_delay_ms: PollConfig::DEFAULT_DELAY.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter used when `RUST_LOG` is not set
    pub level: String,
    /// Emit JSON formatted log lines
    pub json: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl ServerConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(content: &str, path: &str) -> Result<Self, ServerConfigError> {
        toml::from_str(content).map_err(|e| ServerConfigError::Parse {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    /// Loads configuration from a TOML file at the specified path.
    pub fn load(path: &Path) -> Result<Self, ServerConfigError> {
        debug!("Loading configuration from {:?}", path);

        let content = fs::read_to_string(path).map_err(|e| ServerConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// Loads the configuration the way the binary does.
    ///
    /// A missing default file yields the defaults; a missing file named through
    /// `MERGE_ROLLER_CONFIG` is an error. Environment overrides are applied last.
    pub fn from_environment() -> Result<Self, ServerConfigError> {
        let lookup = |name: &str| std::env::var(name).ok();

        let mut config = match lookup(CONFIG_PATH_VARIABLE) {
            Some(path) => Self::load(Path::new(&path))?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILENAME);
                if path.exists() {
                    Self::load(path)?
                } else {
                    info!("No configuration file found, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Applies environment style overrides, reading values through `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ServerConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("GITHUB_APP_ID") {
            self.github.app_id = Some(parse_value("GITHUB_APP_ID", &value)?);
        }
        if let Some(value) = lookup("GITHUB_PRIVATE_KEY") {
            self.github.private_key = Some(value);
        }
        if let Some(value) = lookup("GITHUB_WEBHOOK_SECRET") {
            self.github.webhook_secret = Some(value);
        }
        if let Some(value) = lookup("GITHUB_PUSH_RESTRICTED_TOKEN") {
            self.options.push_restricted_token = Some(value);
        }
        if let Some(value) = lookup("API_HOST") {
            self.server.host = value;
        }
        if let Some(value) = lookup("API_PORT") {
            self.server.port = parse_value("API_PORT", &value)?;
        }
        Ok(())
    }

    /// The address the listener binds to.
    pub fn socket_addr(&self) -> Result<SocketAddr, ServerConfigError> {
        let ip: IpAddr =
            self.server
                .host
                .parse()
                .map_err(|e: std::net::AddrParseError| ServerConfigError::InvalidValue {
                    name: "server.host".to_string(),
                    reason: e.to_string(),
                })?;
        Ok(SocketAddr::from((ip, self.server.port)))
    }

    pub fn app_id(&self) -> Result<u64, ServerConfigError> {
        self.github
            .app_id
            .ok_or(ServerConfigError::MissingSetting("github.app_id"))
    }

    /// Returns the app private key, reading it from `private_key_path` if needed.
    pub fn private_key(&self) -> Result<String, ServerConfigError> {
        if let Some(key) = &self.github.private_key {
            return Ok(key.clone());
        }
        let path = self
            .github
            .private_key_path
            .as_ref()
            .ok_or(ServerConfigError::MissingSetting("github.private_key"))?;
        fs::read_to_string(path).map_err(|e| ServerConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Loads and parses the fallback policy, if one is configured.
    pub fn fallback_policy(&self) -> Result<Option<Config>, ServerConfigError> {
        let Some(path) = &self.options.fallback_policy_path else {
            return Ok(None);
        };
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| ServerConfigError::Read {
            path: display.clone(),
            reason: e.to_string(),
        })?;
        let config = parse_config(&content).map_err(|source| ServerConfigError::FallbackPolicy {
            path: display,
            source,
        })?;
        Ok(Some(config))
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig::new(
            self.options.poll_attempts,
            Duration::from_millis(self.options.poll_delay_ms),
        )
    }
}

fn parse_value<T>(name: &str, value: &str) -> Result<T, ServerConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ServerConfigError::InvalidValue {
            name: name.to_string(),
            reason: e.to_string(),
        })
}
