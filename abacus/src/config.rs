//! Runtime configuration
//!
//! Sources, lowest precedence first: built-in defaults, a TOML file,
//! `ABACUS_*` variables from an env file (`.env`), the same variables from
//! the process environment. Command-line flags are applied on top by the
//! binary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File read when no explicit config path is given
pub const DEFAULT_CONFIG_FILE: &str = "abacus.toml";

/// Env file read when no explicit one is given; optional
pub const DEFAULT_ENV_FILE: &str = ".env";

pub const ENV_PLUGIN_DIR: &str = "ABACUS_PLUGIN_DIR";
pub const ENV_TIMEOUT_MS: &str = "ABACUS_TIMEOUT_MS";
pub const ENV_LOG: &str = "ABACUS_LOG";
pub const ENV_LOG_FORMAT: &str = "ABACUS_LOG_FORMAT";
pub const ENV_ENVIRONMENT: &str = "ABACUS_ENVIRONMENT";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::InvalidValue {
                key: "log_format".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CalcConfig {
    /// Directory scanned for plugin manifests
    pub plugin_dir: PathBuf,
    /// Per-calculation deadline in milliseconds, 0 disables it
    pub timeout_ms: u64,
    /// tracing-subscriber filter directive, e.g. "info" or "abacus=debug"
    pub log_filter: String,
    pub log_format: LogFormat,
    /// Free-form deployment label, only logged
    pub environment: String,
}

impl Default for CalcConfig {
    fn default() -> Self {
        Self {
            plugin_dir: PathBuf::from("plugins"),
            timeout_ms: 5000,
            log_filter: "warn".to_string(),
            log_format: LogFormat::Compact,
            environment: "development".to_string(),
        }
    }
}

impl CalcConfig {
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Resolve the file layer: an explicit path must exist, the default
    /// `abacus.toml` is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply `ABACUS_*` overrides from the process environment, falling back
    /// to the env file for variables the environment leaves unset. An
    /// explicit `env_file` must exist; the default `.env` is optional.
    pub fn with_env(self, env_file: Option<&Path>) -> Result<Self, ConfigError> {
        let file_vars = read_env_file(env_file)?;
        self.with_env_from(|key| std::env::var(key).ok().or_else(|| file_vars.get(key).cloned()))
    }

    /// Apply overrides from any variable source
    pub fn with_env_from<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_PLUGIN_DIR) {
            self.plugin_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_TIMEOUT_MS.to_string(),
                value: raw.clone(),
            })?;
        }
        if let Some(filter) = lookup(ENV_LOG) {
            self.log_filter = filter;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            self.log_format = format.parse()?;
        }
        if let Some(environment) = lookup(ENV_ENVIRONMENT) {
            self.environment = environment;
        }
        Ok(self)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

/// `KEY=value` pairs of an env file, without touching the process environment
pub(crate) fn read_env_file(explicit: Option<&Path>) -> Result<HashMap<String, String>, ConfigError> {
    let path = explicit.unwrap_or(Path::new(DEFAULT_ENV_FILE));
    let env_file_error = |source| ConfigError::EnvFile { path: path.to_path_buf(), source };

    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) if e.not_found() && explicit.is_none() => return Ok(HashMap::new()),
        Err(e) => return Err(env_file_error(e)),
    };
    entries.collect::<Result<HashMap<_, _>, _>>().map_err(env_file_error)
}
