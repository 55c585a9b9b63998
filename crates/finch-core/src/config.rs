//! Finch configuration
//!
//! Loaded from `~/.finch/config.toml` when present, then overridden by
//! environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `OLLAMA_HOST` | `ollama_host` |
//! | `FINCH_PORT` | `port` |
//! | `FINCH_CORS_ORIGINS` | `cors_origins` (comma separated, `*` for any) |
//! | `FINCH_TOOL_TIMEOUT_SECS` | `tool_timeout_secs` |
//! | `FINCH_DEFAULT_TOOL_MODEL` | `default_tool_model` |
//! | `FINCH_DEFAULT_CHAT_MODEL` | `default_chat_model` |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ai::model::ModelName;
use crate::constants;
use crate::paths;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("tool '{0}' is registered twice")]
    DuplicateTool(String),

    #[error("invalid model identifier: {0:?}")]
    InvalidModel(String),

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinchConfig {
    pub ollama_host: String,
    pub port: u16,
    /// Allowed CORS origins; empty or `*` allows any
    pub cors_origins: Vec<String>,
    pub tool_timeout_secs: u64,
    pub default_tool_model: String,
    pub default_chat_model: String,
}

impl Default for FinchConfig {
    fn default() -> Self {
        Self {
            ollama_host: constants::ai::DEFAULT_OLLAMA_HOST.to_string(),
            port: constants::server::DEFAULT_PORT,
            cors_origins: vec!["*".to_string()],
            tool_timeout_secs: constants::tools::DEFAULT_TOOL_TIMEOUT.as_secs(),
            default_tool_model: constants::ai::DEFAULT_TOOL_MODEL.to_string(),
            default_chat_model: constants::ai::DEFAULT_CHAT_MODEL.to_string(),
        }
    }
}

impl FinchConfig {
    /// Load `~/.finch/config.toml` and apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file(&paths::config_file())?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file; a missing file yields defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Apply overrides from `lookup` (the process environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("OLLAMA_HOST") {
            self.ollama_host = normalize_host(&host);
        }
        if let Some(port) = lookup("FINCH_PORT") {
            self.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "FINCH_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(origins) = lookup("FINCH_CORS_ORIGINS") {
            self.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(secs) = lookup("FINCH_TOOL_TIMEOUT_SECS") {
            self.tool_timeout_secs = secs
                .trim()
                .parse()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "FINCH_TOOL_TIMEOUT_SECS",
                    value: secs.clone(),
                })?;
        }
        if let Some(model) = lookup("FINCH_DEFAULT_TOOL_MODEL") {
            self.default_tool_model = model;
        }
        if let Some(model) = lookup("FINCH_DEFAULT_CHAT_MODEL") {
            self.default_chat_model = model;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ModelName::parse(&self.default_tool_model)?;
        ModelName::parse(&self.default_chat_model)?;
        if self.tool_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "tool_timeout_secs",
                value: "0".to_string(),
            });
        }
        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Whether any origin is allowed
    pub fn cors_allows_any(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

/// `OLLAMA_HOST` is often given as `host:port` without a scheme
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
