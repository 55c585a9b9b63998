//! Centralized path utilities

use std::path::PathBuf;

use crate::constants::paths;

/// Get the finch config directory (~/.finch)
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(paths::CONFIG_DIR_NAME)
}

/// Get the config file (~/.finch/config.toml)
pub fn config_file() -> PathBuf {
    config_dir().join(paths::CONFIG_FILE_NAME)
}

/// Get the logs directory (~/.finch/logs)
pub fn logs_dir() -> PathBuf {
    config_dir().join("logs")
}
