//! Configuration paths
//!
//! Utilities for resolving configuration and state file paths.

use std::path::{Path, PathBuf};

/// Get the configuration directory
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("OCBOT_CONFIG_DIR") {
        return PathBuf::from(dir);
    }

    dirs::config_dir()
        .map(|d| d.join("ocbot"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".config").join("ocbot"))
                .unwrap_or_else(|| PathBuf::from(".ocbot"))
        })
}

/// Get the main configuration file path
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("OCBOT_CONFIG") {
        return PathBuf::from(path);
    }

    config_dir().join("config.json")
}

/// Get the state directory (conversation records, summary flag)
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("OCBOT_STATE_DIR") {
        return PathBuf::from(dir);
    }

    dirs::data_dir()
        .map(|d| d.join("ocbot"))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".local").join("share").join("ocbot"))
                .unwrap_or_else(|| PathBuf::from(".ocbot"))
        })
}

/// Ensure a directory exists
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
