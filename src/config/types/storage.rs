//! Storage configuration types
//!
//! Where conversation state and the emotion mapping live on disk.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory for conversation records and the summary flag
    /// (defaults to the state directory)
    pub state_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the state directory
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir
            .clone()
            .unwrap_or_else(crate::config::state_dir)
    }
}

/// Emotion sticker configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmotionsConfig {
    /// YAML file holding an `emotion_mapping` table
    /// (defaults to `emotion_config.yaml` in the config directory)
    pub path: Option<PathBuf>,
}

impl EmotionsConfig {
    /// Resolve the emotion mapping file
    pub fn path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| crate::config::config_dir().join("emotion_config.yaml"))
    }
}
