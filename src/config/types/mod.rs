//! Configuration types module
//!
//! Re-exports all configuration types.

pub mod channel;
pub mod provider;
pub mod speech;
pub mod storage;

use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Primary chat API
    #[serde(default)]
    pub chat: provider::ChatApiConfig,

    /// Memory (summarization) API
    #[serde(default)]
    pub memory: provider::MemoryApiConfig,

    /// Knowledge-base API (permanent memories are skipped when absent)
    pub knowledge: Option<provider::KnowledgeBaseConfig>,

    /// QQ bot credentials
    pub qq: Option<channel::QqConfig>,

    /// Speech synthesis (voice replies are disabled when absent)
    pub speech: Option<speech::SpeechConfig>,

    /// Emotion sticker mapping
    #[serde(default)]
    pub emotions: storage::EmotionsConfig,

    /// Webhook gateway
    #[serde(default)]
    pub gateway: channel::GatewayConfig,

    /// State storage
    #[serde(default)]
    pub storage: storage::StorageConfig,

    /// Logging
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Load configuration from defaults, the config file and environment
    /// variable overrides
    pub fn from_env() -> crate::error::Result<Self> {
        crate::config::load_config()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level filter used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info,ocbot=debug".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(crate::error::Error::Config(format!(
                "Invalid log format: {}. Valid options: pretty, json",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.chat.user, "admin");
        assert_eq!(config.memory.summary_interval, 10);
        assert_eq!(config.gateway.port, 8080);
        assert!(config.speech.is_none());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
