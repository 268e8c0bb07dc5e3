//! Remote API configuration types
//!
//! Configuration for the primary chat API, the memory API and the
//! knowledge-base (dataset) API.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_secret() -> SecretString {
    SecretString::from(String::new())
}

fn default_timeout() -> Duration {
    Duration::from_secs(120)
}

/// Primary chat API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatApiConfig {
    /// Full URL of the `chat-messages` endpoint
    #[serde(default)]
    pub url: String,
    /// Bearer token
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// User identifier sent with every request
    #[serde(default = "default_chat_user")]
    pub user: String,
    /// Answer shown when the API call fails
    #[serde(default = "default_fallback_answer")]
    pub fallback_answer: String,
    /// Request timeout
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

impl Default for ChatApiConfig {
    fn default() -> Self {
        ChatApiConfig {
            url: String::new(),
            api_key: default_secret(),
            user: default_chat_user(),
            fallback_answer: default_fallback_answer(),
            timeout: default_timeout(),
        }
    }
}

fn default_chat_user() -> String {
    "admin".to_string()
}

fn default_fallback_answer() -> String {
    "抱歉，服务暂时不可用".to_string()
}

/// Memory API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryApiConfig {
    /// Whether exchanges are forwarded to the memory API at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Full URL of the memory app's `chat-messages` endpoint
    #[serde(default)]
    pub url: String,
    /// Bearer token
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// User identifier sent with every request
    #[serde(default = "default_memory_user")]
    pub user: String,
    /// A summary round is requested every this many recorded turns
    #[serde(default = "default_summary_interval")]
    pub summary_interval: u64,
    /// Request timeout
    #[serde(with = "humantime_serde", default = "default_timeout")]
    pub timeout: Duration,
}

impl Default for MemoryApiConfig {
    fn default() -> Self {
        MemoryApiConfig {
            enabled: true,
            url: String::new(),
            api_key: default_secret(),
            user: default_memory_user(),
            summary_interval: default_summary_interval(),
            timeout: default_timeout(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_memory_user() -> String {
    "bot".to_string()
}

fn default_summary_interval() -> u64 {
    10
}

/// Knowledge-base (dataset) API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBaseConfig {
    /// API base URL, e.g. `https://api.dify.ai`
    pub base_url: String,
    /// Dataset API key
    #[serde(skip_serializing, default = "default_secret")]
    pub api_key: SecretString,
    /// Request timeout
    #[serde(with = "humantime_serde", default = "default_kb_timeout")]
    pub timeout: Duration,
}

fn default_kb_timeout() -> Duration {
    Duration::from_secs(30)
}

impl KnowledgeBaseConfig {
    /// Create a knowledge-base config with default timeout
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        KnowledgeBaseConfig {
            base_url: base_url.into(),
            api_key: SecretString::from(api_key.into()),
            timeout: default_kb_timeout(),
        }
    }
}
