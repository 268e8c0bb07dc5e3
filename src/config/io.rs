//! Configuration I/O - Loading and saving configuration
//!
//! Handles reading configuration from files and environment variables.

use std::path::Path;

use secrecy::SecretString;

use super::types::{channel::QqConfig, provider::KnowledgeBaseConfig, speech::SpeechConfig, Config};
use crate::error::{Error, Result};

/// Load configuration with layered precedence:
/// 1. Config file (config.json / config.toml) if it exists, otherwise defaults
/// 2. Environment variable overrides (includes .env)
pub fn load_config() -> Result<Config> {
    let config_path = super::paths::config_path();

    let mut config = if config_path.exists() {
        load_config_from_path(&config_path)?
    } else {
        Config::default()
    };

    dotenvy::dotenv().ok();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Load configuration from a specific path
pub fn load_config_from_path(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    let config: Config = if path.extension().map_or(false, |ext| ext == "json") {
        json5::from_str(&content).map_err(|e| Error::Config(format!("Invalid JSON config: {}", e)))?
    } else if path.extension().map_or(false, |ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("Invalid TOML config: {}", e)))?
    } else {
        json5::from_str(&content)
            .or_else(|_| toml::from_str(&content).map_err(|e| Error::Config(e.to_string())))
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))?
    };

    Ok(config)
}

/// Overlay environment variables onto an existing config.
///
/// `lookup` abstracts `std::env::var` so overrides can be exercised without
/// touching the process environment.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    // Primary chat API
    if let Some(url) = lookup("CHAT_API_URL") {
        config.chat.url = url;
    }
    if let Some(key) = lookup("CHAT_API_KEY") {
        config.chat.api_key = SecretString::from(key);
    }
    if let Some(user) = lookup("CHAT_API_USER") {
        config.chat.user = user;
    }

    // Memory API
    if let Some(url) = lookup("MEMORY_API_URL") {
        config.memory.url = url;
    }
    if let Some(key) = lookup("MEMORY_API_KEY") {
        config.memory.api_key = SecretString::from(key);
    }
    if let Some(v) = lookup("MEMORY_ENABLED") {
        config.memory.enabled = v == "true" || v == "1";
    }
    if let Some(interval) = lookup("MEMORY_SUMMARY_INTERVAL") {
        if let Ok(v) = interval.parse() {
            config.memory.summary_interval = v;
        }
    }

    // Knowledge base
    if let Some(base_url) = lookup("KNOWLEDGE_API_URL") {
        let kb = config
            .knowledge
            .get_or_insert_with(|| KnowledgeBaseConfig::new(String::new(), String::new()));
        kb.base_url = base_url;
    }
    if let Some(key) = lookup("KNOWLEDGE_API_KEY") {
        let kb = config
            .knowledge
            .get_or_insert_with(|| KnowledgeBaseConfig::new(String::new(), String::new()));
        kb.api_key = SecretString::from(key);
    }

    // QQ bot
    if let Some(app_id) = lookup("QQ_APP_ID") {
        let qq = config
            .qq
            .get_or_insert_with(|| QqConfig::new(String::new(), String::new()));
        qq.app_id = app_id;
    }
    if let Some(secret) = lookup("QQ_APP_SECRET") {
        let qq = config
            .qq
            .get_or_insert_with(|| QqConfig::new(String::new(), String::new()));
        qq.secret = SecretString::from(secret);
    }
    if let Some(v) = lookup("QQ_SANDBOX") {
        let qq = config
            .qq
            .get_or_insert_with(|| QqConfig::new(String::new(), String::new()));
        qq.sandbox = v == "true" || v == "1";
    }

    // Speech
    if let Some(key) = lookup("SPEECH_KEY") {
        let speech = config.speech.get_or_insert_with(SpeechConfig::default);
        speech.key = SecretString::from(key);
    }
    if let Some(region) = lookup("SPEECH_REGION") {
        let speech = config.speech.get_or_insert_with(SpeechConfig::default);
        speech.region = region;
    }
    if let Some(voice) = lookup("SPEECH_VOICE_NAME") {
        if let Some(ref mut speech) = config.speech {
            speech.voice_name = voice;
        }
    }
    if let Some(style) = lookup("SPEECH_STYLE") {
        if let Some(ref mut speech) = config.speech {
            speech.style = style;
        }
    }

    // Files
    if let Some(path) = lookup("EMOTION_CONFIG") {
        config.emotions.path = Some(path.into());
    }
    if let Some(dir) = lookup("OCBOT_STATE_DIR") {
        config.storage.state_dir = Some(dir.into());
    }

    // Gateway
    if let Some(bind) = lookup("GATEWAY_BIND") {
        config.gateway.bind = bind;
    }
    if let Some(port) = lookup("GATEWAY_PORT") {
        if let Ok(port) = port.parse() {
            config.gateway.port = port;
        }
    }

    // Logging
    if let Some(format) = lookup("LOG_FORMAT") {
        if let Ok(format) = format.parse() {
            config.log.format = format;
        }
    }
}

/// Save configuration to a file
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let content = if path.extension().map_or(false, |ext| ext == "toml") {
        toml::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    } else {
        serde_json::to_string_pretty(config)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test_config.json");

        let mut config = Config::default();
        config.chat.url = "https://api.dify.ai/v1/chat-messages".to_string();
        config.memory.summary_interval = 5;
        save_config(&config, &path).unwrap();

        let loaded = load_config_from_path(&path).unwrap();
        assert_eq!(loaded.chat.url, config.chat.url);
        assert_eq!(loaded.memory.summary_interval, 5);
        // Secrets are never written out
        assert!(loaded.chat.api_key.expose_secret().is_empty());
    }

    #[test]
    fn test_load_toml_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[chat]
url = "http://localhost/v1/chat-messages"
api_key = "app-123"

[qq]
app_id = "1024"
secret = "abc"
sandbox = true
"#,
        )
        .unwrap();

        let config = load_config_from_path(&path).unwrap();
        assert_eq!(config.chat.api_key.expose_secret(), "app-123");
        let qq = config.qq.unwrap();
        assert_eq!(qq.api_base(), "https://sandbox.api.sgroup.qq.com");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CHAT_API_URL", "http://chat/v1/chat-messages"),
            ("CHAT_API_KEY", "app-chat"),
            ("MEMORY_SUMMARY_INTERVAL", "20"),
            ("KNOWLEDGE_API_URL", "http://kb"),
            ("KNOWLEDGE_API_KEY", "dataset-key"),
            ("SPEECH_REGION", "eastasia"),
            ("GATEWAY_PORT", "not-a-port"),
            ("LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.chat.url, "http://chat/v1/chat-messages");
        assert_eq!(config.chat.api_key.expose_secret(), "app-chat");
        assert_eq!(config.memory.summary_interval, 20);
        let kb = config.knowledge.unwrap();
        assert_eq!(kb.base_url, "http://kb");
        assert_eq!(kb.api_key.expose_secret(), "dataset-key");
        assert_eq!(config.speech.unwrap().region, "eastasia");
        // Unparseable values keep the default
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.log.format, crate::config::LogFormat::Json);
    }

    #[test]
    fn test_secret_overrides_create_sections() {
        let vars: HashMap<&str, &str> = [
            ("KNOWLEDGE_API_KEY", "dataset-key"),
            ("QQ_APP_SECRET", "qq-secret"),
            ("QQ_SANDBOX", "1"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string()));

        let kb = config.knowledge.unwrap();
        assert_eq!(kb.api_key.expose_secret(), "dataset-key");
        let qq = config.qq.unwrap();
        assert_eq!(qq.secret.expose_secret(), "qq-secret");
        assert!(qq.sandbox);
        assert!(qq.app_id.is_empty());
    }
}
