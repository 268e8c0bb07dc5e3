//! Configuration validation
//!
//! Validates configuration and reports issues.

use secrecy::ExposeSecret;

use super::types::Config;

/// Result of configuration validation
#[derive(Debug, Clone)]
pub struct ConfigValidationResult {
    /// Whether the config is valid
    pub valid: bool,
    /// Validation errors (critical)
    pub errors: Vec<ValidationIssue>,
    /// Validation warnings (non-critical)
    pub warnings: Vec<ValidationIssue>,
}

impl ConfigValidationResult {
    /// Create a valid result
    pub fn valid() -> Self {
        ConfigValidationResult {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Add an error
    pub fn with_error(mut self, issue: ValidationIssue) -> Self {
        self.valid = false;
        self.errors.push(issue);
        self
    }

    /// Add a warning
    pub fn with_warning(mut self, issue: ValidationIssue) -> Self {
        self.warnings.push(issue);
        self
    }
}

/// A validation issue
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the config field
    pub path: String,
    /// Issue message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    /// Create a new issue
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationIssue {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({})", suggestion)?;
        }
        Ok(())
    }
}

/// Validate the configuration
pub fn validate_config(config: &Config) -> ConfigValidationResult {
    let mut result = ConfigValidationResult::valid();

    result = validate_api_config(config, result);
    result = validate_channel_config(config, result);
    result = validate_speech_config(config, result);

    result
}

fn check_url(field: &str, value: &str, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if let Err(e) = url::Url::parse(value) {
        result = result.with_error(ValidationIssue::new(
            field,
            format!("Invalid URL '{}': {}", value, e),
        ));
    }
    result
}

fn validate_api_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    if config.chat.url.is_empty() {
        result = result.with_error(
            ValidationIssue::new("chat.url", "Chat API URL is not configured")
                .with_suggestion("Set CHAT_API_URL or chat.url in config"),
        );
    } else {
        result = check_url("chat.url", &config.chat.url, result);
    }
    if config.chat.api_key.expose_secret().is_empty() {
        result = result.with_error(
            ValidationIssue::new("chat.api_key", "Chat API key is not configured")
                .with_suggestion("Set CHAT_API_KEY"),
        );
    }

    if config.memory.enabled {
        if config.memory.url.is_empty() {
            result = result.with_warning(
                ValidationIssue::new(
                    "memory.url",
                    "Memory API URL is not configured. Long-term memory will be disabled.",
                )
                .with_suggestion("Set MEMORY_API_URL or memory.enabled = false"),
            );
        } else {
            result = check_url("memory.url", &config.memory.url, result);
        }
        if config.memory.summary_interval == 0 {
            result = result.with_error(ValidationIssue::new(
                "memory.summary_interval",
                "Summary interval must be at least 1",
            ));
        }
    }

    match &config.knowledge {
        Some(kb) => {
            result = check_url("knowledge.base_url", &kb.base_url, result);
        }
        None if config.memory.enabled => {
            result = result.with_warning(
                ValidationIssue::new(
                    "knowledge",
                    "Knowledge base not configured. Permanent memories will not be stored.",
                )
                .with_suggestion("Set KNOWLEDGE_API_URL and KNOWLEDGE_API_KEY"),
            );
        }
        None => {}
    }

    result
}

fn validate_channel_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    match &config.qq {
        Some(qq) => {
            if qq.app_id.is_empty() || qq.secret.expose_secret().is_empty() {
                result = result.with_error(
                    ValidationIssue::new("qq", "QQ app id and secret are both required")
                        .with_suggestion("Set QQ_APP_ID and QQ_APP_SECRET"),
                );
            }
        }
        None => {
            result = result.with_warning(
                ValidationIssue::new(
                    "qq",
                    "QQ bot not configured. The gateway cannot reply to group messages.",
                )
                .with_suggestion("Set QQ_APP_ID and QQ_APP_SECRET"),
            );
        }
    }

    if !config.gateway.callback_path.starts_with('/') {
        result = result.with_error(ValidationIssue::new(
            "gateway.callback_path",
            "Callback path must start with '/'",
        ));
    }

    result
}

fn validate_speech_config(config: &Config, mut result: ConfigValidationResult) -> ConfigValidationResult {
    let ready = config
        .speech
        .as_ref()
        .map(|s| !s.key.expose_secret().is_empty() && !s.region.is_empty())
        .unwrap_or(false);

    if !ready {
        result = result.with_warning(
            ValidationIssue::new(
                "speech",
                "SPEECH_KEY and SPEECH_REGION are not configured. Voice replies are disabled.",
            )
            .with_suggestion("Set SPEECH_KEY and SPEECH_REGION"),
        );
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        let result = validate_config(&config);

        assert!(!result.valid);
        assert!(result.errors.iter().any(|e| e.path == "chat.url"));
        assert!(result.warnings.iter().any(|w| w.path == "speech"));
    }

    #[test]
    fn test_validate_minimal_valid_config() {
        let mut config = Config::default();
        config.chat.url = "https://api.dify.ai/v1/chat-messages".to_string();
        config.chat.api_key = SecretString::from("app-key".to_string());
        config.memory.enabled = false;

        let result = validate_config(&config);
        assert!(result.valid, "unexpected errors: {:?}", result.errors);
    }

    #[test]
    fn test_invalid_url_is_error() {
        let mut config = Config::default();
        config.chat.url = "not a url".to_string();
        config.chat.api_key = SecretString::from("app-key".to_string());
        config.memory.enabled = false;

        let result = validate_config(&config);
        assert!(!result.valid);
        assert!(result.errors[0].to_string().starts_with("chat.url: Invalid URL"));
    }
}
