//! Error types for ocbot

use thiserror::Error;

/// Result type alias using ocbot's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for ocbot
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote chat/memory API answered with a non-success status
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },

    /// Knowledge-base lookup or update failed
    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    /// Messaging platform error
    #[error("Channel error: {0}")]
    Channel(String),

    /// Speech synthesis error
    #[error("Speech error: {0}")]
    Speech(String),

    /// Voice encoder error
    #[error("Encoder error: {0}")]
    Encoder(String),

    /// Template rendering error
    #[error("Template error: {0}")]
    Template(String),

    /// Webhook signature error
    #[error("Signature error: {0}")]
    Signature(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Error::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Build an API error, truncating very long bodies
    pub fn api(status: reqwest::StatusCode, body: impl Into<String>) -> Self {
        let mut body = body.into();
        if body.len() > 500 {
            let cut = (0..=500).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
            body.truncate(cut);
            body.push_str("...");
        }
        Error::Api {
            status: status.as_u16(),
            body,
        }
    }
}

impl From<handlebars::RenderError> for Error {
    fn from(err: handlebars::RenderError) -> Self {
        Error::Template(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_retryable() {
        let err = Error::api(reqwest::StatusCode::BAD_GATEWAY, "upstream");
        assert!(err.is_retryable());

        let err = Error::api(reqwest::StatusCode::UNAUTHORIZED, "bad key");
        assert!(!err.is_retryable());
        assert!(!Error::Config("x".into()).is_retryable());
    }

    #[test]
    fn test_api_error_truncates_body() {
        let body = "错".repeat(400);
        match Error::api(reqwest::StatusCode::INTERNAL_SERVER_ERROR, body) {
            Error::Api { status, body } => {
                assert_eq!(status, 500);
                assert!(body.ends_with("..."));
                assert!(body.len() <= 503);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
