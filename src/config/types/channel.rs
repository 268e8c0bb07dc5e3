//! Channel configuration types
//!
//! Configuration for the QQ bot platform and the inbound webhook gateway.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// QQ official bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QqConfig {
    /// Bot app id
    pub app_id: String,
    /// Bot app secret (also seeds the webhook signing key)
    #[serde(skip_serializing)]
    pub secret: SecretString,
    /// Use the sandbox OpenAPI host
    #[serde(default)]
    pub sandbox: bool,
    /// OpenAPI base URL override
    pub api_base: Option<String>,
    /// Access-token endpoint
    #[serde(default = "default_token_url")]
    pub token_url: String,
    /// Request timeout
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub timeout: Duration,
}

impl QqConfig {
    /// Create a config for an app id/secret pair with default endpoints
    pub fn new(app_id: impl Into<String>, secret: impl Into<String>) -> Self {
        QqConfig {
            app_id: app_id.into(),
            secret: SecretString::from(secret.into()),
            sandbox: false,
            api_base: None,
            token_url: default_token_url(),
            timeout: default_request_timeout(),
        }
    }

    /// Resolve the OpenAPI base URL
    pub fn api_base(&self) -> String {
        match &self.api_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None if self.sandbox => "https://sandbox.api.sgroup.qq.com".to_string(),
            None => "https://api.sgroup.qq.com".to_string(),
        }
    }
}

fn default_token_url() -> String {
    "https://bots.qq.com/app/getAppAccessToken".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Webhook gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Bind address
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to bind to
    #[serde(default = "default_port")]
    pub port: u16,
    /// Path QQ posts callback events to
    #[serde(default = "default_callback_path")]
    pub callback_path: String,
    /// Verify `X-Signature-Ed25519` on incoming events
    #[serde(default = "default_true")]
    pub verify_signatures: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig {
            bind: default_bind(),
            port: default_port(),
            callback_path: default_callback_path(),
            verify_signatures: true,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_callback_path() -> String {
    "/qq/callback".to_string()
}

fn default_true() -> bool {
    true
}
