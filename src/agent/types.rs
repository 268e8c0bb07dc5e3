//! Type definitions for the agent module

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Response mode of a `chat-messages` request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Wait for the full answer
    #[default]
    Blocking,
    /// Server-sent events
    Streaming,
}

/// Request body of a `chat-messages` call
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessagesRequest {
    /// App input variables (unused, always empty)
    pub inputs: HashMap<String, serde_json::Value>,
    /// User text
    pub query: String,
    /// Response mode
    pub response_mode: ResponseMode,
    /// Conversation to continue; `null` starts a new one
    pub conversation_id: Option<String>,
    /// End-user identifier
    pub user: String,
}

impl ChatMessagesRequest {
    /// Create a blocking request
    pub fn blocking(
        query: impl Into<String>,
        conversation_id: Option<String>,
        user: impl Into<String>,
    ) -> Self {
        ChatMessagesRequest {
            inputs: HashMap::new(),
            query: query.into(),
            response_mode: ResponseMode::Blocking,
            conversation_id,
            user: user.into(),
        }
    }
}

/// Response body of a blocking `chat-messages` call
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatMessagesResponse {
    /// Answer text
    #[serde(default)]
    pub answer: Option<String>,
    /// Conversation the answer belongs to
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Message id
    #[serde(default)]
    pub message_id: Option<String>,
}
