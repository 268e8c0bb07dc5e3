//! Webhook payload types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::InboundMessage;

/// Event dispatch
pub const OP_DISPATCH: u8 = 0;

/// HTTP callback acknowledgement
pub const OP_CALLBACK_ACK: u8 = 12;

/// Callback URL validation
pub const OP_CALLBACK_VALIDATION: u8 = 13;

/// Event type of a group message that mentions the bot
pub const GROUP_AT_MESSAGE_CREATE: &str = "GROUP_AT_MESSAGE_CREATE";

/// Envelope of every callback
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Event id
    #[serde(default)]
    pub id: Option<String>,
    /// Opcode
    pub op: u8,
    /// Opcode-specific data
    #[serde(default)]
    pub d: Value,
    /// Sequence number
    #[serde(default)]
    pub s: Option<u64>,
    /// Event type (dispatch only)
    #[serde(default)]
    pub t: Option<String>,
}

/// `d` of a validation request
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationRequest {
    /// Token to echo back
    pub plain_token: String,
    /// Event timestamp, part of the signed message
    pub event_ts: String,
}

/// Response to a validation request
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResponse {
    /// Echoed token
    pub plain_token: String,
    /// Hex Ed25519 signature of `event_ts + plain_token`
    pub signature: String,
}

/// Acknowledgement of a dispatch
#[derive(Debug, Clone, Serialize)]
pub struct CallbackAck {
    /// Always [`OP_CALLBACK_ACK`]
    pub op: u8,
    /// Always 0
    pub d: u8,
}

impl Default for CallbackAck {
    fn default() -> Self {
        CallbackAck {
            op: OP_CALLBACK_ACK,
            d: 0,
        }
    }
}

/// Sender of a group message
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupMember {
    /// Member id within the group
    #[serde(default, alias = "id")]
    pub member_openid: String,
}

/// `d` of a `GROUP_AT_MESSAGE_CREATE` event
#[derive(Debug, Clone, Deserialize)]
pub struct GroupAtMessage {
    /// Message id
    pub id: String,
    /// Text, usually with a leading space
    #[serde(default)]
    pub content: String,
    /// Group id
    #[serde(alias = "group_id")]
    pub group_openid: String,
    /// Sender
    #[serde(default)]
    pub author: GroupMember,
    /// ISO 8601 timestamp
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl From<GroupAtMessage> for InboundMessage {
    fn from(message: GroupAtMessage) -> Self {
        InboundMessage {
            id: message.id,
            group_openid: message.group_openid,
            author_id: message.author.member_openid,
            content: message.content,
            timestamp: message.timestamp,
        }
    }
}
