//! Channel trait - Abstract interface for the group-chat platform
//!
//! The dispatcher only needs three platform operations: upload a media file,
//! send a text message and send a media message. Everything else the
//! platform SDK offers stays out of scope.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// An inbound group message addressed to the bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Platform message id (replies are passive replies to this id)
    pub id: String,
    /// Group the message was posted in
    pub group_openid: String,
    /// Sender id within the group
    pub author_id: String,
    /// Message text
    pub content: String,
    /// Platform timestamp, as sent
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl InboundMessage {
    /// Create a message with the given ids and text
    pub fn new(
        id: impl Into<String>,
        group_openid: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        InboundMessage {
            id: id.into(),
            group_openid: group_openid.into(),
            author_id: String::new(),
            content: content.into(),
            timestamp: None,
        }
    }
}

/// Kind of media being uploaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    /// PNG/JPG/GIF image
    Image,
    /// MP4 video
    Video,
    /// SILK voice clip
    Voice,
}

impl MediaKind {
    /// Platform `file_type` code
    pub fn file_type(&self) -> u8 {
        match self {
            MediaKind::Image => 1,
            MediaKind::Video => 2,
            MediaKind::Voice => 3,
        }
    }
}

/// Handle of an uploaded media file, attached to a later media message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedMedia {
    /// File id
    pub file_uuid: String,
    /// Opaque handle sent back in media messages
    pub file_info: String,
    /// Seconds the handle stays valid
    pub ttl: u64,
}

/// One outbound platform message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Plain text
    Text(String),
    /// Previously uploaded media
    Media(UploadedMedia),
}

impl OutboundMessage {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Text(_) => "text",
            OutboundMessage::Media(_) => "media",
        }
    }
}

/// Abstract interface for the group-chat platform
#[async_trait]
pub trait GroupChannel: Send + Sync {
    /// Upload base64-encoded media to a group and return its handle
    async fn upload_media(
        &self,
        group_openid: &str,
        kind: MediaKind,
        base64_data: &str,
    ) -> Result<UploadedMedia>;

    /// Send one message as a passive reply to `reply_to`
    async fn send(
        &self,
        group_openid: &str,
        reply_to: &str,
        message: &OutboundMessage,
        msg_seq: u32,
    ) -> Result<()>;
}
