//! Storage traits - Abstract interface for conversation state persistence
//!
//! The bot keeps one small record per remote API channel (the primary chat
//! app and the memory app) plus a sentinel flag for summary rounds. Handlers
//! only talk to the `StateStore` trait so state lifecycle can be exercised
//! without real files.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Remote API channel a conversation record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiChannel {
    /// Primary chat app answering users
    Primary,
    /// Memory app collecting exchanges and producing summaries
    Memory,
}

impl ApiChannel {
    /// All channels, in a stable order
    pub const ALL: [ApiChannel; 2] = [ApiChannel::Primary, ApiChannel::Memory];

    /// File name of the persisted record
    pub fn file_name(&self) -> &'static str {
        match self {
            ApiChannel::Primary => "api_conversation.json",
            ApiChannel::Memory => "memory_api_conversation.json",
        }
    }
}

impl std::fmt::Display for ApiChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiChannel::Primary => write!(f, "primary"),
            ApiChannel::Memory => write!(f, "memory"),
        }
    }
}

/// Persisted state of one remote conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationRecord {
    /// Remote conversation id, set once and then kept
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Number of processed turns
    #[serde(default, rename = "count")]
    pub turn_count: u64,
    /// Last modification time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ConversationRecord {
    /// Store `id` unless a conversation id is already known.
    ///
    /// Returns true when the id was adopted.
    pub fn adopt_conversation_id(&mut self, id: &str) -> bool {
        if self.conversation_id.is_some() || id.is_empty() {
            return false;
        }
        self.conversation_id = Some(id.to_string());
        self.touch();
        true
    }

    /// Count one more turn and return the new count
    pub fn record_turn(&mut self) -> u64 {
        self.turn_count += 1;
        self.touch();
        self.turn_count
    }

    fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

/// Mutation applied to a record inside `StateStore::update`
pub type RecordUpdate<'a> = &'a (dyn Fn(&mut ConversationRecord) + Send + Sync);

/// Abstract interface for conversation state
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read a record. Missing or malformed state yields an empty record.
    async fn read(&self, channel: ApiChannel) -> ConversationRecord;

    /// Replace a record
    async fn write(&self, channel: ApiChannel, record: &ConversationRecord) -> Result<()>;

    /// Read-modify-write a record without interleaving with other updates
    /// through the same store. Returns the stored record.
    async fn update(&self, channel: ApiChannel, apply: RecordUpdate<'_>) -> Result<ConversationRecord>;

    /// Whether a summary round completed since the last inbound message
    async fn summary_requested(&self) -> bool;

    /// Set the summary flag
    async fn mark_summary_requested(&self) -> Result<()>;

    /// Clear the summary flag
    async fn clear_summary_requested(&self) -> Result<()>;

    /// Count one turn on `channel`; returns the updated record
    async fn record_turn(&self, channel: ApiChannel) -> Result<ConversationRecord> {
        self.update(channel, &|record| {
            record.record_turn();
        })
        .await
    }

    /// Persist a conversation id returned by the remote API if none is stored
    async fn adopt_conversation_id(&self, channel: ApiChannel, id: &str) -> Result<bool> {
        let before = self.read(channel).await;
        if before.conversation_id.is_some() || id.is_empty() {
            return Ok(false);
        }
        let owned = id.to_string();
        let after = self
            .update(channel, &move |record| {
                record.adopt_conversation_id(&owned);
            })
            .await?;
        Ok(after.conversation_id.as_deref() == Some(id))
    }
}
