//! Primary chat turn handling
//!
//! `ChatClient::ask` is the only path to the primary chat API. It holds the
//! send-lock for the whole turn so the stored conversation id is never raced.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::agent::client::ChatMessagesClient;
use crate::agent::lock::SendLock;
use crate::config::ChatApiConfig;
use crate::core::{ApiChannel, StateStore};
use crate::error::Result;

/// Answer used when the API replies 200 without an `answer` field
pub const EMPTY_ANSWER: &str = "没有返回数据";

/// Something that can answer a query on the primary conversation
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Ask one question. Always yields displayable text.
    async fn ask(&self, query: &str) -> String;

    /// Lock serializing calls to `ask`
    fn send_lock(&self) -> &SendLock;
}

/// Primary chat client with persisted conversation continuity
pub struct ChatClient {
    client: ChatMessagesClient,
    store: Arc<dyn StateStore>,
    lock: SendLock,
    fallback_answer: String,
}

impl ChatClient {
    /// Create a client from config
    pub fn new(config: &ChatApiConfig, store: Arc<dyn StateStore>, lock: SendLock) -> Result<Self> {
        let client = ChatMessagesClient::new(
            config.url.clone(),
            &config.api_key,
            config.user.clone(),
            config.timeout,
        )?;

        Ok(ChatClient {
            client,
            store,
            lock,
            fallback_answer: config.fallback_answer.clone(),
        })
    }

    async fn turn(&self, query: &str) -> Result<String> {
        let record = self.store.read(ApiChannel::Primary).await;
        let response = self.client.send(query, record.conversation_id).await?;

        if let Some(id) = response.conversation_id.as_deref() {
            match self.store.adopt_conversation_id(ApiChannel::Primary, id).await {
                Ok(true) => info!("Started primary conversation {}", id),
                Ok(false) => {}
                Err(e) => error!("Failed to persist primary conversation {}: {}", id, e),
            }
        }

        match self.store.record_turn(ApiChannel::Primary).await {
            Ok(updated) => debug!("Primary turn {} complete", updated.turn_count),
            Err(e) => error!("Failed to count primary turn: {}", e),
        }

        Ok(response.answer.unwrap_or_else(|| EMPTY_ANSWER.to_string()))
    }
}

#[async_trait]
impl ChatApi for ChatClient {
    async fn ask(&self, query: &str) -> String {
        let _guard = self.lock.acquire().await;

        match self.turn(query).await {
            Ok(answer) => answer,
            Err(e) if e.is_retryable() => {
                warn!("Chat API unavailable: {}", e);
                self.fallback_answer.clone()
            }
            Err(e) => {
                error!("Chat API request failed: {}", e);
                self.fallback_answer.clone()
            }
        }
    }

    fn send_lock(&self) -> &SendLock {
        &self.lock
    }
}
