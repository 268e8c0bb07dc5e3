//! In-memory state store (no persistence)

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::core::storage::{ApiChannel, ConversationRecord, RecordUpdate, StateStore};
use crate::error::Result;

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<ApiChannel, ConversationRecord>,
    summary_requested: bool,
}

/// State store keeping everything in process memory
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    inner: Mutex<Inner>,
}

impl InMemoryStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn read(&self, channel: ApiChannel) -> ConversationRecord {
        self.inner
            .lock()
            .await
            .records
            .get(&channel)
            .cloned()
            .unwrap_or_default()
    }

    async fn write(&self, channel: ApiChannel, record: &ConversationRecord) -> Result<()> {
        self.inner.lock().await.records.insert(channel, record.clone());
        Ok(())
    }

    async fn update(&self, channel: ApiChannel, apply: RecordUpdate<'_>) -> Result<ConversationRecord> {
        let mut inner = self.inner.lock().await;
        let record = inner.records.entry(channel).or_default();
        apply(record);
        Ok(record.clone())
    }

    async fn summary_requested(&self) -> bool {
        self.inner.lock().await.summary_requested
    }

    async fn mark_summary_requested(&self) -> Result<()> {
        self.inner.lock().await.summary_requested = true;
        Ok(())
    }

    async fn clear_summary_requested(&self) -> Result<()> {
        self.inner.lock().await.summary_requested = false;
        Ok(())
    }
}
