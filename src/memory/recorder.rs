//! Memory app client
//!
//! Every answered turn is forwarded to the memory app as one combined
//! message. Each `summary_interval`-th turn also starts a summary round:
//! the summary goes back to the primary chat and the permanent memory is
//! appended to the knowledge base.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::agent::{ChatApi, ChatMessagesClient};
use crate::config::{KnowledgeBaseConfig, MemoryApiConfig};
use crate::core::{ApiChannel, StateStore};
use crate::error::Result;
use crate::memory::knowledge::KnowledgeBaseClient;
use crate::memory::summarizer::{SummaryReport, SUMMARY_SENTINEL};

/// Format one exchange for the memory app
pub fn format_exchange(query: &str, answer: &str) -> String {
    format!("用户：{}\nAI：{}", query, answer)
}

/// Result of a summary check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// Turn count is not on a boundary
    NotDue,
    /// A summary round already ran since the last inbound message
    AlreadyRequested,
    /// The memory app gave no usable answer; the flag stays unset
    NoResponse,
    /// The round ran and the flag is set
    Completed {
        /// Whether a summary was relayed to the primary chat
        relayed: bool,
        /// Segments written to the knowledge base
        segments: usize,
    },
}

/// Client for the memory app and the summary round
pub struct MemoryClient {
    client: ChatMessagesClient,
    store: Arc<dyn StateStore>,
    chat: Arc<dyn ChatApi>,
    knowledge: Option<KnowledgeBaseClient>,
    summary_interval: u64,
}

impl MemoryClient {
    /// Create a client. `chat` receives summary relays.
    pub fn new(
        config: &MemoryApiConfig,
        knowledge: Option<&KnowledgeBaseConfig>,
        store: Arc<dyn StateStore>,
        chat: Arc<dyn ChatApi>,
    ) -> Result<Self> {
        let client = ChatMessagesClient::new(
            config.url.clone(),
            &config.api_key,
            config.user.clone(),
            config.timeout,
        )?;
        let knowledge = knowledge.map(KnowledgeBaseClient::new).transpose()?;

        Ok(MemoryClient {
            client,
            store,
            chat,
            knowledge,
            summary_interval: config.summary_interval.max(1),
        })
    }

    /// Post a query on the memory conversation and return the answer
    async fn post(&self, query: &str) -> Result<Option<String>> {
        let record = self.store.read(ApiChannel::Memory).await;
        let response = self.client.send(query, record.conversation_id).await?;

        if let Some(id) = response.conversation_id.as_deref() {
            match self.store.adopt_conversation_id(ApiChannel::Memory, id).await {
                Ok(true) => info!("Started memory conversation {}", id),
                Ok(false) => {}
                Err(e) => error!("Failed to persist memory conversation {}: {}", id, e),
            }
        }

        Ok(response.answer)
    }

    /// Count the turn and forward the exchange. Returns the new turn count.
    ///
    /// A failed post is logged; the turn still counts.
    pub async fn record(&self, query: &str, answer: &str) -> Result<u64> {
        let counted = self.store.record_turn(ApiChannel::Memory).await;

        if let Err(e) = self.post(&format_exchange(query, answer)).await {
            warn!("Failed to forward exchange to memory app: {}", e);
        }

        let record = counted?;
        debug!("Memory turn {}", record.turn_count);
        Ok(record.turn_count)
    }

    /// Run a summary round if `turn_count` is on a boundary
    pub async fn maybe_summarize(&self, turn_count: u64) -> SummaryOutcome {
        if turn_count == 0 || turn_count % self.summary_interval != 0 {
            return SummaryOutcome::NotDue;
        }
        self.summarize().await
    }

    /// Run a summary round now, unless one already ran since the last
    /// inbound message
    pub async fn summarize(&self) -> SummaryOutcome {
        if self.store.summary_requested().await {
            info!("Summary already requested, not sending again");
            return SummaryOutcome::AlreadyRequested;
        }

        let response = match self.post(SUMMARY_SENTINEL).await {
            Ok(Some(answer)) if !answer.trim().is_empty() => answer,
            Ok(_) => {
                warn!("Memory app returned no summary");
                return SummaryOutcome::NoResponse;
            }
            Err(e) => {
                error!("Summary request failed: {}", e);
                return SummaryOutcome::NoResponse;
            }
        };

        let report = SummaryReport::parse(&response);
        if report.is_empty() {
            warn!("Summary response carried no known section");
        }

        let relayed = match report.relay_text() {
            Some(text) => {
                let _relay = self.chat.send_lock().begin_relay();
                let reply = self.chat.ask(&text).await;
                info!("Relayed summary to primary chat, reply: {}", reply);
                true
            }
            None => false,
        };

        let segments = self.store_permanent_memory(&report).await;

        if let Err(e) = self.store.mark_summary_requested().await {
            error!("Failed to set summary flag: {}", e);
        }

        SummaryOutcome::Completed { relayed, segments }
    }

    async fn store_permanent_memory(&self, report: &SummaryReport) -> usize {
        let segments = report.memory_segments();
        if segments.is_empty() {
            return 0;
        }

        let Some(knowledge) = &self.knowledge else {
            warn!(
                "Knowledge base not configured, dropping {} memory segment(s)",
                segments.len()
            );
            return 0;
        };

        match knowledge.upsert_segments(&segments).await {
            Ok(_) => segments.len(),
            Err(e) => {
                error!("Failed to update knowledge base: {}", e);
                0
            }
        }
    }

    /// Record the exchange, then check for a summary round
    pub async fn process(&self, query: &str, answer: &str) -> SummaryOutcome {
        match self.record(query, answer).await {
            Ok(turn_count) => self.maybe_summarize(turn_count).await,
            Err(e) => {
                error!("Failed to record memory turn: {}", e);
                SummaryOutcome::NotDue
            }
        }
    }
}
