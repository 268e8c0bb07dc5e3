//! Application wiring
//!
//! Builds the long-lived components from a [`Config`]: state store, send-lock,
//! chat and memory clients, emotion mapping and voice pipeline. Both binaries
//! go through here.

use std::sync::Arc;
use tracing::{info, warn};

use crate::agent::{ChatClient, SendLock};
use crate::config::{ensure_dir, Config};
use crate::core::{GroupChannel, StateStore};
use crate::dispatcher::MessageDispatcher;
use crate::emoji::EmotionMapping;
use crate::error::Result;
use crate::memory::MemoryClient;
use crate::speech::VoicePipeline;
use crate::state::FileStateStore;
use crate::tasks::BackgroundTasks;

/// Shared components of a running bot
pub struct App {
    /// Loaded configuration
    pub config: Config,
    /// File-backed conversation state
    pub store: Arc<FileStateStore>,
    /// Lock serializing primary chat turns
    pub lock: SendLock,
    /// Primary chat client
    pub chat: Arc<ChatClient>,
    /// Memory client, when enabled
    pub memory: Option<Arc<MemoryClient>>,
    /// Sticker mapping
    pub emotions: Arc<EmotionMapping>,
    /// Voice pipeline, when speech is configured
    pub voice: Option<VoicePipeline>,
    /// Background work
    pub tasks: BackgroundTasks,
}

impl App {
    /// Build every component from `config`
    pub fn build(config: Config) -> Result<Self> {
        let state_dir = config.storage.state_dir();
        ensure_dir(&state_dir)?;
        let store = Arc::new(FileStateStore::new(&state_dir));
        info!("Conversation state in {}", state_dir.display());

        let lock = SendLock::new();
        let chat = Arc::new(ChatClient::new(
            &config.chat,
            store.clone(),
            lock.clone(),
        )?);

        let memory = if config.memory.enabled && !config.memory.url.is_empty() {
            if config.knowledge.is_none() {
                warn!("Knowledge base not configured, permanent memory will be dropped");
            }
            Some(Arc::new(MemoryClient::new(
                &config.memory,
                config.knowledge.as_ref(),
                store.clone(),
                chat.clone(),
            )?))
        } else {
            warn!("Memory app disabled");
            None
        };

        let emotions = Arc::new(EmotionMapping::load(&config.emotions.path())?);
        let voice = VoicePipeline::try_from_config(config.speech.as_ref());

        Ok(App {
            config,
            store,
            lock,
            chat,
            memory,
            emotions,
            voice,
            tasks: BackgroundTasks::new(),
        })
    }

    /// Dispatcher replying through `channel`
    pub fn dispatcher(&self, channel: Arc<dyn GroupChannel>) -> MessageDispatcher {
        let store: Arc<dyn StateStore> = self.store.clone();
        let mut dispatcher = MessageDispatcher::new(self.chat.clone(), store, channel)
            .with_emotions(self.emotions.clone())
            .with_tasks(self.tasks.clone());

        if let Some(memory) = &self.memory {
            dispatcher = dispatcher.with_memory(memory.clone());
        }
        if let Some(voice) = &self.voice {
            dispatcher = dispatcher.with_voice(voice.clone());
        }
        dispatcher
    }

    /// Wait for background work to finish
    pub async fn shutdown(&self) {
        self.tasks.join_all().await;
    }
}
