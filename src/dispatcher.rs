//! Inbound message handling
//!
//! One inbound group message goes through:
//! `Received -> AnsweredOrFallback -> (VoiceReply | TextReply) -> Sent`.
//! Memory recording runs in the background once the answer is known.

use regex::Regex;
use std::sync::{Arc, LazyLock};
use tracing::{debug, error, info, warn};

use crate::agent::ChatApi;
use crate::channels::preview;
use crate::core::{GroupChannel, InboundMessage, MediaKind, OutboundMessage, StateStore};
use crate::emoji::{EmotionMapping, MessageSegment};
use crate::memory::MemoryClient;
use crate::speech::VoicePipeline;
use crate::tasks::BackgroundTasks;

/// `msg_seq` of the first reply message
pub const INITIAL_MSG_SEQ: u32 = 21314;

/// `msg_seq` increment between reply messages
pub const MSG_SEQ_STEP: u32 = 5;

/// Queries containing this flag get a voice reply
pub const VOICE_FLAG: &str = "-v";

/// Text sent when a voice reply cannot be produced
pub const VOICE_FAILURE_NOTICE: &str = "语音合成失败，请稍后再试";

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("valid paragraph regex"));

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A summary relay was queued on or held the send-lock; no reply was sent
    Skipped,
    /// The chat API produced an empty answer; no reply was sent
    Empty,
    /// Voice reply attempted
    Voice {
        /// Whether the voice message was delivered
        sent: bool,
    },
    /// Voice requested but synthesis failed; a notice was sent instead
    VoiceFailed,
    /// Text (and sticker) reply
    Text {
        /// Messages delivered
        sent: usize,
        /// Messages that failed to upload or send
        failed: usize,
    },
}

/// Split an answer into paragraphs on blank lines
pub fn split_paragraphs(answer: &str) -> Vec<&str> {
    PARAGRAPH_BREAK
        .split(answer.trim())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Strictly increasing `msg_seq` values for one reply
#[derive(Debug, Clone)]
pub struct MsgSeq {
    next: u32,
}

impl Default for MsgSeq {
    fn default() -> Self {
        MsgSeq {
            next: INITIAL_MSG_SEQ,
        }
    }
}

impl Iterator for MsgSeq {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let current = self.next;
        self.next = self.next.checked_add(MSG_SEQ_STEP)?;
        Some(current)
    }
}

/// Drives chat, memory, stickers and voice for inbound messages
pub struct MessageDispatcher {
    chat: Arc<dyn ChatApi>,
    store: Arc<dyn StateStore>,
    channel: Arc<dyn GroupChannel>,
    memory: Option<Arc<MemoryClient>>,
    emotions: Arc<EmotionMapping>,
    voice: Option<VoicePipeline>,
    tasks: BackgroundTasks,
}

impl MessageDispatcher {
    /// Create a dispatcher with no memory, stickers or voice
    pub fn new(
        chat: Arc<dyn ChatApi>,
        store: Arc<dyn StateStore>,
        channel: Arc<dyn GroupChannel>,
    ) -> Self {
        MessageDispatcher {
            chat,
            store,
            channel,
            memory: None,
            emotions: Arc::new(EmotionMapping::new()),
            voice: None,
            tasks: BackgroundTasks::new(),
        }
    }

    /// Forward exchanges to the memory app
    pub fn with_memory(mut self, memory: Arc<MemoryClient>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Substitute stickers from this mapping
    pub fn with_emotions(mut self, emotions: Arc<EmotionMapping>) -> Self {
        self.emotions = emotions;
        self
    }

    /// Enable voice replies
    pub fn with_voice(mut self, voice: VoicePipeline) -> Self {
        self.voice = Some(voice);
        self
    }

    /// Track background work in `tasks`
    pub fn with_tasks(mut self, tasks: BackgroundTasks) -> Self {
        self.tasks = tasks;
        self
    }

    /// Background task set
    pub fn tasks(&self) -> &BackgroundTasks {
        &self.tasks
    }

    /// Handle one inbound group message
    pub async fn handle(&self, message: &InboundMessage) -> DispatchOutcome {
        if let Err(e) = self.store.clear_summary_requested().await {
            warn!("Failed to clear summary flag: {}", e);
        }

        let query = message.content.trim();
        info!("Message {} from group {}: {}", message.id, message.group_openid, query);

        let answer = self.chat.ask(query).await;

        if self.chat.send_lock().relay_in_progress() {
            info!("Summary in progress, dropping reply to {}", message.id);
            return DispatchOutcome::Skipped;
        }

        if answer.trim().is_empty() {
            error!("No answer from chat API for {}", message.id);
            return DispatchOutcome::Empty;
        }

        self.spawn_memory(query, &answer).await;

        if query.contains(VOICE_FLAG) {
            self.reply_voice(message, &answer).await
        } else {
            self.reply_text(message, &answer).await
        }
    }

    async fn spawn_memory(&self, query: &str, answer: &str) {
        let Some(memory) = self.memory.clone() else {
            return;
        };
        let query = query.to_string();
        let answer = answer.to_string();
        self.tasks
            .spawn("memory", async move {
                let outcome = memory.process(&query, &answer).await;
                debug!("Memory processing finished: {:?}", outcome);
            })
            .await;
    }

    async fn reply_voice(&self, message: &InboundMessage, answer: &str) -> DispatchOutcome {
        let audio = match &self.voice {
            Some(voice) => voice.synthesize_base64(answer).await,
            None => {
                warn!("Voice reply requested but speech is not configured");
                None
            }
        };

        let Some(audio) = audio else {
            let notice = OutboundMessage::Text(VOICE_FAILURE_NOTICE.to_string());
            if let Err(e) = self
                .channel
                .send(&message.group_openid, &message.id, &notice, INITIAL_MSG_SEQ)
                .await
            {
                error!("Failed to send voice failure notice: {}", e);
            }
            return DispatchOutcome::VoiceFailed;
        };

        let media = match self
            .channel
            .upload_media(&message.group_openid, MediaKind::Voice, &audio)
            .await
        {
            Ok(media) => media,
            Err(e) => {
                error!("Voice upload failed: {}", e);
                return DispatchOutcome::Voice { sent: false };
            }
        };

        match self
            .channel
            .send(
                &message.group_openid,
                &message.id,
                &OutboundMessage::Media(media),
                INITIAL_MSG_SEQ,
            )
            .await
        {
            Ok(()) => DispatchOutcome::Voice { sent: true },
            Err(e) => {
                error!("Failed to send voice message: {}", e);
                DispatchOutcome::Voice { sent: false }
            }
        }
    }

    /// Build the outgoing messages: text spans as-is, stickers uploaded.
    /// Stickers that fail to upload are left out.
    async fn compose(&self, message: &InboundMessage, answer: &str) -> (Vec<OutboundMessage>, usize) {
        let mut outbound = Vec::new();
        let mut failed = 0;

        for paragraph in split_paragraphs(answer) {
            for segment in self.emotions.segment(paragraph) {
                match segment {
                    MessageSegment::Text(text) => outbound.push(OutboundMessage::Text(text.to_string())),
                    MessageSegment::Image { keyword, data } => {
                        debug!("Uploading sticker {} ({}...)", keyword, preview(data));
                        match self
                            .channel
                            .upload_media(&message.group_openid, MediaKind::Image, data)
                            .await
                        {
                            Ok(media) => outbound.push(OutboundMessage::Media(media)),
                            Err(e) => {
                                error!("Sticker {} upload failed: {}", keyword, e);
                                failed += 1;
                            }
                        }
                    }
                }
            }
        }

        (outbound, failed)
    }

    async fn reply_text(&self, message: &InboundMessage, answer: &str) -> DispatchOutcome {
        let (outbound, mut failed) = self.compose(message, answer).await;
        let mut sent = 0;

        for (item, msg_seq) in outbound.iter().zip(MsgSeq::default()) {
            match self
                .channel
                .send(&message.group_openid, &message.id, item, msg_seq)
                .await
            {
                Ok(()) => sent += 1,
                Err(e) => {
                    error!("Failed to send {} message (msg_seq {}): {}", item.kind(), msg_seq, e);
                    failed += 1;
                }
            }
        }

        info!("Sent {} message(s) in reply to {}", sent, message.id);
        DispatchOutcome::Text { sent, failed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{ChatClient, SendLock};
    use crate::config::{ChatApiConfig, MemoryApiConfig};
    use crate::core::{ApiChannel, UploadedMedia};
    use crate::error::{Error, Result};
    use crate::memory::{SummaryOutcome, SUMMARY_SENTINEL};
    use crate::speech::{SpeechSynthesizer, VoiceEncoder};
    use crate::state::InMemoryStateStore;
    use async_trait::async_trait;
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::sync::Mutex;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedChat {
        answer: String,
        lock: SendLock,
    }

    impl FixedChat {
        fn new(answer: &str) -> Arc<Self> {
            Arc::new(FixedChat {
                answer: answer.to_string(),
                lock: SendLock::new(),
            })
        }
    }

    #[async_trait]
    impl ChatApi for FixedChat {
        async fn ask(&self, _query: &str) -> String {
            self.answer.clone()
        }

        fn send_lock(&self) -> &SendLock {
            &self.lock
        }
    }

    #[derive(Default)]
    struct RecordingChannel {
        uploads: Mutex<Vec<(MediaKind, String)>>,
        sent: Mutex<Vec<(OutboundMessage, u32)>>,
        fail_uploads: bool,
    }

    #[async_trait]
    impl GroupChannel for RecordingChannel {
        async fn upload_media(
            &self,
            _group_openid: &str,
            kind: MediaKind,
            base64_data: &str,
        ) -> Result<UploadedMedia> {
            if self.fail_uploads {
                return Err(Error::Channel("missing file_info".to_string()));
            }
            self.uploads.lock().await.push((kind, base64_data.to_string()));
            Ok(UploadedMedia {
                file_uuid: format!("uuid-{}", base64_data),
                file_info: format!("info-{}", base64_data),
                ttl: 3600,
            })
        }

        async fn send(
            &self,
            _group_openid: &str,
            _reply_to: &str,
            message: &OutboundMessage,
            msg_seq: u32,
        ) -> Result<()> {
            self.sent.lock().await.push((message.clone(), msg_seq));
            Ok(())
        }
    }

    struct EchoSynth;

    #[async_trait]
    impl SpeechSynthesizer for EchoSynth {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
            Ok(text.as_bytes().to_vec())
        }

        fn sample_rate(&self) -> u32 {
            24_000
        }
    }

    struct PassEncoder;

    #[async_trait]
    impl VoiceEncoder for PassEncoder {
        async fn encode(&self, pcm: &[u8], _sample_rate: u32) -> Result<Vec<u8>> {
            Ok(pcm.to_vec())
        }
    }

    fn inbound(content: &str) -> InboundMessage {
        InboundMessage::new("msg-1", "group-1", content)
    }

    fn text(s: &str) -> OutboundMessage {
        OutboundMessage::Text(s.to_string())
    }

    #[test]
    fn test_split_paragraphs() {
        assert_eq!(
            split_paragraphs("\n第一段\n还是第一段\n \n\n第二段\n"),
            vec!["第一段\n还是第一段", "第二段"]
        );
        assert!(split_paragraphs("   ").is_empty());
    }

    #[test]
    fn test_msg_seq_sequence() {
        let seqs: Vec<u32> = MsgSeq::default().take(3).collect();
        assert_eq!(seqs, vec![21314, 21319, 21324]);
    }

    #[tokio::test]
    async fn test_text_reply_with_sticker() {
        let channel = Arc::new(RecordingChannel::default());
        let emotions: EmotionMapping = [("[smile]", "B64IMG")].into_iter().collect();
        let dispatcher = MessageDispatcher::new(
            FixedChat::new("hi [smile] bye\n\n第二段"),
            Arc::new(InMemoryStateStore::new()),
            channel.clone(),
        )
        .with_emotions(Arc::new(emotions));

        let outcome = dispatcher.handle(&inbound(" 你好")).await;
        assert_eq!(outcome, DispatchOutcome::Text { sent: 4, failed: 0 });

        let sent = channel.sent.lock().await;
        let media = UploadedMedia {
            file_uuid: "uuid-B64IMG".to_string(),
            file_info: "info-B64IMG".to_string(),
            ttl: 3600,
        };
        assert_eq!(
            *sent,
            vec![
                (text("hi "), 21314),
                (OutboundMessage::Media(media), 21319),
                (text(" bye"), 21324),
                (text("第二段"), 21329),
            ]
        );
        assert_eq!(
            *channel.uploads.lock().await,
            vec![(MediaKind::Image, "B64IMG".to_string())]
        );
    }

    #[tokio::test]
    async fn test_failed_sticker_upload_is_skipped() {
        let channel = Arc::new(RecordingChannel {
            fail_uploads: true,
            ..Default::default()
        });
        let emotions: EmotionMapping = [("[smile]", "B64IMG")].into_iter().collect();
        let dispatcher = MessageDispatcher::new(
            FixedChat::new("hi [smile]"),
            Arc::new(InMemoryStateStore::new()),
            channel.clone(),
        )
        .with_emotions(Arc::new(emotions));

        let outcome = dispatcher.handle(&inbound("hello")).await;
        assert_eq!(outcome, DispatchOutcome::Text { sent: 1, failed: 1 });
        assert_eq!(*channel.sent.lock().await, vec![(text("hi "), 21314)]);
    }

    async fn chat_server(delay: Duration) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat-messages"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"answer": "answer", "conversation_id": "conv-1"}))
                    .set_delay(delay),
            )
            .mount(&server)
            .await;
        server
    }

    fn chat_client(server: &MockServer, store: Arc<InMemoryStateStore>) -> Arc<ChatClient> {
        let config = ChatApiConfig {
            url: format!("{}/v1/chat-messages", server.uri()),
            api_key: SecretString::from("app-key".to_string()),
            ..Default::default()
        };
        Arc::new(ChatClient::new(&config, store, SendLock::new()).unwrap())
    }

    fn memory_client(
        server: &MockServer,
        store: Arc<InMemoryStateStore>,
        chat: Arc<dyn ChatApi>,
    ) -> Arc<MemoryClient> {
        let config = MemoryApiConfig {
            url: format!("{}/memory/chat-messages", server.uri()),
            api_key: SecretString::from("mem-key".to_string()),
            ..Default::default()
        };
        Arc::new(MemoryClient::new(&config, None, store, chat).unwrap())
    }

    #[tokio::test]
    async fn test_concurrent_user_turns_are_both_answered() {
        let server = chat_server(Duration::from_millis(200)).await;
        let store = Arc::new(InMemoryStateStore::new());
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = MessageDispatcher::new(
            chat_client(&server, store.clone()),
            store.clone(),
            channel.clone(),
        );

        let first = InboundMessage::new("msg-1", "group-1", "one");
        let second = InboundMessage::new("msg-2", "group-1", "two");
        let (a, b) = tokio::join!(dispatcher.handle(&first), dispatcher.handle(&second));

        assert_eq!(a, DispatchOutcome::Text { sent: 1, failed: 0 });
        assert_eq!(b, DispatchOutcome::Text { sent: 1, failed: 0 });
        assert_eq!(channel.sent.lock().await.len(), 2);
        assert_eq!(store.read(ApiChannel::Primary).await.turn_count, 2);
    }

    #[tokio::test]
    async fn test_answered_turn_is_forwarded_to_memory() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/memory/chat-messages"))
            .and(body_partial_json(json!({"query": "用户：你好\nAI：答", "user": "bot"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "answer": "noted",
                "conversation_id": "mem-conv"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryStateStore::new());
        let chat = FixedChat::new("答");
        let memory = memory_client(&server, store.clone(), chat.clone());
        let dispatcher = MessageDispatcher::new(
            chat,
            store.clone(),
            Arc::new(RecordingChannel::default()),
        )
        .with_memory(memory);

        let outcome = dispatcher.handle(&inbound(" 你好 ")).await;
        assert_eq!(outcome, DispatchOutcome::Text { sent: 1, failed: 0 });

        dispatcher.tasks().join_all().await;
        let record = store.read(ApiChannel::Memory).await;
        assert_eq!(record.turn_count, 1);
        assert_eq!(record.conversation_id.as_deref(), Some("mem-conv"));
    }

    #[tokio::test]
    async fn test_reply_dropped_while_relay_in_progress() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"answer": "noted"})))
            .expect(0)
            .mount(&server)
            .await;

        let store = Arc::new(InMemoryStateStore::new());
        let chat = FixedChat::new("answer");
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = MessageDispatcher::new(chat.clone(), store.clone(), channel.clone())
            .with_memory(memory_client(&server, store.clone(), chat.clone()));

        let relay = chat.send_lock().begin_relay();
        assert_eq!(dispatcher.handle(&inbound("hello")).await, DispatchOutcome::Skipped);
        drop(relay);

        assert!(channel.sent.lock().await.is_empty());
        assert!(dispatcher.tasks().is_empty().await);
        assert_eq!(store.read(ApiChannel::Memory).await.turn_count, 0);
    }

    #[tokio::test]
    async fn test_summary_relay_racing_user_turn() {
        let chat_api = chat_server(Duration::from_millis(200)).await;
        let memory_api = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/memory/chat-messages"))
            .and(body_partial_json(json!({"query": SUMMARY_SENTINEL})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "answer": "【【总结】】S",
                "conversation_id": "mem-conv"
            })))
            .mount(&memory_api)
            .await;

        let store = Arc::new(InMemoryStateStore::new());
        let chat = chat_client(&chat_api, store.clone());
        let memory = memory_client(&memory_api, store.clone(), chat.clone());
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = MessageDispatcher::new(chat, store.clone(), channel.clone())
            .with_memory(memory.clone());

        let msg = inbound("hello");
        let (outcome, summary) = tokio::join!(dispatcher.handle(&msg), async {
            // let the user turn take the lock first
            tokio::time::sleep(Duration::from_millis(50)).await;
            memory.summarize().await
        });

        assert_eq!(outcome, DispatchOutcome::Skipped);
        assert_eq!(summary, SummaryOutcome::Completed { relayed: true, segments: 0 });
        assert!(channel.sent.lock().await.is_empty());
        assert!(dispatcher.tasks().is_empty().await);

        let requests = chat_api.received_requests().await.unwrap();
        let queries: Vec<Value> = requests
            .iter()
            .map(|r| serde_json::from_slice::<Value>(&r.body).unwrap()["query"].clone())
            .collect();
        assert_eq!(queries, vec![json!("hello"), json!("【【总结】】S")]);
    }

    #[tokio::test]
    async fn test_receipt_clears_summary_flag() {
        let store = Arc::new(InMemoryStateStore::new());
        store.mark_summary_requested().await.unwrap();

        let dispatcher = MessageDispatcher::new(
            FixedChat::new("ok"),
            store.clone(),
            Arc::new(RecordingChannel::default()),
        );
        dispatcher.handle(&inbound("hello")).await;

        assert!(!store.summary_requested().await);
    }

    #[tokio::test]
    async fn test_empty_answer_sends_nothing() {
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = MessageDispatcher::new(
            FixedChat::new(""),
            Arc::new(InMemoryStateStore::new()),
            channel.clone(),
        );

        assert_eq!(dispatcher.handle(&inbound("hello")).await, DispatchOutcome::Empty);
        assert!(channel.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_voice_reply() {
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = MessageDispatcher::new(
            FixedChat::new("早"),
            Arc::new(InMemoryStateStore::new()),
            channel.clone(),
        )
        .with_voice(VoicePipeline::new(Arc::new(EchoSynth), Arc::new(PassEncoder)));

        let outcome = dispatcher.handle(&inbound("说句话 -v")).await;
        assert_eq!(outcome, DispatchOutcome::Voice { sent: true });

        let uploads = channel.uploads.lock().await;
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, MediaKind::Voice);

        let sent = channel.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert!(matches!(sent[0], (OutboundMessage::Media(_), 21314)));
    }

    #[tokio::test]
    async fn test_voice_without_speech_sends_notice() {
        let channel = Arc::new(RecordingChannel::default());
        let dispatcher = MessageDispatcher::new(
            FixedChat::new("早"),
            Arc::new(InMemoryStateStore::new()),
            channel.clone(),
        );

        assert_eq!(dispatcher.handle(&inbound("-v hi")).await, DispatchOutcome::VoiceFailed);
        assert_eq!(
            *channel.sent.lock().await,
            vec![(text(VOICE_FAILURE_NOTICE), 21314)]
        );
    }
}
