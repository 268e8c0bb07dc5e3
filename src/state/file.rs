//! File-backed state store
//!
//! One JSON file per API channel plus a sentinel flag file, all in a single
//! state directory. Records are replaced atomically (temp file + rename).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::core::storage::{ApiChannel, ConversationRecord, RecordUpdate, StateStore};
use crate::error::Result;

/// Name of the summary sentinel file
pub const SUMMARY_FLAG_FILE: &str = "summary_requested";

/// State store persisting records as JSON files
pub struct FileStateStore {
    dir: PathBuf,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl FileStateStore {
    /// Create a store rooted at `dir` (created lazily on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStateStore {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// State directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, channel: ApiChannel) -> PathBuf {
        self.dir.join(channel.file_name())
    }

    fn flag_path(&self) -> PathBuf {
        self.dir.join(SUMMARY_FLAG_FILE)
    }

    async fn load(&self, channel: ApiChannel) -> ConversationRecord {
        let path = self.record_path(channel);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return ConversationRecord::default();
            }
            Err(e) => {
                warn!("Failed to read {} state from {}: {}", channel, path.display(), e);
                return ConversationRecord::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(record) => record,
            Err(e) => {
                warn!("Malformed {} state in {}: {}. Starting fresh.", channel, path.display(), e);
                ConversationRecord::default()
            }
        }
    }

    async fn store(&self, channel: ApiChannel, record: &ConversationRecord) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.record_path(channel);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(record)?;

        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(
            "Saved {} state: conversation_id={:?}, count={}",
            channel, record.conversation_id, record.turn_count
        );
        Ok(())
    }

    /// Delete every record and the summary flag
    pub async fn reset(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        for path in ApiChannel::ALL
            .iter()
            .map(|c| self.record_path(*c))
            .chain(std::iter::once(self.flag_path()))
        {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn read(&self, channel: ApiChannel) -> ConversationRecord {
        self.load(channel).await
    }

    async fn write(&self, channel: ApiChannel, record: &ConversationRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.store(channel, record).await
    }

    async fn update(&self, channel: ApiChannel, apply: RecordUpdate<'_>) -> Result<ConversationRecord> {
        let _guard = self.write_lock.lock().await;
        let mut record = self.load(channel).await;
        apply(&mut record);
        self.store(channel, &record).await?;
        Ok(record)
    }

    async fn summary_requested(&self) -> bool {
        tokio::fs::try_exists(self.flag_path()).await.unwrap_or(false)
    }

    async fn mark_summary_requested(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.flag_path(), "requested").await?;
        Ok(())
    }

    async fn clear_summary_requested(&self) -> Result<()> {
        match tokio::fs::remove_file(self.flag_path()).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
