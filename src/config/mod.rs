//! Configuration module
//!
//! - types/mod.rs: Core configuration types (Config, LogConfig)
//! - types/provider.rs: Chat, memory and knowledge-base API configuration
//! - types/channel.rs: QQ bot and webhook gateway configuration
//! - types/speech.rs: Speech synthesis and voice encoder configuration
//! - types/storage.rs: State directory and emotion mapping file
//! - io.rs: Configuration loading and saving
//! - validation.rs: Configuration validation
//! - paths.rs: Configuration file paths

mod io;
mod paths;
mod types;
mod validation;

pub use types::{Config, LogConfig, LogFormat};

pub use types::channel::{GatewayConfig, QqConfig};
pub use types::provider::{ChatApiConfig, KnowledgeBaseConfig, MemoryApiConfig};
pub use types::speech::{EncoderConfig, SpeechConfig};
pub use types::storage::{EmotionsConfig, StorageConfig};

pub use io::{apply_env_overrides, load_config, load_config_from_path, save_config};
pub use paths::{config_dir, config_path, ensure_dir, state_dir};
pub use validation::{validate_config, ConfigValidationResult, ValidationIssue};
