//! Agent module - Remote conversational API access
//!
//! This module handles all traffic to the `chat-messages` style APIs:
//! - Blocking HTTP client shared by the primary and memory apps
//! - Request/response types
//! - The send-lock serializing primary chat turns
//! - `ChatClient`, which keeps the primary conversation going across restarts

mod chat;
mod client;
mod lock;
mod types;

pub use chat::{ChatApi, ChatClient, EMPTY_ANSWER};
pub use client::ChatMessagesClient;
pub use lock::{RelayGuard, SendGuard, SendLock};
pub use types::{ChatMessagesRequest, ChatMessagesResponse, ResponseMode};
