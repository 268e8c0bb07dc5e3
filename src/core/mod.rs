//! Core module - Fundamental traits and types for ocbot
//!
//! This module defines the abstractions that keep handlers testable:
//! - Channel traits for the group-chat platform
//! - Storage traits for conversation state

pub mod channel;
pub mod storage;

pub use channel::{GroupChannel, InboundMessage, MediaKind, OutboundMessage, UploadedMedia};
pub use storage::{ApiChannel, ConversationRecord, StateStore};
