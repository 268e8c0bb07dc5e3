//! # ocbot
//!
//! A QQ group chat bot backed by a conversational AI API.
//!
//! ## Features
//!
//! - **Conversation continuity:** one persisted remote conversation per API,
//!   serialized through a single send-lock
//! - **Long-term memory:** exchanges forwarded to a memory app, with periodic
//!   summary rounds feeding a knowledge base
//! - **Stickers:** emotion keywords in replies become inline images
//! - **Voice replies:** Azure TTS encoded to SILK when a query carries `-v`

pub mod agent;
pub mod app;
pub mod channels;
pub mod config;
pub mod core;
pub mod dispatcher;
pub mod emoji;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod memory;
pub mod speech;
pub mod state;
pub mod tasks;

pub use app::App;
pub use config::Config;
pub use error::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const NAME: &str = env!("CARGO_PKG_NAME");
