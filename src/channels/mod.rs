//! Channels module - messaging platform implementations
//!
//! Implementations of [`GroupChannel`](crate::core::GroupChannel):
//! - `QqGroupChannel`: QQ official bot OpenAPI (group messages)

mod media_cache;
mod qq;

pub use media_cache::{MediaCache, MediaKey};
pub use qq::{preview, QqGroupChannel, MSG_TYPE_MEDIA, MSG_TYPE_TEXT};
