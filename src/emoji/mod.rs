//! Emoji module - sticker substitution
//!
//! Replies may contain emotion keywords such as `[开心]`. Each keyword found
//! in a paragraph becomes an image segment sent as its own media message.

mod mapping;
mod segment;

pub use mapping::{EmotionMapping, ImportReport, IMAGE_EXTENSIONS, MAPPING_KEY};
pub use segment::MessageSegment;
