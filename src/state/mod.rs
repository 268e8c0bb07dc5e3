//! Conversation state persistence
//!
//! Implementations of [`StateStore`](crate::core::StateStore):
//! - `FileStateStore`: JSON files in the state directory (production)
//! - `InMemoryStateStore`: process memory only (tests, dry runs)

mod file;
mod memory;

pub use file::{FileStateStore, SUMMARY_FLAG_FILE};
pub use memory::InMemoryStateStore;
