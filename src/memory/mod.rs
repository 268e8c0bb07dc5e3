//! Memory module - long-term memory through the memory app
//!
//! Forwards exchanges to the memory app, parses its summary rounds and
//! stores permanent memory in the knowledge base.

pub mod knowledge;
pub mod recorder;
pub mod summarizer;

pub use knowledge::{KnowledgeBaseClient, SegmentTarget};
pub use recorder::{format_exchange, MemoryClient, SummaryOutcome};
pub use summarizer::{
    SummaryReport, PERMANENT_MEMORY_MARKER, SUMMARY_MARKER, SUMMARY_SENTINEL,
};
