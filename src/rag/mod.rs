//! Retrieval-augmented context for chat.
//!
//! Transcripts are chunked, embedded and stored under their video's namespace by the
//! [`Indexer`]; the [`ContextBuilder`] retrieves the chunks most relevant to a chat
//! message from that same namespace.

pub mod context;
mod indexer;

pub use context::{format_context_for_prompt, ContextBuilder};
pub use indexer::Indexer;

use crate::vector_store::SearchResult;

/// A retrieved transcript excerpt.
#[derive(Debug, Clone)]
pub struct ContextChunk {
    pub video_id: String,
    pub content: String,
    /// Position of the chunk in the transcript.
    pub chunk_order: i32,
    /// Similarity score.
    pub score: f32,
}

impl From<SearchResult> for ContextChunk {
    fn from(result: SearchResult) -> Self {
        Self {
            video_id: result.document.namespace,
            content: result.document.content,
            chunk_order: result.document.chunk_order,
            score: result.score,
        }
    }
}
