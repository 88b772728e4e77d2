//! Persistence for cached transcripts and chat history.
//!
//! Both concerns are plain key/value reads and writes with last-write-wins semantics.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::models::{ChatMessage, ConversationKey, QaPair, TranscriptRecord};
use async_trait::async_trait;

/// Transcript cache keyed by video ID.
#[async_trait]
pub trait TranscriptCache: Send + Sync {
    /// Look up a cached transcript.
    async fn get(&self, video_id: &str) -> Result<Option<TranscriptRecord>>;

    /// Insert or replace a transcript.
    async fn put(&self, record: &TranscriptRecord) -> Result<()>;

    /// Replace the cached Q&A pairs of a transcript. Returns false if the video is not cached.
    async fn set_qa_pairs(&self, video_id: &str, qa_pairs: &[QaPair]) -> Result<bool>;
}

/// Append-only message log per (video, user).
#[async_trait]
pub trait ChatHistory: Send + Sync {
    /// The most recent `limit` messages, in chronological order.
    async fn recent(&self, key: &ConversationKey, limit: usize) -> Result<Vec<ChatMessage>>;

    async fn append(&self, key: &ConversationKey, message: &ChatMessage) -> Result<()>;

    /// Delete a conversation. Returns the number of removed messages.
    async fn clear(&self, key: &ConversationKey) -> Result<usize>;
}
