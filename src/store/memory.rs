//! In-memory transcript cache and chat log.

use super::{ChatHistory, TranscriptCache};
use crate::error::{LingoError, Result};
use crate::models::{ChatMessage, ConversationKey, QaPair, TranscriptRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Volatile store, used in tests and when no database is configured.
pub struct MemoryStore {
    transcripts: RwLock<HashMap<String, TranscriptRecord>>,
    conversations: RwLock<HashMap<ConversationKey, Vec<ChatMessage>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            transcripts: RwLock::new(HashMap::new()),
            conversations: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_error(e: impl std::fmt::Display) -> LingoError {
    LingoError::Storage(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl TranscriptCache for MemoryStore {
    async fn get(&self, video_id: &str) -> Result<Option<TranscriptRecord>> {
        let transcripts = self.transcripts.read().map_err(lock_error)?;
        Ok(transcripts.get(video_id).cloned())
    }

    async fn put(&self, record: &TranscriptRecord) -> Result<()> {
        let mut transcripts = self.transcripts.write().map_err(lock_error)?;
        transcripts.insert(record.video_id.clone(), record.clone());
        Ok(())
    }

    async fn set_qa_pairs(&self, video_id: &str, qa_pairs: &[QaPair]) -> Result<bool> {
        let mut transcripts = self.transcripts.write().map_err(lock_error)?;
        match transcripts.get_mut(video_id) {
            Some(record) => {
                record.qa_pairs = qa_pairs.to_vec();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl ChatHistory for MemoryStore {
    async fn recent(&self, key: &ConversationKey, limit: usize) -> Result<Vec<ChatMessage>> {
        let conversations = self.conversations.read().map_err(lock_error)?;
        let messages = conversations.get(key).map(Vec::as_slice).unwrap_or_default();
        let skip = messages.len().saturating_sub(limit);
        Ok(messages[skip..].to_vec())
    }

    async fn append(&self, key: &ConversationKey, message: &ChatMessage) -> Result<()> {
        let mut conversations = self.conversations.write().map_err(lock_error)?;
        conversations
            .entry(key.clone())
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn clear(&self, key: &ConversationKey) -> Result<usize> {
        let mut conversations = self.conversations.write().map_err(lock_error)?;
        Ok(conversations.remove(key).map(|m| m.len()).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_replaces_existing() {
        let store = MemoryStore::new();
        store
            .put(&TranscriptRecord::new("abc12345678", "u", "first", "a", vec![]))
            .await
            .unwrap();
        store
            .put(&TranscriptRecord::new("abc12345678", "u", "second", "b", vec![]))
            .await
            .unwrap();

        let cached = store.get("abc12345678").await.unwrap().unwrap();
        assert_eq!(cached.full_text, "second");
        assert_eq!(cached.strategy, "b");
    }

    #[tokio::test]
    async fn test_recent_limit() {
        let store = MemoryStore::new();
        let key = ConversationKey::new("abc12345678", None);

        assert!(store.recent(&key, 6).await.unwrap().is_empty());

        for i in 0..8 {
            store.append(&key, &ChatMessage::user(format!("m{}", i))).await.unwrap();
        }

        let recent = store.recent(&key, 6).await.unwrap();
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0].content, "m2");
        assert_eq!(recent[5].content, "m7");

        assert_eq!(store.clear(&key).await.unwrap(), 8);
        assert_eq!(store.clear(&key).await.unwrap(), 0);
    }
}
