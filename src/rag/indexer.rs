//! Transcript indexing: chunk, embed, store under the video's namespace.

use crate::chunking::{split_text, ChunkingConfig};
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::{Document, VectorStore};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, Instrument};

pub struct Indexer {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    chunking: ChunkingConfig,
}

impl Indexer {
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>, chunking: ChunkingConfig) -> Self {
        Self {
            vector_store,
            embedder,
            chunking,
        }
    }

    /// Index a transcript, replacing anything previously stored for the video.
    /// Returns the number of chunks stored.
    pub async fn index(&self, video_id: &str, text: &str) -> Result<usize> {
        let chunks = split_text(text, &self.chunking);
        if chunks.is_empty() {
            return Ok(0);
        }

        let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&contents).await?;

        let documents: Vec<Document> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| Document::new(video_id, chunk.content, embedding, chunk.order as i32))
            .collect();

        let stored = self.vector_store.replace_namespace(video_id, &documents).await?;
        info!(video_id, chunks = stored, "Indexed transcript");
        Ok(stored)
    }

    /// Index in the background. Failures are logged and never reach the caller.
    pub fn spawn_index(self: &Arc<Self>, video_id: String, text: String) -> JoinHandle<()> {
        let indexer = Arc::clone(self);
        let span = info_span!("index_transcript", video_id = %video_id);

        tokio::spawn(
            async move {
                if let Err(e) = indexer.index(&video_id, &text).await {
                    error!(error = %e, "Transcript indexing failed");
                }
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::testing::{FailingEmbedder, KeywordEmbedder};
    use crate::vector_store::MemoryVectorStore;

    fn small_chunks() -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: 40,
            chunk_overlap: 10,
        }
    }

    #[tokio::test]
    async fn test_index_replaces_namespace() {
        let store = Arc::new(MemoryVectorStore::new());
        let indexer = Indexer::new(store.clone(), Arc::new(KeywordEmbedder), small_chunks());

        let text = "The quick brown fox jumps over the lazy dog. ".repeat(5);
        let stored = indexer.index("abc12345678", &text).await.unwrap();
        assert!(stored > 1);
        assert_eq!(store.namespace_size("abc12345678").await.unwrap(), stored);

        let stored = indexer.index("abc12345678", "short now").await.unwrap();
        assert_eq!(stored, 1);
        assert_eq!(store.namespace_size("abc12345678").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_index_empty_text() {
        let store = Arc::new(MemoryVectorStore::new());
        let indexer = Indexer::new(store, Arc::new(KeywordEmbedder), small_chunks());
        assert_eq!(indexer.index("abc12345678", "  ").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_spawn_index_swallows_failures() {
        let store = Arc::new(MemoryVectorStore::new());
        let indexer = Arc::new(Indexer::new(store.clone(), Arc::new(FailingEmbedder), small_chunks()));

        indexer
            .spawn_index("abc12345678".to_string(), "some text".to_string())
            .await
            .unwrap();

        assert_eq!(store.namespace_size("abc12345678").await.unwrap(), 0);
    }
}
