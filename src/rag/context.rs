//! Context building for chat prompts.

use super::ContextChunk;
use crate::embedding::Embedder;
use crate::error::Result;
use crate::vector_store::VectorStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Retrieves transcript excerpts relevant to a query, scoped to one video.
pub struct ContextBuilder {
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    max_chunks: usize,
    min_score: f32,
}

impl ContextBuilder {
    pub fn new(vector_store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            vector_store,
            embedder,
            max_chunks: 3,
            min_score: 0.0,
        }
    }

    /// Set the maximum number of context chunks.
    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks;
        self
    }

    /// Set the minimum similarity score threshold.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    /// Retrieve context for a query, propagating failures.
    pub async fn try_build(&self, video_id: &str, query: &str) -> Result<Vec<ContextChunk>> {
        if query.trim().is_empty() || self.max_chunks == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(query).await?;

        let results = self
            .vector_store
            .search_with_threshold(video_id, &query_embedding, self.max_chunks, self.min_score)
            .await?;

        Ok(results.into_iter().map(ContextChunk::from).collect())
    }

    /// Retrieve context for a query. Any failure yields no context.
    pub async fn build(&self, video_id: &str, query: &str) -> Vec<ContextChunk> {
        match self.try_build(video_id, query).await {
            Ok(chunks) => {
                debug!(video_id, count = chunks.len(), "Retrieved context");
                chunks
            }
            Err(e) => {
                warn!(video_id, error = %e, "Context retrieval failed; continuing without it");
                Vec::new()
            }
        }
    }
}

/// Format context chunks for inclusion in a prompt. Empty when there are none.
pub fn format_context_for_prompt(chunks: &[ContextChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("---\n[{}]\n{}\n---", i + 1, chunk.content.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}
