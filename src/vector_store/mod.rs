//! Vector store abstraction.
//!
//! Documents live in namespaces (one per video). Every query is scoped to a single
//! namespace, so retrieval for one video never returns another video's chunks.

mod memory;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chunk of text with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    /// Namespace (video ID) this document belongs to.
    pub namespace: String,
    pub content: String,
    pub embedding: Vec<f32>,
    /// Order of this chunk in the source text.
    pub chunk_order: i32,
    pub indexed_at: DateTime<Utc>,
}

impl Document {
    pub fn new(namespace: &str, content: String, embedding: Vec<f32>, chunk_order: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            namespace: namespace.to_string(),
            content,
            embedding,
            chunk_order,
            indexed_at: Utc::now(),
        }
    }
}

/// A search result with score.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub document: Document,
    /// Cosine similarity (higher is better).
    pub score: f32,
}

/// Trait for vector store implementations.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace documents. Returns the number written.
    async fn upsert(&self, docs: &[Document]) -> Result<usize>;

    /// Atomically swap the contents of a namespace for `docs`.
    async fn replace_namespace(&self, namespace: &str, docs: &[Document]) -> Result<usize> {
        self.delete_namespace(namespace).await?;
        self.upsert(docs).await
    }

    /// The `limit` most similar documents within a namespace.
    async fn search(
        &self,
        namespace: &str,
        query_embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<SearchResult>> {
        self.search_with_threshold(namespace, query_embedding, limit, f32::MIN)
            .await
    }

    /// Like [`VectorStore::search`], dropping results scored below `min_score`.
    async fn search_with_threshold(
        &self,
        namespace: &str,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>>;

    /// Delete every document in a namespace. Returns the number removed.
    async fn delete_namespace(&self, namespace: &str) -> Result<usize>;

    /// Number of documents in a namespace.
    async fn namespace_size(&self, namespace: &str) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score, filter, sort and truncate candidate documents.
pub(crate) fn rank(
    docs: impl IntoIterator<Item = Document>,
    query_embedding: &[f32],
    limit: usize,
    min_score: f32,
) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = docs
        .into_iter()
        .map(|document| {
            let score = cosine_similarity(query_embedding, &document.embedding);
            SearchResult { document, score }
        })
        .filter(|r| r.score >= min_score)
        .collect();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &c)).abs() < 0.001);

        let d = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &d) + 1.0).abs() < 0.001);

        assert_eq!(cosine_similarity(&a, &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let docs = vec![
            Document::new("v", "far".into(), vec![0.0, 1.0], 0),
            Document::new("v", "near".into(), vec![1.0, 0.1], 1),
            Document::new("v", "exact".into(), vec![1.0, 0.0], 2),
        ];

        let results = rank(docs, &[1.0, 0.0], 2, f32::MIN);
        let contents: Vec<_> = results.iter().map(|r| r.document.content.as_str()).collect();
        assert_eq!(contents, vec!["exact", "near"]);
    }
}
