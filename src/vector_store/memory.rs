//! In-memory vector store implementation.
//!
//! Useful for testing and when no database is configured.

use super::{rank, Document, SearchResult, VectorStore};
use crate::error::{LingoError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory vector store, keyed by namespace.
pub struct MemoryVectorStore {
    namespaces: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_error(e: impl std::fmt::Display) -> LingoError {
    LingoError::VectorStore(format!("Failed to acquire lock: {}", e))
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert(&self, docs: &[Document]) -> Result<usize> {
        let mut namespaces = self.namespaces.write().map_err(lock_error)?;
        for doc in docs {
            let entries = namespaces.entry(doc.namespace.clone()).or_default();
            entries.retain(|existing| existing.id != doc.id);
            entries.push(doc.clone());
        }
        Ok(docs.len())
    }

    async fn replace_namespace(&self, namespace: &str, docs: &[Document]) -> Result<usize> {
        let mut namespaces = self.namespaces.write().map_err(lock_error)?;
        namespaces.insert(namespace.to_string(), docs.to_vec());
        Ok(docs.len())
    }

    async fn search_with_threshold(
        &self,
        namespace: &str,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let namespaces = self.namespaces.read().map_err(lock_error)?;
        let docs = namespaces.get(namespace).cloned().unwrap_or_default();
        Ok(rank(docs, query_embedding, limit, min_score))
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<usize> {
        let mut namespaces = self.namespaces.write().map_err(lock_error)?;
        Ok(namespaces.remove(namespace).map(|docs| docs.len()).unwrap_or(0))
    }

    async fn namespace_size(&self, namespace: &str) -> Result<usize> {
        let namespaces = self.namespaces.read().map_err(lock_error)?;
        Ok(namespaces.get(namespace).map(Vec::len).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_isolation_and_replace() {
        let store = MemoryVectorStore::new();
        store
            .upsert(&[
                Document::new("a", "alpha".to_string(), vec![1.0, 0.0], 0),
                Document::new("b", "beta".to_string(), vec![1.0, 0.0], 0),
            ])
            .await
            .unwrap();

        let results = store.search("b", &[1.0, 0.0], 3).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.content, "beta");

        store
            .replace_namespace("a", &[
                Document::new("a", "one".to_string(), vec![0.0, 1.0], 0),
                Document::new("a", "two".to_string(), vec![1.0, 0.0], 1),
            ])
            .await
            .unwrap();
        assert_eq!(store.namespace_size("a").await.unwrap(), 2);

        let top = store.search("a", &[1.0, 0.0], 1).await.unwrap();
        assert_eq!(top[0].document.content, "two");

        assert_eq!(store.delete_namespace("a").await.unwrap(), 2);
        assert_eq!(store.namespace_size("a").await.unwrap(), 0);
    }
}
