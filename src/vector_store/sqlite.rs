//! SQLite-based vector store.
//!
//! Cosine similarity is computed in Rust over the namespace's rows; a namespace holds
//! one video's chunks, so scans stay small.

use super::{rank, Document, SearchResult, VectorStore};
use crate::error::{LingoError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        namespace TEXT NOT NULL,
        content TEXT NOT NULL,
        embedding BLOB NOT NULL,
        chunk_order INTEGER NOT NULL,
        indexed_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_documents_namespace ON documents(namespace);
"#;

/// SQLite-based vector store.
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
}

impl SqliteVectorStore {
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite vector store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite vector store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| LingoError::VectorStore(format!("Failed to acquire lock: {}", e)))
    }

    fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap_or_default();
                f32::from_le_bytes(arr)
            })
            .collect()
    }

    fn insert_all(tx: &Transaction<'_>, docs: &[Document]) -> Result<()> {
        let mut stmt = tx.prepare(
            r#"
            INSERT OR REPLACE INTO documents
            (id, namespace, content, embedding, chunk_order, indexed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )?;

        for doc in docs {
            stmt.execute(params![
                doc.id.to_string(),
                doc.namespace,
                doc.content,
                Self::embedding_to_bytes(&doc.embedding),
                doc.chunk_order,
                doc.indexed_at.to_rfc3339(),
            ])?;
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    #[instrument(skip(self, docs), fields(count = docs.len()))]
    async fn upsert(&self, docs: &[Document]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        Self::insert_all(&tx, docs)?;
        tx.commit()?;

        debug!("Upserted {} documents", docs.len());
        Ok(docs.len())
    }

    #[instrument(skip(self, docs), fields(count = docs.len()))]
    async fn replace_namespace(&self, namespace: &str, docs: &[Document]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM documents WHERE namespace = ?1", params![namespace])?;
        Self::insert_all(&tx, docs)?;
        tx.commit()?;

        info!("Replaced namespace {} ({} -> {} documents)", namespace, removed, docs.len());
        Ok(docs.len())
    }

    #[instrument(skip(self, query_embedding))]
    async fn search_with_threshold(
        &self,
        namespace: &str,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<SearchResult>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT id, namespace, content, embedding, chunk_order, indexed_at
            FROM documents
            WHERE namespace = ?1
            "#,
        )?;

        let docs = stmt.query_map(params![namespace], |row| {
            let id_str: String = row.get(0)?;
            let embedding_bytes: Vec<u8> = row.get(3)?;
            let indexed_at_str: String = row.get(5)?;

            Ok(Document {
                id: uuid::Uuid::parse_str(&id_str).unwrap_or_default(),
                namespace: row.get(1)?,
                content: row.get(2)?,
                embedding: Self::bytes_to_embedding(&embedding_bytes),
                chunk_order: row.get(4)?,
                indexed_at: DateTime::parse_from_rfc3339(&indexed_at_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let candidates: Vec<Document> = docs.filter_map(|d| d.ok()).collect();
        let results = rank(candidates, query_embedding, limit, min_score);

        debug!("Found {} matching documents", results.len());
        Ok(results)
    }

    #[instrument(skip(self))]
    async fn delete_namespace(&self, namespace: &str) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM documents WHERE namespace = ?1", params![namespace])?;

        info!("Deleted {} documents from namespace {}", deleted, namespace);
        Ok(deleted)
    }

    async fn namespace_size(&self, namespace: &str) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE namespace = ?1",
            params![namespace],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
