//! SQLite-backed transcript cache and chat log.

use super::{ChatHistory, TranscriptCache};
use crate::error::{LingoError, Result};
use crate::models::{ChatMessage, ConversationKey, QaPair, Role, TranscriptRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS transcripts (
        video_id TEXT PRIMARY KEY,
        url TEXT NOT NULL,
        full_text TEXT NOT NULL,
        strategy TEXT NOT NULL,
        items_json TEXT NOT NULL,
        qa_pairs_json TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS chat_messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        video_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        role TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_chat_messages_conversation
        ON chat_messages(video_id, user_id, created_at);
"#;

/// SQLite store for transcripts and chat messages.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
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
            .map_err(|e| LingoError::Storage(format!("Failed to acquire lock: {}", e)))
    }

    /// Number of cached transcripts.
    pub fn transcript_count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM transcripts", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl TranscriptCache for SqliteStore {
    #[instrument(skip(self))]
    async fn get(&self, video_id: &str) -> Result<Option<TranscriptRecord>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                r#"
                SELECT video_id, url, full_text, strategy, items_json, qa_pairs_json, created_at
                FROM transcripts WHERE video_id = ?1
                "#,
                params![video_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((video_id, url, full_text, strategy, items_json, qa_json, created_at)) = row else {
            return Ok(None);
        };

        Ok(Some(TranscriptRecord {
            video_id,
            url,
            full_text,
            strategy,
            items: serde_json::from_str(&items_json)?,
            qa_pairs: serde_json::from_str(&qa_json)?,
            created_at: parse_timestamp(&created_at),
        }))
    }

    #[instrument(skip(self, record), fields(video_id = %record.video_id))]
    async fn put(&self, record: &TranscriptRecord) -> Result<()> {
        let items_json = serde_json::to_string(&record.items)?;
        let qa_json = serde_json::to_string(&record.qa_pairs)?;

        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO transcripts
            (video_id, url, full_text, strategy, items_json, qa_pairs_json, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.video_id,
                record.url,
                record.full_text,
                record.strategy,
                items_json,
                qa_json,
                record.created_at.to_rfc3339(),
            ],
        )?;

        debug!("Cached transcript ({} chars)", record.full_text.len());
        Ok(())
    }

    #[instrument(skip(self, qa_pairs))]
    async fn set_qa_pairs(&self, video_id: &str, qa_pairs: &[QaPair]) -> Result<bool> {
        let qa_json = serde_json::to_string(qa_pairs)?;

        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE transcripts SET qa_pairs_json = ?1 WHERE video_id = ?2",
            params![qa_json, video_id],
        )?;
        Ok(updated > 0)
    }
}

#[async_trait]
impl ChatHistory for SqliteStore {
    async fn recent(&self, key: &ConversationKey, limit: usize) -> Result<Vec<ChatMessage>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT role, content, created_at FROM chat_messages
            WHERE video_id = ?1 AND user_id = ?2
            ORDER BY created_at DESC, id DESC
            LIMIT ?3
            "#,
        )?;

        let rows = stmt.query_map(params![key.video_id, key.user_id, limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut messages = Vec::new();
        for row in rows {
            let (role, content, created_at) = row?;
            let role: Role = role.parse().map_err(LingoError::Storage)?;
            messages.push(ChatMessage {
                role,
                content,
                created_at: parse_timestamp(&created_at),
            });
        }

        // Newest first from the query; replay oldest first.
        messages.reverse();
        Ok(messages)
    }

    async fn append(&self, key: &ConversationKey, message: &ChatMessage) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            r#"
            INSERT INTO chat_messages (video_id, user_id, role, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                key.video_id,
                key.user_id,
                message.role.as_str(),
                message.content,
                message.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn clear(&self, key: &ConversationKey) -> Result<usize> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM chat_messages WHERE video_id = ?1 AND user_id = ?2",
            params![key.video_id, key.user_id],
        )?;
        info!("Cleared {} messages for {}/{}", deleted, key.video_id, key.user_id);
        Ok(deleted)
    }
}
