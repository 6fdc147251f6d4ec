//! SQLite record of already-published content.

use crate::exact::parse_timestamp;
use async_trait::async_trait;
use chrono::Utc;
use murmur_types::error::{MurmurError, MurmurResult};
use murmur_types::memory::{EmittedContentRecord, EmittedContentStore};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// Append-only emitted-content store backed by SQLite.
#[derive(Clone)]
pub struct SqliteEmittedStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteEmittedStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    pub fn contains(&self, normalized_text: &str) -> MurmurResult<bool> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MurmurError::Internal(e.to_string()))?;
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM emitted_content WHERE normalized_text = ?1",
                rusqlite::params![normalized_text],
                |row| row.get(0),
            )
            .map_err(|e| MurmurError::Memory(e.to_string()))?;
        Ok(n > 0)
    }

    /// Insert unless present; returns whether a row was added.
    pub fn insert(&self, normalized_text: &str) -> MurmurResult<bool> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MurmurError::Internal(e.to_string()))?;
        let changed = conn
            .execute(
                "INSERT OR IGNORE INTO emitted_content (normalized_text, created_at) VALUES (?1, ?2)",
                rusqlite::params![normalized_text, Utc::now().to_rfc3339()],
            )
            .map_err(|e| MurmurError::Memory(e.to_string()))?;
        Ok(changed == 1)
    }

    /// Most recently emitted content, newest first.
    pub fn recent(&self, limit: usize) -> MurmurResult<Vec<EmittedContentRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MurmurError::Internal(e.to_string()))?;
        let mut stmt = conn
            .prepare(
                "SELECT normalized_text, created_at FROM emitted_content
                 ORDER BY rowid DESC LIMIT ?1",
            )
            .map_err(|e| MurmurError::Memory(e.to_string()))?;
        let rows = stmt
            .query_map(rusqlite::params![limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| MurmurError::Memory(e.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            let (normalized_text, created_str) =
                row.map_err(|e| MurmurError::Memory(e.to_string()))?;
            records.push(EmittedContentRecord {
                normalized_text,
                created_at: parse_timestamp(&created_str),
            });
        }
        Ok(records)
    }

    pub fn count(&self) -> MurmurResult<u64> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MurmurError::Internal(e.to_string()))?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM emitted_content", [], |row| row.get(0))
            .map_err(|e| MurmurError::Memory(e.to_string()))?;
        Ok(n as u64)
    }
}

#[async_trait]
impl EmittedContentStore for SqliteEmittedStore {
    async fn exists(&self, normalized_text: &str) -> MurmurResult<bool> {
        self.contains(normalized_text)
    }

    async fn insert_if_absent(&self, normalized_text: &str) -> MurmurResult<bool> {
        self.insert(normalized_text)
    }
}
