//! SQLite exact tier: cached answers keyed by `(actor, normalized query)`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use murmur_types::actor::ActorId;
use murmur_types::context::ContextKey;
use murmur_types::error::{MurmurError, MurmurResult};
use murmur_types::memory::{ExactMemoryStore, MemoryRecord};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// Exact-match store backed by SQLite.
#[derive(Clone)]
pub struct SqliteExactStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteExactStore {
    /// Create a new exact store wrapping the given connection.
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Load the record for a normalized query.
    pub fn load(
        &self,
        actor_id: &ActorId,
        normalized_query: &str,
    ) -> MurmurResult<Option<MemoryRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MurmurError::Internal(e.to_string()))?;
        let mut stmt = conn
            .prepare(
                "SELECT summary, response, intent, topic, tone, created_at, last_cached_at
                 FROM exact_memory WHERE actor_id = ?1 AND normalized_query = ?2",
            )
            .map_err(|e| MurmurError::Memory(e.to_string()))?;
        let result = stmt.query_row(
            rusqlite::params![actor_id.as_str(), normalized_query],
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
        );
        match result {
            Ok((summary, response, intent, topic, tone, created_str, cached_str)) => {
                Ok(Some(MemoryRecord {
                    actor_id: actor_id.clone(),
                    normalized_query: normalized_query.to_string(),
                    summary,
                    response,
                    context: decode_context(&intent, &topic, &tone)?,
                    created_at: parse_timestamp(&created_str),
                    last_cached_at: parse_timestamp(&cached_str),
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(MurmurError::Memory(e.to_string())),
        }
    }

    /// Insert or replace a record. `created_at` survives replacement.
    pub fn store(&self, record: &MemoryRecord) -> MurmurResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MurmurError::Internal(e.to_string()))?;
        conn.execute(
            "INSERT INTO exact_memory (actor_id, normalized_query, summary, response, intent, topic, tone, created_at, last_cached_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(actor_id, normalized_query) DO UPDATE SET
                summary = ?3, response = ?4, intent = ?5, topic = ?6, tone = ?7, last_cached_at = ?9",
            rusqlite::params![
                record.actor_id.as_str(),
                record.normalized_query,
                record.summary,
                record.response,
                record.context.intent.as_str(),
                record.context.topic.as_str(),
                record.context.tone.as_str(),
                record.created_at.to_rfc3339(),
                record.last_cached_at.to_rfc3339(),
            ],
        )
        .map_err(|e| MurmurError::Memory(e.to_string()))?;
        Ok(())
    }

    /// Number of rows in the exact tier.
    pub fn count(&self) -> MurmurResult<u64> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MurmurError::Internal(e.to_string()))?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM exact_memory", [], |row| row.get(0))
            .map_err(|e| MurmurError::Memory(e.to_string()))?;
        Ok(n as u64)
    }
}

#[async_trait]
impl ExactMemoryStore for SqliteExactStore {
    async fn get(
        &self,
        actor_id: &ActorId,
        normalized_query: &str,
    ) -> MurmurResult<Option<MemoryRecord>> {
        self.load(actor_id, normalized_query)
    }

    async fn upsert(&self, record: &MemoryRecord) -> MurmurResult<()> {
        self.store(record)
    }
}

/// Rebuild a context key from its three storage columns.
pub(crate) fn decode_context(intent: &str, topic: &str, tone: &str) -> MurmurResult<ContextKey> {
    Ok(ContextKey {
        intent: intent.parse()?,
        topic: topic.parse()?,
        tone: tone.parse()?,
    })
}

pub(crate) fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
