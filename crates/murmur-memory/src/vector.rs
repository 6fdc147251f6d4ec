//! Semantic tier: vector entries in SQLite with cosine-similarity recall.
//!
//! Embeddings are stored as little-endian f32 BLOBs. A query narrows the
//! candidate set in SQL by actor and context key, then ranks the survivors
//! by cosine similarity in Rust.

use crate::exact::decode_context;
use async_trait::async_trait;
use chrono::Utc;
use murmur_types::error::{MurmurError, MurmurResult};
use murmur_types::memory::{
    VectorEntry, VectorFilter, VectorId, VectorMatch, VectorMemoryIndex, VectorMetadata,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Vector index backed by SQLite.
#[derive(Clone)]
pub struct SqliteVectorIndex {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteVectorIndex {
    /// Create a new vector index wrapping the given connection.
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Nearest neighbors under `filter`, best first.
    pub fn search(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: &VectorFilter,
    ) -> MurmurResult<Vec<VectorMatch>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MurmurError::Internal(e.to_string()))?;
        let mut stmt = conn
            .prepare(
                "SELECT id, normalized_query, summary, response, intent, topic, tone, embedding
                 FROM memory_vectors
                 WHERE actor_id = ?1 AND intent = ?2 AND topic = ?3 AND tone = ?4",
            )
            .map_err(|e| MurmurError::Memory(e.to_string()))?;
        let rows = stmt
            .query_map(
                rusqlite::params![
                    filter.actor_id.as_str(),
                    filter.context.intent.as_str(),
                    filter.context.topic.as_str(),
                    filter.context.tone.as_str(),
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, Vec<u8>>(7)?,
                    ))
                },
            )
            .map_err(|e| MurmurError::Memory(e.to_string()))?;

        let mut matches = Vec::new();
        let mut scanned = 0usize;
        for row in rows {
            let (id, normalized_query, summary, response, intent, topic, tone, blob) =
                row.map_err(|e| MurmurError::Memory(e.to_string()))?;
            scanned += 1;
            let stored = embedding_from_bytes(&blob);
            matches.push(VectorMatch {
                id: VectorId(id),
                score: cosine_similarity(embedding, &stored),
                metadata: VectorMetadata {
                    actor_id: filter.actor_id.clone(),
                    normalized_query,
                    summary,
                    response,
                    context: decode_context(&intent, &topic, &tone)?,
                },
            });
        }

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(top_k);
        debug!(
            "Vector recall: {} results from {} candidates",
            matches.len(),
            scanned
        );
        Ok(matches)
    }

    /// Insert or replace an entry by id.
    pub fn put(&self, entry: &VectorEntry) -> MurmurResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MurmurError::Internal(e.to_string()))?;
        let meta = &entry.metadata;
        conn.execute(
            "INSERT INTO memory_vectors (id, actor_id, normalized_query, summary, response, intent, topic, tone, embedding, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                summary = ?4, response = ?5, intent = ?6, topic = ?7, tone = ?8, embedding = ?9, updated_at = ?10",
            rusqlite::params![
                entry.id.0,
                meta.actor_id.as_str(),
                meta.normalized_query,
                meta.summary,
                meta.response,
                meta.context.intent.as_str(),
                meta.context.topic.as_str(),
                meta.context.tone.as_str(),
                embedding_to_bytes(&entry.embedding),
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| MurmurError::Memory(e.to_string()))?;
        Ok(())
    }

    /// Whether an entry with this id is stored.
    pub fn exists(&self, id: &VectorId) -> MurmurResult<bool> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MurmurError::Internal(e.to_string()))?;
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM memory_vectors WHERE id = ?1",
                rusqlite::params![id.0],
                |row| row.get(0),
            )
            .map_err(|e| MurmurError::Memory(e.to_string()))?;
        Ok(n > 0)
    }

    /// Number of vector entries.
    pub fn count(&self) -> MurmurResult<u64> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MurmurError::Internal(e.to_string()))?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM memory_vectors", [], |row| row.get(0))
            .map_err(|e| MurmurError::Memory(e.to_string()))?;
        Ok(n as u64)
    }
}

#[async_trait]
impl VectorMemoryIndex for SqliteVectorIndex {
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: &VectorFilter,
    ) -> MurmurResult<Vec<VectorMatch>> {
        self.search(embedding, top_k, filter)
    }

    async fn upsert(&self, entry: &VectorEntry) -> MurmurResult<()> {
        self.put(entry)
    }

    async fn contains(&self, id: &VectorId) -> MurmurResult<bool> {
        self.exists(id)
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths, empty input or zero-norm vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

/// Serialize embedding to bytes for SQLite BLOB storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &val in embedding {
        bytes.extend_from_slice(&val.to_le_bytes());
    }
    bytes
}

/// Deserialize embedding from bytes.
fn embedding_from_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
