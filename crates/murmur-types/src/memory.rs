//! Memory types: records for the exact tier, vector entries for the semantic
//! tier, emitted-content rows, and the collaborator traits behind them.

use crate::actor::ActorId;
use crate::context::ContextKey;
use crate::error::MurmurResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A cached answer in the exact tier, keyed by `(actor_id, normalized_query)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Which persona owns this answer.
    pub actor_id: ActorId,
    /// Trimmed, lower-cased query text. The exact-match key.
    pub normalized_query: String,
    /// Short summary of the answer.
    pub summary: String,
    /// The answer itself.
    pub response: String,
    /// Context the query was classified into.
    pub context: ContextKey,
    /// When this query was first admitted.
    pub created_at: DateTime<Utc>,
    /// When this row was last written (admission or backfill).
    pub last_cached_at: DateTime<Utc>,
}

/// Content-addressed identifier for a vector entry.
///
/// Derived from the actor and the normalized query, so re-embedding identical
/// text always targets the same slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VectorId(pub String);

impl VectorId {
    /// Hash `actor_id` and `normalized_query` into a stable hex id.
    pub fn for_query(actor_id: &ActorId, normalized_query: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(actor_id.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(normalized_query.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }
}

impl std::fmt::Display for VectorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Typed metadata carried by every vector entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub actor_id: ActorId,
    pub normalized_query: String,
    pub summary: String,
    pub response: String,
    pub context: ContextKey,
}

/// A row in the semantic tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorEntry {
    pub id: VectorId,
    pub embedding: Vec<f32>,
    pub metadata: VectorMetadata,
}

/// Hard filter applied to a vector query. Every field must match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorFilter {
    pub actor_id: ActorId,
    pub context: ContextKey,
}

impl VectorFilter {
    /// Whether the given metadata satisfies this filter.
    pub fn matches(&self, metadata: &VectorMetadata) -> bool {
        metadata.actor_id == self.actor_id && metadata.context == self.context
    }
}

/// A nearest-neighbor candidate returned by a vector query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    pub id: VectorId,
    /// Cosine similarity in [-1.0, 1.0].
    pub score: f32,
    pub metadata: VectorMetadata,
}

/// A piece of content that has already been published.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedContentRecord {
    pub normalized_text: String,
    pub created_at: DateTime<Utc>,
}

/// Which tier answered a lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "tier")]
pub enum MemoryTier {
    /// Verbatim repeat of a known query.
    Exact,
    /// Similar enough query under the same context.
    Semantic {
        /// Similarity of the accepted candidate.
        score: f32,
        /// The stored query whose answer was reused.
        matched_query: String,
    },
}

/// A successful lookup.
///
/// On a semantic hit, `record` is the exact-tier row for the looked-up query
/// (backfilled from the matched entry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheHit {
    pub record: MemoryRecord,
    pub tier: MemoryTier,
}

impl CacheHit {
    /// The reusable answer.
    pub fn response(&self) -> &str {
        &self.record.response
    }
}

/// What happened to the semantic tier during an admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum VectorWrite {
    /// A vector entry was created or refreshed.
    Written { id: VectorId },
    /// An existing entry already represents this concept above the
    /// admission threshold; nothing was written.
    DuplicateSuppressed { existing: VectorId, score: f32 },
    /// The embedding provider or vector index failed; only the exact tier
    /// was written.
    Skipped { reason: String },
}

/// Result of admitting an answer into memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdmitOutcome {
    /// The exact-tier row as written.
    pub record: MemoryRecord,
    pub vector: VectorWrite,
}

impl AdmitOutcome {
    /// Whether the vector write was skipped as a near-duplicate.
    pub fn is_duplicate_suppressed(&self) -> bool {
        matches!(self.vector, VectorWrite::DuplicateSuppressed { .. })
    }
}

/// Result of recording an emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionOutcome {
    /// First time this content was recorded.
    Recorded,
    /// The content was already on record. Not an error.
    AlreadyRecorded,
}

/// Row counts across the memory stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub exact_records: u64,
    pub vector_entries: u64,
    pub emitted_records: u64,
    pub conversation_turns: u64,
}

/// Key-value store for the exact tier.
///
/// `upsert` must be atomic per key.
#[async_trait]
pub trait ExactMemoryStore: Send + Sync {
    /// Fetch the record for a normalized query, if any.
    async fn get(
        &self,
        actor_id: &ActorId,
        normalized_query: &str,
    ) -> MurmurResult<Option<MemoryRecord>>;

    /// Insert or replace the record for `(record.actor_id, record.normalized_query)`.
    /// An existing row keeps its `created_at`.
    async fn upsert(&self, record: &MemoryRecord) -> MurmurResult<()>;
}

/// Nearest-neighbor index for the semantic tier.
#[async_trait]
pub trait VectorMemoryIndex: Send + Sync {
    /// Return up to `top_k` candidates matching `filter`, best score first.
    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: &VectorFilter,
    ) -> MurmurResult<Vec<VectorMatch>>;

    /// Insert or replace the entry with `entry.id`.
    async fn upsert(&self, entry: &VectorEntry) -> MurmurResult<()>;

    /// Whether an entry with this id exists, regardless of filters.
    async fn contains(&self, id: &VectorId) -> MurmurResult<bool>;
}

/// Append-only record of published content.
#[async_trait]
pub trait EmittedContentStore: Send + Sync {
    /// Whether this normalized text is on record.
    async fn exists(&self, normalized_text: &str) -> MurmurResult<bool>;

    /// Insert the text unless present. Returns `true` if a row was inserted.
    async fn insert_if_absent(&self, normalized_text: &str) -> MurmurResult<bool>;
}
