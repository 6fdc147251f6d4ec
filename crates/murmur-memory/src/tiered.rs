//! Two-tier answer memory.
//!
//! Lookups try the exact tier first (normalized query text as the key) and
//! only fall back to the semantic tier on a miss. Semantic candidates must
//! clear the read threshold and share the full context key of the query.
//! A semantic hit is backfilled into the exact tier, so repeated phrasings
//! converge to O(1) lookups.
//!
//! Admission always refreshes the exact tier. The vector write is guarded by
//! a near-duplicate check at the (stricter) admission threshold; when an
//! existing entry already clears it, only the exact tier is written.
//!
//! Failures of the embedding driver or the vector index degrade to a miss on
//! reads and to a skipped vector write on admission. Exact-tier failures are
//! returned to the caller.

use crate::classifier::{classify, normalize};
use chrono::Utc;
use murmur_types::actor::ActorId;
use murmur_types::config::{
    MemoryConfig, DEFAULT_ADMISSION_THRESHOLD, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TOP_K,
};
use murmur_types::context::ContextKey;
use murmur_types::embedding::EmbeddingDriver;
use murmur_types::error::{MurmurError, MurmurResult};
use murmur_types::memory::{
    AdmitOutcome, CacheHit, ExactMemoryStore, MemoryRecord, MemoryTier, VectorEntry,
    VectorFilter, VectorId, VectorMatch, VectorMemoryIndex, VectorMetadata, VectorWrite,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Thresholds and fan-out for the tiered cache.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TieredCacheSettings {
    /// Read threshold (inclusive).
    pub similarity_threshold: f32,
    /// Write-suppression threshold (inclusive).
    pub admission_threshold: f32,
    /// Neighbors fetched per vector query.
    pub top_k: usize,
}

impl Default for TieredCacheSettings {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            admission_threshold: DEFAULT_ADMISSION_THRESHOLD,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl From<&MemoryConfig> for TieredCacheSettings {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            similarity_threshold: config.similarity_threshold,
            admission_threshold: config.admission_threshold,
            top_k: config.top_k,
        }
    }
}

/// Orchestrates the exact store, the vector index and the classifier.
#[derive(Clone)]
pub struct TieredMemoryCache {
    exact: Arc<dyn ExactMemoryStore>,
    vectors: Arc<dyn VectorMemoryIndex>,
    embedder: Arc<dyn EmbeddingDriver>,
    settings: TieredCacheSettings,
}

impl TieredMemoryCache {
    pub fn new(
        exact: Arc<dyn ExactMemoryStore>,
        vectors: Arc<dyn VectorMemoryIndex>,
        embedder: Arc<dyn EmbeddingDriver>,
        settings: TieredCacheSettings,
    ) -> Self {
        Self {
            exact,
            vectors,
            embedder,
            settings,
        }
    }

    pub fn settings(&self) -> TieredCacheSettings {
        self.settings
    }

    /// Find a reusable answer for `raw_query`, or `None` on a full miss.
    pub async fn lookup(
        &self,
        actor_id: &ActorId,
        raw_query: &str,
    ) -> MurmurResult<Option<CacheHit>> {
        let normalized = normalized_or_reject(raw_query)?;

        if let Some(record) = self.exact.get(actor_id, &normalized).await? {
            debug!(actor = %actor_id, query = %normalized, "Exact memory hit");
            return Ok(Some(CacheHit {
                record,
                tier: MemoryTier::Exact,
            }));
        }

        let context = classify(&normalized);
        let Some(candidate) = self.semantic_match(actor_id, &normalized, context).await else {
            debug!(actor = %actor_id, query = %normalized, %context, "Memory miss");
            return Ok(None);
        };

        let now = Utc::now();
        let record = MemoryRecord {
            actor_id: actor_id.clone(),
            normalized_query: normalized.clone(),
            summary: candidate.metadata.summary,
            response: candidate.metadata.response,
            context: candidate.metadata.context,
            created_at: now,
            last_cached_at: now,
        };
        self.backfill_exact(&record).await;

        info!(
            actor = %actor_id,
            query = %normalized,
            matched = %candidate.metadata.normalized_query,
            score = candidate.score,
            "Semantic memory hit"
        );
        Ok(Some(CacheHit {
            record,
            tier: MemoryTier::Semantic {
                score: candidate.score,
                matched_query: candidate.metadata.normalized_query,
            },
        }))
    }

    /// Remember `response` as the answer to `raw_query`.
    pub async fn admit(
        &self,
        actor_id: &ActorId,
        raw_query: &str,
        summary: &str,
        response: &str,
    ) -> MurmurResult<AdmitOutcome> {
        let normalized = normalized_or_reject(raw_query)?;
        let context = classify(&normalized);

        let now = Utc::now();
        let record = MemoryRecord {
            actor_id: actor_id.clone(),
            normalized_query: normalized.clone(),
            summary: summary.to_string(),
            response: response.to_string(),
            context,
            created_at: now,
            last_cached_at: now,
        };
        self.exact.upsert(&record).await?;
        // Re-read so a refreshed row reports its original `created_at`.
        let record = self
            .exact
            .get(actor_id, &normalized)
            .await?
            .unwrap_or(record);

        let vector = self.admit_vector(&record).await;
        match &vector {
            VectorWrite::Written { id } => {
                debug!(actor = %actor_id, query = %normalized, %id, "Vector entry written")
            }
            VectorWrite::DuplicateSuppressed { existing, score } => info!(
                actor = %actor_id,
                query = %normalized,
                %existing,
                score,
                "Near-duplicate vector write suppressed"
            ),
            VectorWrite::Skipped { reason } => warn!(
                actor = %actor_id,
                query = %normalized,
                reason = %reason,
                "Vector write skipped, exact tier only"
            ),
        }
        Ok(AdmitOutcome { record, vector })
    }

    /// Embed, query, and pick the first acceptable candidate.
    async fn semantic_match(
        &self,
        actor_id: &ActorId,
        normalized: &str,
        context: ContextKey,
    ) -> Option<VectorMatch> {
        let embedding = match self.embedder.embed_one(normalized).await {
            Ok(e) => e,
            Err(e) => {
                warn!(actor = %actor_id, error = %e, "Embedding failed, treating lookup as miss");
                return None;
            }
        };
        let filter = VectorFilter {
            actor_id: actor_id.clone(),
            context,
        };
        let candidates = match self
            .vectors
            .query(&embedding, self.settings.top_k, &filter)
            .await
        {
            Ok(c) => c,
            Err(e) => {
                warn!(actor = %actor_id, error = %e, "Vector query failed, treating lookup as miss");
                return None;
            }
        };
        // Filtered backends may still hand back near-misses; re-check context.
        candidates
            .into_iter()
            .find(|c| c.score >= self.settings.similarity_threshold && filter.matches(&c.metadata))
    }

    /// Promote a semantic hit into the exact tier unless a row appeared
    /// meanwhile. Failures only cost the promotion.
    async fn backfill_exact(&self, record: &MemoryRecord) {
        match self
            .exact
            .get(&record.actor_id, &record.normalized_query)
            .await
        {
            Ok(Some(_)) => {}
            Ok(None) => {
                if let Err(e) = self.exact.upsert(record).await {
                    warn!(error = %e, query = %record.normalized_query, "Exact-tier backfill failed");
                }
            }
            Err(e) => {
                warn!(error = %e, query = %record.normalized_query, "Exact-tier backfill check failed")
            }
        }
    }

    async fn admit_vector(&self, record: &MemoryRecord) -> VectorWrite {
        let embedding = match self.embedder.embed_one(&record.normalized_query).await {
            Ok(e) => e,
            Err(e) => {
                return VectorWrite::Skipped {
                    reason: MurmurError::from(e).to_string(),
                }
            }
        };

        let id = VectorId::for_query(&record.actor_id, &record.normalized_query);
        let filter = VectorFilter {
            actor_id: record.actor_id.clone(),
            context: record.context,
        };
        let neighbors = match self
            .vectors
            .query(&embedding, self.settings.top_k, &filter)
            .await
        {
            Ok(n) => n,
            Err(e) => {
                return VectorWrite::Skipped {
                    reason: e.to_string(),
                }
            }
        };

        // Our own slot always gets refreshed so both tiers keep the same answer.
        // It may sit outside the top-k window on ties, so ask the index by id.
        let duplicate = neighbors.iter().find(|n| {
            n.score >= self.settings.admission_threshold && filter.matches(&n.metadata)
        });
        if let Some(dup) = duplicate {
            let owns_slot = if neighbors.iter().any(|n| n.id == id) {
                true
            } else {
                match self.vectors.contains(&id).await {
                    Ok(found) => found,
                    Err(e) => {
                        return VectorWrite::Skipped {
                            reason: e.to_string(),
                        }
                    }
                }
            };
            if !owns_slot {
                return VectorWrite::DuplicateSuppressed {
                    existing: dup.id.clone(),
                    score: dup.score,
                };
            }
        }

        let entry = VectorEntry {
            id: id.clone(),
            embedding,
            metadata: VectorMetadata {
                actor_id: record.actor_id.clone(),
                normalized_query: record.normalized_query.clone(),
                summary: record.summary.clone(),
                response: record.response.clone(),
                context: record.context,
            },
        };
        match self.vectors.upsert(&entry).await {
            Ok(()) => VectorWrite::Written { id },
            Err(e) => VectorWrite::Skipped {
                reason: e.to_string(),
            },
        }
    }
}

fn normalized_or_reject(raw: &str) -> MurmurResult<String> {
    let normalized = normalize(raw);
    if normalized.is_empty() {
        return Err(MurmurError::InvalidInput(
            "query text is empty after normalization".to_string(),
        ));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::SqliteExactStore;
    use crate::migration::run_migrations;
    use crate::vector::SqliteVectorIndex;
    use async_trait::async_trait;
    use murmur_types::context::{Intent, Tone, Topic};
    use murmur_types::embedding::EmbeddingError;
    use rusqlite::Connection;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    // -- Fakes --

    /// Embeds by table lookup on the normalized text.
    #[derive(Default)]
    struct TableEmbedder {
        table: HashMap<String, Vec<f32>>,
        fail: AtomicBool,
    }

    impl TableEmbedder {
        fn with(entries: &[(&str, Vec<f32>)]) -> Self {
            Self {
                table: entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl EmbeddingDriver for TableEmbedder {
        async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(EmbeddingError::Http("connection refused".to_string()));
            }
            texts
                .iter()
                .map(|t| {
                    self.table
                        .get(*t)
                        .cloned()
                        .ok_or_else(|| EmbeddingError::Parse(format!("no vector for '{t}'")))
                })
                .collect()
        }

        fn dimensions(&self) -> usize {
            3
        }
    }

    /// Exact store over a HashMap, counting calls.
    #[derive(Default)]
    struct MapExactStore {
        rows: Mutex<HashMap<(ActorId, String), MemoryRecord>>,
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    #[async_trait]
    impl ExactMemoryStore for MapExactStore {
        async fn get(
            &self,
            actor_id: &ActorId,
            normalized_query: &str,
        ) -> MurmurResult<Option<MemoryRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(MurmurError::Memory("database is locked".to_string()));
            }
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .get(&(actor_id.clone(), normalized_query.to_string()))
                .cloned())
        }

        async fn upsert(&self, record: &MemoryRecord) -> MurmurResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(MurmurError::Memory("database is locked".to_string()));
            }
            self.rows.lock().unwrap().insert(
                (record.actor_id.clone(), record.normalized_query.clone()),
                record.clone(),
            );
            Ok(())
        }
    }

    /// Returns scripted candidates regardless of the query vector.
    #[derive(Default)]
    struct ScriptedIndex {
        candidates: Vec<VectorMatch>,
        written: Mutex<Vec<VectorEntry>>,
        fail: AtomicBool,
    }

    #[async_trait]
    impl VectorMemoryIndex for ScriptedIndex {
        async fn query(
            &self,
            _embedding: &[f32],
            top_k: usize,
            _filter: &VectorFilter,
        ) -> MurmurResult<Vec<VectorMatch>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(MurmurError::Memory("index unavailable".to_string()));
            }
            Ok(self.candidates.iter().take(top_k).cloned().collect())
        }

        async fn upsert(&self, entry: &VectorEntry) -> MurmurResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(MurmurError::Memory("index unavailable".to_string()));
            }
            self.written.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn contains(&self, id: &VectorId) -> MurmurResult<bool> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(MurmurError::Memory("index unavailable".to_string()));
            }
            Ok(self.candidates.iter().any(|c| &c.id == id)
                || self.written.lock().unwrap().iter().any(|e| &e.id == id))
        }
    }

    fn actor() -> ActorId {
        ActorId::new("mando_bot")
    }

    fn starwars_question() -> ContextKey {
        ContextKey::new(Intent::Question, Topic::StarWars, Tone::Neutral)
    }

    fn candidate(query: &str, score: f32, context: ContextKey, response: &str) -> VectorMatch {
        VectorMatch {
            id: VectorId::for_query(&actor(), query),
            score,
            metadata: VectorMetadata {
                actor_id: actor(),
                normalized_query: query.to_string(),
                summary: String::new(),
                response: response.to_string(),
                context,
            },
        }
    }

    /// Unit vector at cosine `sim` from [1, 0, 0].
    fn at_similarity(sim: f32) -> Vec<f32> {
        vec![sim, (1.0 - sim * sim).sqrt(), 0.0]
    }

    struct SqliteHarness {
        cache: TieredMemoryCache,
        exact: SqliteExactStore,
        vectors: SqliteVectorIndex,
        embedder: Arc<TableEmbedder>,
    }

    fn sqlite_harness(embeddings: &[(&str, Vec<f32>)]) -> SqliteHarness {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        let conn = Arc::new(Mutex::new(conn));
        let exact = SqliteExactStore::new(Arc::clone(&conn));
        let vectors = SqliteVectorIndex::new(Arc::clone(&conn));
        let embedder = Arc::new(TableEmbedder::with(embeddings));
        let cache = TieredMemoryCache::new(
            Arc::new(exact.clone()),
            Arc::new(vectors.clone()),
            embedder.clone(),
            TieredCacheSettings::default(),
        );
        SqliteHarness {
            cache,
            exact,
            vectors,
            embedder,
        }
    }

    fn scripted_cache(
        candidates: Vec<VectorMatch>,
    ) -> (TieredMemoryCache, Arc<MapExactStore>, Arc<ScriptedIndex>) {
        scripted_cache_with(candidates, TieredCacheSettings::default())
    }

    fn scripted_cache_with(
        candidates: Vec<VectorMatch>,
        settings: TieredCacheSettings,
    ) -> (TieredMemoryCache, Arc<MapExactStore>, Arc<ScriptedIndex>) {
        let exact = Arc::new(MapExactStore::default());
        let index = Arc::new(ScriptedIndex {
            candidates,
            ..Default::default()
        });
        let embedder = Arc::new(TableEmbedder::with(&[
            ("what is beskar?", vec![1.0, 0.0, 0.0]),
            ("beskar, what is it", vec![0.9, 0.1, 0.0]),
        ]));
        let cache = TieredMemoryCache::new(exact.clone(), index.clone(), embedder, settings);
        (cache, exact, index)
    }

    // -- Lookup --

    #[tokio::test]
    async fn test_end_to_end_beskar() {
        let h = sqlite_harness(&[
            ("what is beskar?", vec![1.0, 0.0, 0.0]),
            ("beskar, what is it", at_similarity(0.95)),
        ]);
        assert_eq!(classify("What is Beskar?"), starwars_question());

        assert!(h.cache.lookup(&actor(), "What is Beskar?").await.unwrap().is_none());
        let outcome = h
            .cache
            .admit(
                &actor(),
                "What is Beskar?",
                "beskar",
                "Beskar is Mandalorian steel.",
            )
            .await
            .unwrap();
        assert!(matches!(outcome.vector, VectorWrite::Written { .. }));

        let hit = h
            .cache
            .lookup(&actor(), "beskar, what is it")
            .await
            .unwrap()
            .expect("semantic hit");
        assert_eq!(hit.response(), "Beskar is Mandalorian steel.");
        match &hit.tier {
            MemoryTier::Semantic {
                score,
                matched_query,
            } => {
                assert!(*score >= 0.85);
                assert_eq!(matched_query, "what is beskar?");
            }
            other => panic!("expected semantic tier, got {other:?}"),
        }

        // Backfilled: the paraphrase now hits the exact tier.
        let again = h
            .cache
            .lookup(&actor(), "beskar, what is it")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.tier, MemoryTier::Exact);
        assert_eq!(again.response(), "Beskar is Mandalorian steel.");
    }

    #[tokio::test]
    async fn test_exact_takes_precedence_over_semantic() {
        let h = sqlite_harness(&[
            ("what is beskar?", vec![1.0, 0.0, 0.0]),
            ("what's beskar?", at_similarity(0.90)),
        ]);
        h.cache
            .admit(&actor(), "What is Beskar?", "", "original answer")
            .await
            .unwrap();
        let second = h
            .cache
            .admit(&actor(), "What's Beskar?", "", "paraphrase answer")
            .await
            .unwrap();
        assert!(matches!(second.vector, VectorWrite::Written { .. }));

        let hit = h
            .cache
            .lookup(&actor(), "  WHAT IS BESKAR?  ")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.tier, MemoryTier::Exact);
        assert_eq!(hit.response(), "original answer");
    }

    #[tokio::test]
    async fn test_threshold_is_inclusive() {
        let (cache, _, _) = scripted_cache(vec![candidate(
            "what is beskar?",
            0.85,
            starwars_question(),
            "steel",
        )]);
        let hit = cache.lookup(&actor(), "beskar, what is it").await.unwrap();
        assert_eq!(hit.unwrap().response(), "steel");
    }

    #[tokio::test]
    async fn test_just_below_threshold_rejected() {
        let (cache, _, _) = scripted_cache(vec![candidate(
            "what is beskar?",
            0.8499,
            starwars_question(),
            "steel",
        )]);
        assert!(cache
            .lookup(&actor(), "beskar, what is it")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_context_recheck_skips_mismatched_candidates() {
        let tech = ContextKey::new(Intent::Question, Topic::Tech, Tone::Neutral);
        let (cache, _, _) = scripted_cache(vec![
            candidate("is the gpu steel?", 0.99, tech, "wrong context"),
            candidate("what is beskar?", 0.90, starwars_question(), "steel"),
            candidate("what is beskar made of?", 0.88, starwars_question(), "later"),
        ]);
        let hit = cache
            .lookup(&actor(), "beskar, what is it")
            .await
            .unwrap()
            .unwrap();
        // First acceptable candidate in returned order wins.
        assert_eq!(hit.response(), "steel");
    }

    #[tokio::test]
    async fn test_context_isolation() {
        let same = vec![0.0, 1.0, 0.0];
        let h = sqlite_harness(&[
            ("is the death star big?", same.clone()),
            ("is the new gpu big?", same),
        ]);
        h.cache
            .admit(&actor(), "is the death star big?", "", "moon sized")
            .await
            .unwrap();
        assert!(h
            .cache
            .lookup(&actor(), "is the new gpu big?")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_actor_scoping() {
        let h = sqlite_harness(&[("what is beskar?", vec![1.0, 0.0, 0.0])]);
        h.cache
            .admit(&actor(), "What is Beskar?", "", "steel")
            .await
            .unwrap();
        let other = ActorId::new("grogu_bot");
        assert!(h
            .cache
            .lookup(&other, "What is Beskar?")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_semantic_hit_backfills_exact_tier() {
        let (cache, exact, _) = scripted_cache(vec![candidate(
            "what is beskar?",
            0.92,
            starwars_question(),
            "steel",
        )]);
        cache.lookup(&actor(), "Beskar, what is it").await.unwrap();
        let rows = exact.rows.lock().unwrap();
        let row = rows
            .get(&(actor(), "beskar, what is it".to_string()))
            .expect("backfilled row");
        assert_eq!(row.response, "steel");
        assert_eq!(row.context, starwars_question());
    }

    #[tokio::test]
    async fn test_embedding_failure_degrades_to_miss() {
        let h = sqlite_harness(&[("what is beskar?", vec![1.0, 0.0, 0.0])]);
        h.cache
            .admit(&actor(), "What is Beskar?", "", "steel")
            .await
            .unwrap();
        h.embedder.fail.store(true, Ordering::SeqCst);

        // Exact path still works without the embedder.
        assert!(h
            .cache
            .lookup(&actor(), "what is beskar?")
            .await
            .unwrap()
            .is_some());
        assert!(h
            .cache
            .lookup(&actor(), "beskar, what is it")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_index_failure_degrades_to_miss() {
        let (cache, _, index) = scripted_cache(vec![candidate(
            "what is beskar?",
            0.99,
            starwars_question(),
            "steel",
        )]);
        index.fail.store(true, Ordering::SeqCst);
        assert!(cache
            .lookup(&actor(), "beskar, what is it")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_exact_failure_propagates() {
        let (cache, exact, _) = scripted_cache(vec![]);
        exact.fail.store(true, Ordering::SeqCst);
        let err = cache
            .lookup(&actor(), "what is beskar?")
            .await
            .unwrap_err();
        assert!(matches!(err, MurmurError::Memory(_)));
    }

    #[tokio::test]
    async fn test_empty_query_rejected_before_io() {
        let (cache, exact, _) = scripted_cache(vec![]);
        let err = cache.lookup(&actor(), "   ").await.unwrap_err();
        assert!(matches!(err, MurmurError::InvalidInput(_)));
        let err = cache.admit(&actor(), "", "", "x").await.unwrap_err();
        assert!(matches!(err, MurmurError::InvalidInput(_)));
        assert_eq!(exact.calls.load(Ordering::SeqCst), 0);
    }

    // -- Admission --

    #[tokio::test]
    async fn test_admit_is_idempotent() {
        let h = sqlite_harness(&[("what is beskar?", vec![1.0, 0.0, 0.0])]);
        for _ in 0..2 {
            h.cache
                .admit(&actor(), "What is Beskar?", "beskar", "steel")
                .await
                .unwrap();
        }
        assert_eq!(h.vectors.count().unwrap(), 1);
        assert_eq!(h.exact.count().unwrap(), 1);
        let row = h
            .exact
            .load(&actor(), "what is beskar?")
            .unwrap()
            .unwrap();
        assert_eq!(row.summary, "beskar");
        assert_eq!(row.response, "steel");
    }

    #[tokio::test]
    async fn test_readmission_refreshes_both_tiers() {
        let h = sqlite_harness(&[("what is beskar?", vec![1.0, 0.0, 0.0])]);
        h.cache
            .admit(&actor(), "What is Beskar?", "", "old")
            .await
            .unwrap();
        let outcome = h
            .cache
            .admit(&actor(), "What is Beskar?", "", "new")
            .await
            .unwrap();
        assert!(matches!(outcome.vector, VectorWrite::Written { .. }));

        let row = h.exact.load(&actor(), "what is beskar?").unwrap().unwrap();
        assert_eq!(row.response, "new");
        let filter = VectorFilter {
            actor_id: actor(),
            context: starwars_question(),
        };
        let entries = h.vectors.search(&[1.0, 0.0, 0.0], 5, &filter).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].metadata.response, "new");
    }

    #[tokio::test]
    async fn test_near_duplicate_write_suppressed() {
        let h = sqlite_harness(&[
            ("what is beskar?", vec![1.0, 0.0, 0.0]),
            ("what is beskar??", at_similarity(0.99)),
        ]);
        h.cache
            .admit(&actor(), "What is Beskar?", "", "steel")
            .await
            .unwrap();
        let outcome = h
            .cache
            .admit(&actor(), "What is Beskar??", "", "steel!")
            .await
            .unwrap();

        assert!(outcome.is_duplicate_suppressed());
        match outcome.vector {
            VectorWrite::DuplicateSuppressed { existing, score } => {
                assert_eq!(existing, VectorId::for_query(&actor(), "what is beskar?"));
                assert!(score >= 0.98);
            }
            other => panic!("expected suppression, got {other:?}"),
        }
        assert_eq!(h.vectors.count().unwrap(), 1);
        // The exact tier still learns the literal phrasing.
        assert_eq!(h.exact.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_between_thresholds_still_written() {
        let h = sqlite_harness(&[
            ("what is beskar?", vec![1.0, 0.0, 0.0]),
            ("what's beskar?", at_similarity(0.90)),
            ("beskar, what is it", at_similarity(0.95)),
        ]);
        h.cache
            .admit(&actor(), "What is Beskar?", "", "original")
            .await
            .unwrap();
        let outcome = h
            .cache
            .admit(&actor(), "What's Beskar?", "", "paraphrase")
            .await
            .unwrap();
        assert!(matches!(outcome.vector, VectorWrite::Written { .. }));
        assert_eq!(h.vectors.count().unwrap(), 2);

        let original = h
            .cache
            .lookup(&actor(), "what is beskar?")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(original.tier, MemoryTier::Exact);
        assert_eq!(original.response(), "original");

        // A pure semantic query may land on either entry.
        let fuzzy = h
            .cache
            .lookup(&actor(), "beskar, what is it")
            .await
            .unwrap()
            .unwrap();
        assert!(["original", "paraphrase"].contains(&fuzzy.response()));
    }

    #[tokio::test]
    async fn test_admission_threshold_is_inclusive() {
        let (cache, _, index) = scripted_cache(vec![candidate(
            "beskar, what is it",
            0.98,
            starwars_question(),
            "steel",
        )]);
        let outcome = cache
            .admit(&actor(), "What is Beskar?", "", "steel")
            .await
            .unwrap();
        match outcome.vector {
            VectorWrite::DuplicateSuppressed { existing, score } => {
                assert_eq!(existing, VectorId::for_query(&actor(), "beskar, what is it"));
                assert_eq!(score, 0.98);
            }
            other => panic!("expected suppression, got {other:?}"),
        }
        assert!(index.written.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_just_below_admission_threshold_written() {
        let (cache, _, index) = scripted_cache(vec![candidate(
            "beskar, what is it",
            0.9799,
            starwars_question(),
            "steel",
        )]);
        let outcome = cache
            .admit(&actor(), "What is Beskar?", "", "steel")
            .await
            .unwrap();
        assert!(matches!(outcome.vector, VectorWrite::Written { .. }));
        assert_eq!(index.written.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_own_slot_at_full_similarity_is_refreshed() {
        let (cache, _, index) = scripted_cache(vec![candidate(
            "what is beskar?",
            1.0,
            starwars_question(),
            "old answer",
        )]);
        let outcome = cache
            .admit(&actor(), "What is Beskar?", "", "new answer")
            .await
            .unwrap();
        match outcome.vector {
            VectorWrite::Written { id } => {
                assert_eq!(id, VectorId::for_query(&actor(), "what is beskar?"))
            }
            other => panic!("expected refresh, got {other:?}"),
        }
        let written = index.written.lock().unwrap();
        assert_eq!(written[0].metadata.response, "new answer");
    }

    #[tokio::test]
    async fn test_own_slot_outside_window_is_refreshed() {
        // A tied neighbor fills the single slot; our own entry is ranked out.
        let (cache, _, index) = scripted_cache_with(
            vec![
                candidate("beskar, what is it", 1.0, starwars_question(), "other"),
                candidate("what is beskar?", 1.0, starwars_question(), "old answer"),
            ],
            TieredCacheSettings {
                top_k: 1,
                ..Default::default()
            },
        );
        let outcome = cache
            .admit(&actor(), "What is Beskar?", "", "new answer")
            .await
            .unwrap();
        assert!(matches!(outcome.vector, VectorWrite::Written { .. }));
        assert_eq!(
            index.written.lock().unwrap()[0].metadata.response,
            "new answer"
        );
    }

    #[tokio::test]
    async fn test_readmission_reports_original_created_at() {
        let h = sqlite_harness(&[("what is beskar?", vec![1.0, 0.0, 0.0])]);
        let first = h
            .cache
            .admit(&actor(), "What is Beskar?", "", "old")
            .await
            .unwrap();
        let second = h
            .cache
            .admit(&actor(), "What is Beskar?", "", "new")
            .await
            .unwrap();
        assert_eq!(second.record.created_at, first.record.created_at);
        assert!(second.record.last_cached_at >= first.record.last_cached_at);
        assert_eq!(second.record.response, "new");
    }

    #[tokio::test]
    async fn test_suppression_requires_same_context() {
        let tech = ContextKey::new(Intent::Question, Topic::Tech, Tone::Neutral);
        let (cache, _, index) = scripted_cache(vec![candidate(
            "what is the gpu?",
            0.995,
            tech,
            "a chip",
        )]);
        let outcome = cache
            .admit(&actor(), "What is Beskar?", "", "steel")
            .await
            .unwrap();
        assert!(matches!(outcome.vector, VectorWrite::Written { .. }));
        assert_eq!(index.written.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_embedding_failure_on_admit_keeps_exact_write() {
        let h = sqlite_harness(&[]);
        let outcome = h
            .cache
            .admit(&actor(), "What is Beskar?", "", "steel")
            .await
            .unwrap();
        assert!(matches!(outcome.vector, VectorWrite::Skipped { .. }));
        assert_eq!(h.exact.count().unwrap(), 1);
        assert_eq!(h.vectors.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_index_failure_on_admit_keeps_exact_write() {
        let (cache, exact, index) = scripted_cache(vec![]);
        index.fail.store(true, Ordering::SeqCst);
        let outcome = cache
            .admit(&actor(), "What is Beskar?", "", "steel")
            .await
            .unwrap();
        assert!(matches!(outcome.vector, VectorWrite::Skipped { .. }));
        assert_eq!(exact.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exact_failure_on_admit_propagates() {
        let (cache, exact, index) = scripted_cache(vec![]);
        exact.fail.store(true, Ordering::SeqCst);
        assert!(cache
            .admit(&actor(), "What is Beskar?", "", "steel")
            .await
            .is_err());
        assert!(index.written.lock().unwrap().is_empty());
    }

    #[test]
    fn test_settings_from_config() {
        let config = MemoryConfig {
            similarity_threshold: 0.8,
            admission_threshold: 0.97,
            top_k: 3,
            ..Default::default()
        };
        let settings = TieredCacheSettings::from(&config);
        assert_eq!(settings.top_k, 3);
        assert_eq!(settings.similarity_threshold, 0.8);
        assert_eq!(settings.admission_threshold, 0.97);
    }
}
