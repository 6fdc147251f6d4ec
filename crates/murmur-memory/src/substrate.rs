//! One SQLite database shared by every store.

use crate::dedup::DeduplicationGuard;
use crate::emitted::SqliteEmittedStore;
use crate::exact::SqliteExactStore;
use crate::history::ConversationLog;
use crate::migration::run_migrations;
use crate::tiered::{TieredCacheSettings, TieredMemoryCache};
use crate::vector::SqliteVectorIndex;
use murmur_types::embedding::EmbeddingDriver;
use murmur_types::error::{MurmurError, MurmurResult};
use murmur_types::memory::MemoryStats;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Owns the connection and hands out stores built on it.
#[derive(Clone)]
pub struct MemorySubstrate {
    exact: SqliteExactStore,
    vectors: SqliteVectorIndex,
    emitted: SqliteEmittedStore,
    history: ConversationLog,
}

impl MemorySubstrate {
    /// Open (or create) the database at `db_path` and migrate it.
    pub fn open(db_path: &Path) -> MurmurResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path).map_err(|e| MurmurError::Memory(e.to_string()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")
            .map_err(|e| MurmurError::Memory(e.to_string()))?;
        let substrate = Self::from_connection(conn)?;
        info!(path = %db_path.display(), "Memory substrate opened");
        Ok(substrate)
    }

    /// In-memory database, for tests and dry runs.
    pub fn open_in_memory() -> MurmurResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| MurmurError::Memory(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> MurmurResult<Self> {
        run_migrations(&conn).map_err(|e| MurmurError::Memory(e.to_string()))?;
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self {
            exact: SqliteExactStore::new(Arc::clone(&conn)),
            vectors: SqliteVectorIndex::new(Arc::clone(&conn)),
            emitted: SqliteEmittedStore::new(Arc::clone(&conn)),
            history: ConversationLog::new(conn),
        })
    }

    /// Build a tiered cache over this database's exact and vector stores.
    pub fn tiered_cache(
        &self,
        embedder: Arc<dyn EmbeddingDriver>,
        settings: TieredCacheSettings,
    ) -> TieredMemoryCache {
        TieredMemoryCache::new(
            Arc::new(self.exact.clone()),
            Arc::new(self.vectors.clone()),
            embedder,
            settings,
        )
    }

    /// Build a deduplication guard over this database's emitted-content table.
    pub fn dedup_guard(&self) -> DeduplicationGuard {
        DeduplicationGuard::new(Arc::new(self.emitted.clone()))
    }

    pub fn exact(&self) -> &SqliteExactStore {
        &self.exact
    }

    pub fn vectors(&self) -> &SqliteVectorIndex {
        &self.vectors
    }

    pub fn emitted(&self) -> &SqliteEmittedStore {
        &self.emitted
    }

    pub fn history(&self) -> &ConversationLog {
        &self.history
    }

    /// Row counts across all stores.
    pub fn stats(&self) -> MurmurResult<MemoryStats> {
        Ok(MemoryStats {
            exact_records: self.exact.count()?,
            vector_entries: self.vectors.count()?,
            emitted_records: self.emitted.count()?,
            conversation_turns: self.history.count()?,
        })
    }
}
