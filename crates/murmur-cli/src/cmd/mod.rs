//! Command implementations by domain.
//!
//! Every command returns a JSON value; `main` prints it.

pub mod emitted;
pub mod history;
pub mod memory;

use crate::cli::{Commands, EmittedCommands, HistoryCommands};
use murmur_memory::history::ConversationTurn;
use murmur_memory::user_cache::UserDataCache;
use murmur_memory::{MemorySubstrate, TieredCacheSettings, TieredMemoryCache};
use murmur_runtime::create_embedding_driver_or_unavailable;
use murmur_types::actor::ActorId;
use murmur_types::config::MurmurConfig;
use murmur_types::embedding::EmbeddingDriver;
use murmur_types::error::{MurmurError, MurmurResult};
use serde::Serialize;
use std::sync::Arc;

/// Turns fetched per user when their thread is read through the cache.
pub const PEER_HISTORY_WINDOW: usize = 50;

/// An opened database plus the configuration and actor a command runs with.
pub struct Session {
    pub config: MurmurConfig,
    pub substrate: MemorySubstrate,
    pub actor: ActorId,
    /// Recent thread with each user, kept for `memory.user_cache_ttl_secs`.
    peer_threads: UserDataCache<Vec<ConversationTurn>>,
}

impl Session {
    /// Validate the config and open the database it points at.
    pub fn open(config: MurmurConfig, actor: &str) -> MurmurResult<Self> {
        config.validate()?;
        let substrate = MemorySubstrate::open(&config.memory.resolved_db_path())?;
        Ok(Self::with_substrate(config, substrate, actor))
    }

    pub fn with_substrate(config: MurmurConfig, substrate: MemorySubstrate, actor: &str) -> Self {
        Self {
            peer_threads: UserDataCache::from_config(&config.memory),
            config,
            substrate,
            actor: ActorId::new(actor),
        }
    }

    /// Build the tiered cache with the configured embedding driver.
    ///
    /// A driver that cannot be built only disables the semantic tier; exact
    /// hits and exact-tier writes keep working.
    pub fn tiered_cache(&self) -> TieredMemoryCache {
        let settings = &self.config.embedding;
        let driver = create_embedding_driver_or_unavailable(
            &settings.provider,
            &settings.model,
            &settings.api_key_env,
        );
        let embedder: Arc<dyn EmbeddingDriver + Send + Sync> = Arc::from(driver);
        self.substrate
            .tiered_cache(embedder, TieredCacheSettings::from(&self.config.memory))
    }

    /// Recent thread with `user`, served from the per-user cache while fresh.
    pub async fn peer_thread(&self, user: &str) -> MurmurResult<Vec<ConversationTurn>> {
        let history = self.substrate.history();
        self.peer_threads
            .get_or_try_fetch(&self.actor, user, || async {
                history.recent_with_peer(&self.actor, user, PEER_HISTORY_WINDOW)
            })
            .await
    }

    /// Drop the cached thread after writing to it.
    pub fn invalidate_peer(&self, user: &str) {
        self.peer_threads.invalidate(&self.actor, user);
    }
}

/// Run any command that needs the database.
pub async fn execute(session: &Session, command: Commands) -> MurmurResult<serde_json::Value> {
    match command {
        Commands::Classify { text } => Ok(memory::classify(&text)),
        Commands::Lookup { query } => memory::lookup(session, &query).await,
        Commands::Admit {
            query,
            response,
            summary,
        } => memory::admit(session, &query, &summary, &response).await,
        Commands::Stats => memory::stats(session),
        Commands::Emitted(sub) => match sub {
            EmittedCommands::Check { text } => emitted::check(session, &text).await,
            EmittedCommands::Record { text } => emitted::record(session, &text).await,
            EmittedCommands::List { limit } => emitted::list(session, limit),
            EmittedCommands::Pick { candidates } => emitted::pick(session, &candidates).await,
        },
        Commands::History(sub) => match sub {
            HistoryCommands::Show { limit, user } => {
                history::show(session, user.as_deref(), limit).await
            }
            HistoryCommands::Append {
                content,
                role,
                user,
            } => history::append(session, user.as_deref(), &content, role.into()),
        },
    }
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> MurmurResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| MurmurError::Serialization(e.to_string()))
}

#[cfg(test)]
pub(crate) fn test_session(actor: &str) -> Session {
    test_session_with(MurmurConfig::default(), actor)
}

#[cfg(test)]
pub(crate) fn test_session_with(config: MurmurConfig, actor: &str) -> Session {
    Session::with_substrate(config, MemorySubstrate::open_in_memory().unwrap(), actor)
}
