//! Freshness window for per-user data.
//!
//! Anything the persona looks up about the people it talks to (profiles,
//! follower counts, the recent thread with them) goes through a
//! [`UserDataCache`] keyed by `(actor, handle)`. Handles are compared in
//! canonical form, so `@Grogu` and `grogu` share an entry.
//!
//! Stale entries are dropped when read. A zero TTL turns the cache into a
//! passthrough: every read goes to the fetcher.

use dashmap::DashMap;
use murmur_types::actor::{normalize_handle, ActorId};
use murmur_types::config::MemoryConfig;
use std::future::Future;
use std::time::{Duration, Instant};

struct Fresh<V> {
    value: V,
    fetched_at: Instant,
}

type UserKey = (ActorId, String);

/// Per-(actor, user) cache with a TTL.
pub struct UserDataCache<V> {
    entries: DashMap<UserKey, Fresh<V>>,
    ttl: Duration,
}

impl<V: Clone> UserDataCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Cache sized by `memory.user_cache_ttl_secs`.
    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new(Duration::from_secs(config.user_cache_ttl_secs))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(actor: &ActorId, user: &str) -> UserKey {
        (actor.clone(), normalize_handle(user))
    }

    /// Fresh value for `user` as seen by `actor`. Stale entries are removed.
    pub fn get(&self, actor: &ActorId, user: &str) -> Option<V> {
        if self.ttl.is_zero() {
            return None;
        }
        let key = Self::key(actor, user);
        let entry = self.entries.get(&key)?;
        if entry.fetched_at.elapsed() <= self.ttl {
            return Some(entry.value.clone());
        }
        drop(entry);
        self.entries.remove(&key);
        None
    }

    pub fn put(&self, actor: &ActorId, user: &str, value: V) {
        if self.ttl.is_zero() {
            return;
        }
        self.entries.insert(
            Self::key(actor, user),
            Fresh {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    /// Read through the cache: serve a fresh entry, otherwise call `fetch`
    /// and remember its result. Fetch errors are returned and not cached.
    pub async fn get_or_try_fetch<F, Fut, E>(
        &self,
        actor: &ActorId,
        user: &str,
        fetch: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(actor, user) {
            return Ok(value);
        }
        let value = fetch().await?;
        self.put(actor, user, value.clone());
        Ok(value)
    }

    /// Forget one user, e.g. after new data about them was written.
    pub fn invalidate(&self, actor: &ActorId, user: &str) {
        self.entries.remove(&Self::key(actor, user));
    }

    pub fn evict_expired(&self) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| entry.fetched_at.elapsed() <= ttl);
    }

    /// Entry count, stale entries included until evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
