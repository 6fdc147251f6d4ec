//! Memory substrate for Murmur.
//!
//! Two tiers answer "have we already replied to this?":
//! - **Exact tier** (SQLite): cached answers keyed by normalized query text
//! - **Semantic tier** (SQLite + cosine similarity): embeddings filtered by
//!   the {intent, topic, tone} context key
//!
//! [`TieredMemoryCache`] orchestrates both; [`DeduplicationGuard`] keeps the
//! persona from posting the same text twice.

pub mod classifier;
pub mod dedup;
pub mod emitted;
pub mod exact;
pub mod history;
pub mod migration;
pub mod tiered;
pub mod user_cache;
pub mod vector;

mod substrate;
pub use dedup::DeduplicationGuard;
pub use substrate::MemorySubstrate;
pub use tiered::{TieredCacheSettings, TieredMemoryCache};
