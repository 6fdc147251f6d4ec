//! classify, lookup, admit, stats.

use super::{to_json, Session};
use murmur_memory::classifier::{classify as classify_text, normalize};
use murmur_types::error::MurmurResult;
use serde_json::json;

pub fn classify(text: &str) -> serde_json::Value {
    let key = classify_text(text);
    json!({
        "normalized": normalize(text),
        "key": key.to_string(),
        "context": key,
    })
}

pub async fn lookup(session: &Session, query: &str) -> MurmurResult<serde_json::Value> {
    let cache = session.tiered_cache();
    match cache.lookup(&session.actor, query).await? {
        Some(hit) => Ok(json!({
            "hit": true,
            "response": hit.response(),
            "match": to_json(&hit)?,
        })),
        None => Ok(json!({ "hit": false })),
    }
}

pub async fn admit(
    session: &Session,
    query: &str,
    summary: &str,
    response: &str,
) -> MurmurResult<serde_json::Value> {
    let cache = session.tiered_cache();
    let outcome = cache.admit(&session.actor, query, summary, response).await?;
    to_json(&outcome)
}

pub fn stats(session: &Session) -> MurmurResult<serde_json::Value> {
    to_json(&session.substrate.stats()?)
}
