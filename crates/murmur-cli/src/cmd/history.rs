//! history show | append.
//!
//! With `--user`, reads go through the session's per-user cache and writes
//! invalidate that user's entry.

use super::{to_json, Session};
use murmur_memory::history::TurnRole;
use murmur_types::error::MurmurResult;
use serde_json::json;

pub async fn show(
    session: &Session,
    user: Option<&str>,
    limit: usize,
) -> MurmurResult<serde_json::Value> {
    let turns = match user {
        Some(user) => {
            let thread = session.peer_thread(user).await?;
            let skip = thread.len().saturating_sub(limit);
            thread.into_iter().skip(skip).collect()
        }
        None => session.substrate.history().recent(&session.actor, limit)?,
    };
    to_json(&turns)
}

pub fn append(
    session: &Session,
    user: Option<&str>,
    content: &str,
    role: TurnRole,
) -> MurmurResult<serde_json::Value> {
    session
        .substrate
        .history()
        .append(&session.actor, user, role, content)?;
    if let Some(user) = user {
        session.invalidate_peer(user);
    }
    Ok(json!({ "appended": true }))
}
