//! Short-term conversation log per actor, optionally tagged with the user
//! on the other side of the thread.
//!
//! Append-only. The tiered cache never writes here; the engagement loop
//! appends a turn after a reply has been admitted and sent.

use crate::exact::parse_timestamp;
use chrono::{DateTime, Utc};
use murmur_types::actor::{normalize_handle, ActorId};
use murmur_types::error::{MurmurError, MurmurResult};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// Someone talking to the persona.
    User,
    /// The persona itself.
    Persona,
}

impl TurnRole {
    fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Persona => "persona",
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "persona" => TurnRole::Persona,
            _ => TurnRole::User,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub actor_id: ActorId,
    /// Canonical handle of the user in the thread, when known.
    pub peer: Option<String>,
    pub role: TurnRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Conversation log backed by SQLite.
#[derive(Clone)]
pub struct ConversationLog {
    conn: Arc<Mutex<Connection>>,
}

impl ConversationLog {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Append a turn. `peer` is the user the persona is talking with.
    pub fn append(
        &self,
        actor_id: &ActorId,
        peer: Option<&str>,
        role: TurnRole,
        content: &str,
    ) -> MurmurResult<()> {
        let peer = peer.map(normalize_handle).filter(|p| !p.is_empty());
        let conn = self
            .conn
            .lock()
            .map_err(|e| MurmurError::Internal(e.to_string()))?;
        conn.execute(
            "INSERT INTO conversation_log (actor_id, peer, role, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                actor_id.as_str(),
                peer,
                role.as_str(),
                content,
                Utc::now().to_rfc3339()
            ],
        )
        .map_err(|e| MurmurError::Memory(e.to_string()))?;
        Ok(())
    }

    /// The last `limit` turns for an actor, oldest first.
    pub fn recent(&self, actor_id: &ActorId, limit: usize) -> MurmurResult<Vec<ConversationTurn>> {
        self.select(
            "SELECT peer, role, content, created_at FROM conversation_log
             WHERE actor_id = ?1 ORDER BY id DESC LIMIT ?2",
            actor_id,
            rusqlite::params![actor_id.as_str(), limit as i64],
        )
    }

    /// The last `limit` turns between an actor and one user, oldest first.
    pub fn recent_with_peer(
        &self,
        actor_id: &ActorId,
        peer: &str,
        limit: usize,
    ) -> MurmurResult<Vec<ConversationTurn>> {
        self.select(
            "SELECT peer, role, content, created_at FROM conversation_log
             WHERE actor_id = ?1 AND peer = ?2 ORDER BY id DESC LIMIT ?3",
            actor_id,
            rusqlite::params![actor_id.as_str(), normalize_handle(peer), limit as i64],
        )
    }

    fn select(
        &self,
        sql: &str,
        actor_id: &ActorId,
        params: &[&dyn rusqlite::ToSql],
    ) -> MurmurResult<Vec<ConversationTurn>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MurmurError::Internal(e.to_string()))?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| MurmurError::Memory(e.to_string()))?;
        let rows = stmt
            .query_map(params, |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(|e| MurmurError::Memory(e.to_string()))?;

        let mut turns = Vec::new();
        for row in rows {
            let (peer, role, content, created_str) =
                row.map_err(|e| MurmurError::Memory(e.to_string()))?;
            turns.push(ConversationTurn {
                actor_id: actor_id.clone(),
                peer,
                role: TurnRole::parse(&role),
                content,
                created_at: parse_timestamp(&created_str),
            });
        }
        turns.reverse();
        Ok(turns)
    }

    pub fn count(&self) -> MurmurResult<u64> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| MurmurError::Internal(e.to_string()))?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM conversation_log", [], |row| row.get(0))
            .map_err(|e| MurmurError::Memory(e.to_string()))?;
        Ok(n as u64)
    }
}
