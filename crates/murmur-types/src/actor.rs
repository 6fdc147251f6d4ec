//! Actor identity.

use serde::{Deserialize, Serialize};

/// The social persona a memory belongs to (e.g. the account handle).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    /// Create an actor id from a handle. Leading `@` is stripped.
    pub fn new(handle: impl Into<String>) -> Self {
        let handle = handle.into();
        match handle.strip_prefix('@') {
            Some(rest) => Self(rest.to_string()),
            None => Self(handle),
        }
    }

    /// Borrow the handle.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical form of a platform handle: trimmed, no leading `@`, lowercase.
/// Used to key per-user data so `@Grogu` and `grogu` are the same user.
pub fn normalize_handle(handle: &str) -> String {
    let trimmed = handle.trim();
    trimmed
        .strip_prefix('@')
        .unwrap_or(trimmed)
        .to_lowercase()
}

impl From<&str> for ActorId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
