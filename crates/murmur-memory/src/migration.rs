//! SQLite schema creation and migration.
//!
//! Creates all tables needed by the memory substrate on first boot.

use rusqlite::Connection;

/// Current schema version.
const SCHEMA_VERSION: u32 = 3;

/// Run all migrations to bring the database up to date.
pub fn run_migrations(conn: &Connection) -> Result<(), rusqlite::Error> {
    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
    }

    if current_version < 3 {
        migrate_v3(conn)?;
    }

    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

/// Get the current schema version from the database.
fn get_schema_version(conn: &Connection) -> u32 {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
        .unwrap_or(0)
}

/// Set the schema version in the database.
fn set_schema_version(conn: &Connection, version: u32) -> Result<(), rusqlite::Error> {
    conn.pragma_update(None, "user_version", version)
}

/// Version 1: exact tier, semantic tier, emitted content.
fn migrate_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        -- Exact tier: one row per (actor, normalized query)
        CREATE TABLE IF NOT EXISTS exact_memory (
            actor_id TEXT NOT NULL,
            normalized_query TEXT NOT NULL,
            summary TEXT NOT NULL,
            response TEXT NOT NULL,
            intent TEXT NOT NULL,
            topic TEXT NOT NULL,
            tone TEXT NOT NULL,
            created_at TEXT NOT NULL,
            last_cached_at TEXT NOT NULL,
            PRIMARY KEY (actor_id, normalized_query)
        );

        -- Semantic tier: content-addressed vector entries
        CREATE TABLE IF NOT EXISTS memory_vectors (
            id TEXT PRIMARY KEY,
            actor_id TEXT NOT NULL,
            normalized_query TEXT NOT NULL,
            summary TEXT NOT NULL,
            response TEXT NOT NULL,
            intent TEXT NOT NULL,
            topic TEXT NOT NULL,
            tone TEXT NOT NULL,
            embedding BLOB NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_vectors_context
            ON memory_vectors(actor_id, intent, topic, tone);

        -- Previously published content (append-only)
        CREATE TABLE IF NOT EXISTS emitted_content (
            normalized_text TEXT PRIMARY KEY,
            created_at TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

/// Version 2: short-term conversation log per actor.
fn migrate_v2(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS conversation_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            actor_id TEXT NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_conversation_actor
            ON conversation_log(actor_id, id);
        ",
    )?;
    Ok(())
}

/// Version 3: who the persona was talking with, per turn.
fn migrate_v3(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        ALTER TABLE conversation_log ADD COLUMN peer TEXT;
        CREATE INDEX IF NOT EXISTS idx_conversation_peer
            ON conversation_log(actor_id, peer, id);
        ",
    )?;
    Ok(())
}
