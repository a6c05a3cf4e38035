//! Versioned SQLite schema.
//!
//! Applied versions are recorded in `schema_migrations`; opening a store
//! runs every missing version in one transaction. Attribute value tables
//! are not part of the schema: `register_attribute` creates them.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Bring the schema up to [`CURRENT_VERSION`]. Safe to call on every open.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
        tracing::info!(version = CURRENT_VERSION, "schema migrated");
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Graph nodes. Owned by the host; only existence matters here.
        CREATE TABLE parties (
            party_id INTEGER PRIMARY KEY
        );

        -- Graph edges with per-direction edit grants
        CREATE TABLE relationships (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            party_a INTEGER NOT NULL,
            party_b INTEGER NOT NULL,
            permission_a_to_b INTEGER NOT NULL DEFAULT 0,
            permission_b_to_a INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            start_date TEXT,                  -- YYYY-MM-DD, inclusive
            end_date TEXT                     -- YYYY-MM-DD, inclusive
        );

        -- Host user -> party mapping
        CREATE TABLE host_users (
            user_id INTEGER PRIMARY KEY,
            party_id INTEGER NOT NULL
        );

        -- Attribute catalog: a group owns one value table
        CREATE TABLE attribute_groups (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL UNIQUE,
            table_name TEXT NOT NULL
        );

        -- Attribute catalog: a field is one value column of its group's table
        CREATE TABLE attribute_fields (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            group_id INTEGER NOT NULL REFERENCES attribute_groups(id),
            column_name TEXT NOT NULL,
            UNIQUE(group_id, column_name)
        );

        -- Extension configuration
        CREATE TABLE acl_config (
            config_key TEXT PRIMARY KEY,
            config_value TEXT NOT NULL
        );

        -- Host link tables used by owner chains
        CREATE TABLE participants (
            id INTEGER PRIMARY KEY,
            event_id INTEGER NOT NULL,
            party_id INTEGER NOT NULL
        );

        CREATE TABLE participant_payments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            participant_id INTEGER NOT NULL,
            contribution_id INTEGER NOT NULL
        );

        -- Indexes for BFS rounds and chain hops
        CREATE INDEX idx_relationships_a ON relationships(party_a);
        CREATE INDEX idx_relationships_b ON relationships(party_b);
        CREATE INDEX idx_participants_event ON participants(event_id);
        CREATE INDEX idx_payments_contribution ON participant_payments(contribution_id);
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
