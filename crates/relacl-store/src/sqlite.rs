//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite behind a mutex, so one store can be shared between request
//! handlers on different threads.
//!
//! Relationship dates are stored as `YYYY-MM-DD` text and compared as
//! strings, so only years 0000 through 9999 are accepted.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, TransactionBehavior};

use relacl_core::{
    validate_storable_date, AttributeDescriptor, AttributeRef, EntityId, ForeignKeyHop,
    HostUserId, PartyId, RelationshipEdge,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::schema::{ENTITY_ID_COLUMN, MAX_BATCH};
use crate::traits::{Store, UpsertResult};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Execute a blocking operation on the connection.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        f(&conn)
    }

    /// Execute a blocking operation that needs mutable access.
    fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        f(&mut conn)
    }
}

// Helper to build "?2, ?3, ..." for an id list bound after `offset` leading params
fn placeholders(count: usize, offset: usize) -> String {
    (0..count)
        .map(|i| format!("?{}", i + offset + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

// Helper to render a date the way it is stored
fn date_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

impl Store for SqliteStore {
    fn party_exists(&self, party: PartyId) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT party_id FROM parties WHERE party_id = ?1",
                    params![party.get()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    fn permitted_neighbors(
        &self,
        frontier: &BTreeSet<PartyId>,
        on: NaiveDate,
    ) -> Result<BTreeSet<PartyId>> {
        let on = validate_storable_date(on)?;
        if frontier.is_empty() {
            return Ok(BTreeSet::new());
        }

        let on_text = on.format("%Y-%m-%d").to_string();
        let members: Vec<PartyId> = frontier.iter().copied().collect();

        self.with_conn(|conn| {
            let mut found = BTreeSet::new();

            for chunk in members.chunks(MAX_BATCH) {
                let ids = placeholders(chunk.len(), 1);
                // ?1 is the evaluation date; both halves reuse the same id params
                let sql = format!(
                    "SELECT r.party_b FROM relationships r
                     INNER JOIN parties p ON p.party_id = r.party_a
                     WHERE r.party_a IN ({ids})
                       AND r.is_active = 1
                       AND r.permission_a_to_b = 1
                       AND (r.start_date IS NULL OR r.start_date <= ?1)
                       AND (r.end_date IS NULL OR r.end_date >= ?1)
                     UNION
                     SELECT r.party_a FROM relationships r
                     INNER JOIN parties p ON p.party_id = r.party_b
                     WHERE r.party_b IN ({ids})
                       AND r.is_active = 1
                       AND r.permission_b_to_a = 1
                       AND (r.start_date IS NULL OR r.start_date <= ?1)
                       AND (r.end_date IS NULL OR r.end_date >= ?1)",
                );

                let mut values = Vec::with_capacity(chunk.len() + 1);
                values.push(Value::Text(on_text.clone()));
                values.extend(chunk.iter().map(|p| Value::Integer(p.get())));

                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(values), |row| row.get::<_, i64>(0))?;
                for row in rows {
                    found.insert(PartyId::new(row?));
                }
            }

            Ok(found)
        })
    }

    fn insert_party(&self, party: PartyId) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO parties (party_id) VALUES (?1)",
                params![party.get()],
            )?;
            Ok(())
        })
    }

    fn insert_relationship(&self, edge: &RelationshipEdge) -> Result<()> {
        edge.validate_dates()?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO relationships (
                    party_a, party_b, permission_a_to_b, permission_b_to_a,
                    is_active, start_date, end_date
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    edge.party_a.get(),
                    edge.party_b.get(),
                    edge.permission_a_to_b,
                    edge.permission_b_to_a,
                    edge.is_active,
                    date_text(edge.start_date),
                    date_text(edge.end_date),
                ],
            )?;
            Ok(())
        })
    }

    fn party_for_user(&self, user: HostUserId) -> Result<Option<PartyId>> {
        self.with_conn(|conn| {
            let party: Option<i64> = conn
                .query_row(
                    "SELECT party_id FROM host_users WHERE user_id = ?1",
                    params![user.get()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(party.map(PartyId::new))
        })
    }

    fn map_user(&self, user: HostUserId, party: PartyId) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO host_users (user_id, party_id) VALUES (?1, ?2)
                 ON CONFLICT(user_id) DO UPDATE SET party_id = excluded.party_id",
                params![user.get(), party.get()],
            )?;
            Ok(())
        })
    }

    fn resolve_attribute(&self, attribute: &AttributeRef) -> Result<Option<AttributeDescriptor>> {
        self.with_conn(|conn| {
            let names: Option<(String, String)> = match attribute {
                AttributeRef::Id(field_id) => conn
                    .query_row(
                        "SELECT g.table_name, f.column_name
                         FROM attribute_fields f
                         INNER JOIN attribute_groups g ON g.id = f.group_id
                         WHERE f.id = ?1",
                        params![field_id],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?,
                AttributeRef::Name(title) => conn
                    .query_row(
                        "SELECT g.table_name, f.column_name
                         FROM attribute_groups g
                         INNER JOIN attribute_fields f ON f.group_id = g.id
                         WHERE g.title = ?1
                         ORDER BY f.id
                         LIMIT 1",
                        params![title],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?,
            };

            match names {
                Some((table, column)) => Ok(Some(AttributeDescriptor::new(table, column)?)),
                None => Ok(None),
            }
        })
    }

    fn register_attribute(&self, title: &str, descriptor: &AttributeDescriptor) -> Result<i64> {
        let table = descriptor.table_name().to_string();
        let column = descriptor.column_name().to_string();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let existing: Option<(i64, String)> = tx
                .query_row(
                    "SELECT id, table_name FROM attribute_groups WHERE title = ?1",
                    params![title],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let group_id = match existing {
                Some((id, existing_table)) if existing_table == table => id,
                Some((_, existing_table)) => {
                    return Err(StoreError::InvalidData(format!(
                        "attribute group {:?} already stores values in {}",
                        title, existing_table
                    )));
                }
                None => {
                    tx.execute(
                        "INSERT INTO attribute_groups (title, table_name) VALUES (?1, ?2)",
                        params![title, table],
                    )?;
                    tx.last_insert_rowid()
                }
            };

            tx.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {table} (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        {ENTITY_ID_COLUMN} INTEGER NOT NULL UNIQUE
                    )"
                ),
                [],
            )?;

            let has_column: bool = tx
                .prepare(&format!("PRAGMA table_info({table})"))?
                .query_map([], |row| row.get::<_, String>(1))?
                .collect::<rusqlite::Result<Vec<_>>>()?
                .iter()
                .any(|name| name == &column);
            if !has_column {
                tx.execute(&format!("ALTER TABLE {table} ADD COLUMN {column} INTEGER"), [])?;
            }

            tx.execute(
                "INSERT OR IGNORE INTO attribute_fields (group_id, column_name) VALUES (?1, ?2)",
                params![group_id, column],
            )?;
            let field_id: i64 = tx.query_row(
                "SELECT id FROM attribute_fields WHERE group_id = ?1 AND column_name = ?2",
                params![group_id, column],
                |row| row.get(0),
            )?;

            tx.commit()?;
            tracing::info!(title, table = %table, column = %column, field_id, "attribute registered");
            Ok(field_id)
        })
    }

    fn load_attribute_value(
        &self,
        descriptor: &AttributeDescriptor,
        entity: EntityId,
    ) -> Result<Option<i64>> {
        if !entity.is_valid() {
            return Ok(None);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {column} FROM {table} WHERE {ENTITY_ID_COLUMN} = ?1 LIMIT 1",
                column = descriptor.column_name(),
                table = descriptor.table_name(),
            );
            let value: Option<Option<i64>> = conn
                .query_row(&sql, params![entity.get()], |row| row.get(0))
                .optional()?;
            Ok(value.flatten().filter(|v| *v != 0))
        })
    }

    fn load_attribute_values(
        &self,
        descriptor: &AttributeDescriptor,
        entities: &BTreeSet<EntityId>,
    ) -> Result<BTreeMap<EntityId, i64>> {
        let ids: Vec<EntityId> = entities.iter().copied().filter(|e| e.is_valid()).collect();
        if ids.is_empty() {
            return Ok(BTreeMap::new());
        }

        self.with_conn(|conn| {
            let mut values = BTreeMap::new();

            for chunk in ids.chunks(MAX_BATCH) {
                let sql = format!(
                    "SELECT {ENTITY_ID_COLUMN}, {column} FROM {table}
                     WHERE {ENTITY_ID_COLUMN} IN ({ids})
                     ORDER BY id",
                    column = descriptor.column_name(),
                    table = descriptor.table_name(),
                    ids = placeholders(chunk.len(), 0),
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(chunk.iter().map(|e| e.get())), |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, Option<i64>>(1)?))
                })?;
                for row in rows {
                    if let (entity, Some(value)) = row? {
                        if value != 0 {
                            values.entry(EntityId::new(entity)).or_insert(value);
                        }
                    }
                }
            }

            Ok(values)
        })
    }

    fn load_all_attribute_values(
        &self,
        descriptor: &AttributeDescriptor,
    ) -> Result<BTreeMap<EntityId, i64>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {ENTITY_ID_COLUMN}, {column} FROM {table} ORDER BY id",
                column = descriptor.column_name(),
                table = descriptor.table_name(),
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, Option<i64>>(1)?))
            })?;

            let mut values = BTreeMap::new();
            for row in rows {
                if let (entity, Some(value)) = row? {
                    if value != 0 {
                        values.entry(EntityId::new(entity)).or_insert(value);
                    }
                }
            }
            Ok(values)
        })
    }

    fn upsert_attribute_value(
        &self,
        descriptor: &AttributeDescriptor,
        entity: EntityId,
        value: i64,
    ) -> Result<UpsertResult> {
        if value == 0 || !entity.is_valid() {
            return Ok(UpsertResult::Skipped);
        }

        let table = descriptor.table_name();
        let column = descriptor.column_name();

        self.with_conn_mut(|conn| {
            // Immediate: take the write lock before the existence check
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let exists = tx
                .query_row(
                    &format!("SELECT 1 FROM {table} WHERE {ENTITY_ID_COLUMN} = ?1 LIMIT 1"),
                    params![entity.get()],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();

            let result = if exists {
                tx.execute(
                    &format!("UPDATE {table} SET {column} = ?2 WHERE {ENTITY_ID_COLUMN} = ?1"),
                    params![entity.get(), value],
                )?;
                UpsertResult::Updated
            } else {
                tx.execute(
                    &format!("INSERT INTO {table} ({ENTITY_ID_COLUMN}, {column}) VALUES (?1, ?2)"),
                    params![entity.get(), value],
                )?;
                UpsertResult::Inserted
            };

            tx.commit()?;
            Ok(result)
        })
    }

    fn follow_hop(
        &self,
        hop: &ForeignKeyHop,
        ids: &BTreeSet<EntityId>,
    ) -> Result<BTreeMap<EntityId, EntityId>> {
        let keys: Vec<EntityId> = ids.iter().copied().filter(|e| e.is_valid()).collect();
        if keys.is_empty() {
            return Ok(BTreeMap::new());
        }

        self.with_conn(|conn| {
            let mut links = BTreeMap::new();

            for chunk in keys.chunks(MAX_BATCH) {
                let sql = format!(
                    "SELECT {key}, {value} FROM {table}
                     WHERE {key} IN ({ids}) AND {value} IS NOT NULL
                     ORDER BY {key}, {value}",
                    key = hop.key_column(),
                    value = hop.value_column(),
                    table = hop.table(),
                    ids = placeholders(chunk.len(), 0),
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(chunk.iter().map(|e| e.get())), |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
                })?;
                for row in rows {
                    let (key, value) = row?;
                    links
                        .entry(EntityId::new(key))
                        .or_insert(EntityId::new(value));
                }
            }

            Ok(links)
        })
    }

    fn insert_participant(
        &self,
        participant: EntityId,
        event: EntityId,
        party: PartyId,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO participants (id, event_id, party_id) VALUES (?1, ?2, ?3)",
                params![participant.get(), event.get(), party.get()],
            )?;
            Ok(())
        })
    }

    fn insert_participant_payment(
        &self,
        participant: EntityId,
        contribution: EntityId,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO participant_payments (participant_id, contribution_id) VALUES (?1, ?2)",
                params![participant.get(), contribution.get()],
            )?;
            Ok(())
        })
    }

    fn get_config(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT config_value FROM acl_config WHERE config_key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }

    fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO acl_config (config_key, config_value) VALUES (?1, ?2)
                 ON CONFLICT(config_key) DO UPDATE SET config_value = excluded.config_value",
                params![key, value],
            )?;
            Ok(())
        })
    }

    fn delete_config(&self, key: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let removed = conn.execute("DELETE FROM acl_config WHERE config_key = ?1", params![key])?;
            Ok(removed > 0)
        })
    }

    fn list_config(&self) -> Result<BTreeMap<String, String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT config_key, config_value FROM acl_config ORDER BY config_key")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<BTreeMap<String, String>>>()?;
            Ok(rows)
        })
    }
}
