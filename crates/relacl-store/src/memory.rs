//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.
//!
//! The participant and payment link tables exist from the start. Any other
//! table a custom [`ForeignKeyHop`] reads must first receive rows through
//! [`MemoryStore::insert_link_row`]; following a hop into a table that
//! never got a row is `NotFound`, just as SQLite fails on a missing table.
//! Dates outside years 0000 through 9999 are rejected like in SQLite.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::NaiveDate;

use relacl_core::{
    validate_identifier, validate_storable_date, AttributeDescriptor, AttributeRef, EntityId,
    ForeignKeyHop, HostUserId, PartyId, RelationshipEdge,
};

use crate::error::{Result, StoreError};
use crate::schema::{PARTICIPANTS, PARTICIPANT_PAYMENTS};
use crate::traits::{Store, UpsertResult};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    parties: BTreeSet<PartyId>,

    relationships: Vec<RelationshipEdge>,

    users: HashMap<HostUserId, PartyId>,

    /// Attribute groups: id -> (title, table).
    groups: BTreeMap<i64, (String, String)>,

    /// Attribute fields: id -> (group id, column).
    fields: BTreeMap<i64, (i64, String)>,

    /// Attribute values keyed by (table, column), then entity.
    values: HashMap<(String, String), BTreeMap<EntityId, i64>>,

    /// Link tables: table -> rows of column -> value.
    links: HashMap<String, Vec<BTreeMap<String, i64>>>,

    config: BTreeMap<String, String>,

    next_id: i64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        let mut links = HashMap::new();
        links.insert(PARTICIPANTS.to_string(), Vec::new());
        links.insert(PARTICIPANT_PAYMENTS.to_string(), Vec::new());

        Self {
            inner: RwLock::new(MemoryStoreInner {
                parties: BTreeSet::new(),
                relationships: Vec::new(),
                users: HashMap::new(),
                groups: BTreeMap::new(),
                fields: BTreeMap::new(),
                values: HashMap::new(),
                links,
                config: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Append one row to the link table `table`, creating the table if needed.
    ///
    /// Lets tests and embedders back custom owner hops without SQLite.
    pub fn insert_link_row(&self, table: &str, row: &[(&str, i64)]) -> Result<()> {
        validate_identifier(table)?;
        let mut columns = BTreeMap::new();
        for (column, value) in row {
            validate_identifier(column)?;
            columns.insert(column.to_string(), *value);
        }

        self.write()?
            .links
            .entry(table.to_string())
            .or_default()
            .push(columns);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreInner {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn value_key(descriptor: &AttributeDescriptor) -> (String, String) {
        (
            descriptor.table_name().to_string(),
            descriptor.column_name().to_string(),
        )
    }
}

impl Store for MemoryStore {
    fn party_exists(&self, party: PartyId) -> Result<bool> {
        Ok(self.read()?.parties.contains(&party))
    }

    fn permitted_neighbors(
        &self,
        frontier: &BTreeSet<PartyId>,
        on: NaiveDate,
    ) -> Result<BTreeSet<PartyId>> {
        let on = validate_storable_date(on)?;
        let inner = self.read()?;
        let mut found = BTreeSet::new();

        let leaves = |party: &PartyId| frontier.contains(party) && inner.parties.contains(party);
        for edge in inner.relationships.iter().filter(|e| e.is_valid_on(on)) {
            // Only the direction leaving a frontier member counts
            if edge.permission_a_to_b && leaves(&edge.party_a) {
                found.insert(edge.party_b);
            }
            if edge.permission_b_to_a && leaves(&edge.party_b) {
                found.insert(edge.party_a);
            }
        }

        Ok(found)
    }

    fn insert_party(&self, party: PartyId) -> Result<()> {
        self.write()?.parties.insert(party);
        Ok(())
    }

    fn insert_relationship(&self, edge: &RelationshipEdge) -> Result<()> {
        edge.validate_dates()?;
        self.write()?.relationships.push(edge.clone());
        Ok(())
    }

    fn party_for_user(&self, user: HostUserId) -> Result<Option<PartyId>> {
        Ok(self.read()?.users.get(&user).copied())
    }

    fn map_user(&self, user: HostUserId, party: PartyId) -> Result<()> {
        self.write()?.users.insert(user, party);
        Ok(())
    }

    fn resolve_attribute(&self, attribute: &AttributeRef) -> Result<Option<AttributeDescriptor>> {
        let inner = self.read()?;

        let names = match attribute {
            AttributeRef::Id(field_id) => inner.fields.get(field_id).and_then(|(group_id, column)| {
                inner
                    .groups
                    .get(group_id)
                    .map(|(_, table)| (table.clone(), column.clone()))
            }),
            AttributeRef::Name(title) => inner
                .groups
                .iter()
                .find(|(_, (group_title, _))| group_title == title)
                .and_then(|(group_id, (_, table))| {
                    inner
                        .fields
                        .values()
                        .find(|(g, _)| g == group_id)
                        .map(|(_, column)| (table.clone(), column.clone()))
                }),
        };

        match names {
            Some((table, column)) => Ok(Some(AttributeDescriptor::new(table, column)?)),
            None => Ok(None),
        }
    }

    fn register_attribute(&self, title: &str, descriptor: &AttributeDescriptor) -> Result<i64> {
        let mut inner = self.write()?;
        let table = descriptor.table_name();
        let column = descriptor.column_name();

        let existing = inner
            .groups
            .iter()
            .find(|(_, (group_title, _))| group_title == title)
            .map(|(id, (_, group_table))| (*id, group_table.clone()));

        let group_id = match existing {
            Some((id, group_table)) if group_table == table => id,
            Some((_, group_table)) => {
                return Err(StoreError::InvalidData(format!(
                    "attribute group {:?} already stores values in {}",
                    title, group_table
                )));
            }
            None => {
                let id = inner.allocate_id();
                inner.groups.insert(id, (title.to_string(), table.to_string()));
                id
            }
        };

        let existing_field = inner
            .fields
            .iter()
            .find(|(_, (g, c))| *g == group_id && c == column)
            .map(|(id, _)| *id);

        let field_id = match existing_field {
            Some(id) => id,
            None => {
                let id = inner.allocate_id();
                inner.fields.insert(id, (group_id, column.to_string()));
                id
            }
        };

        inner
            .values
            .entry(MemoryStoreInner::value_key(descriptor))
            .or_default();
        Ok(field_id)
    }

    fn load_attribute_value(
        &self,
        descriptor: &AttributeDescriptor,
        entity: EntityId,
    ) -> Result<Option<i64>> {
        if !entity.is_valid() {
            return Ok(None);
        }
        let inner = self.read()?;
        Ok(inner
            .values
            .get(&MemoryStoreInner::value_key(descriptor))
            .and_then(|values| values.get(&entity).copied()))
    }

    fn load_attribute_values(
        &self,
        descriptor: &AttributeDescriptor,
        entities: &BTreeSet<EntityId>,
    ) -> Result<BTreeMap<EntityId, i64>> {
        let inner = self.read()?;
        let Some(values) = inner.values.get(&MemoryStoreInner::value_key(descriptor)) else {
            return Err(StoreError::NotFound(descriptor.table_name().to_string()));
        };
        Ok(entities
            .iter()
            .filter_map(|e| values.get(e).map(|v| (*e, *v)))
            .collect())
    }

    fn load_all_attribute_values(
        &self,
        descriptor: &AttributeDescriptor,
    ) -> Result<BTreeMap<EntityId, i64>> {
        let inner = self.read()?;
        inner
            .values
            .get(&MemoryStoreInner::value_key(descriptor))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(descriptor.table_name().to_string()))
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

        let mut inner = self.write()?;
        let Some(values) = inner.values.get_mut(&MemoryStoreInner::value_key(descriptor)) else {
            return Err(StoreError::NotFound(descriptor.table_name().to_string()));
        };

        match values.insert(entity, value) {
            Some(_) => Ok(UpsertResult::Updated),
            None => Ok(UpsertResult::Inserted),
        }
    }

    fn follow_hop(
        &self,
        hop: &ForeignKeyHop,
        ids: &BTreeSet<EntityId>,
    ) -> Result<BTreeMap<EntityId, EntityId>> {
        let inner = self.read()?;
        let rows = inner
            .links
            .get(hop.table())
            .ok_or_else(|| StoreError::NotFound(hop.table().to_string()))?;

        let mut links: BTreeMap<EntityId, EntityId> = BTreeMap::new();
        for row in rows {
            let (Some(key), Some(value)) = (row.get(hop.key_column()), row.get(hop.value_column()))
            else {
                continue;
            };
            let key = EntityId::new(*key);
            if !ids.contains(&key) {
                continue;
            }
            let value = EntityId::new(*value);
            links
                .entry(key)
                .and_modify(|current| *current = (*current).min(value))
                .or_insert(value);
        }

        Ok(links)
    }

    fn insert_participant(
        &self,
        participant: EntityId,
        event: EntityId,
        party: PartyId,
    ) -> Result<()> {
        let row = BTreeMap::from([
            ("id".to_string(), participant.get()),
            ("event_id".to_string(), event.get()),
            ("party_id".to_string(), party.get()),
        ]);
        self.write()?
            .links
            .entry(PARTICIPANTS.to_string())
            .or_default()
            .push(row);
        Ok(())
    }

    fn insert_participant_payment(
        &self,
        participant: EntityId,
        contribution: EntityId,
    ) -> Result<()> {
        let mut inner = self.write()?;
        let id = inner.allocate_id();
        let row = BTreeMap::from([
            ("id".to_string(), id),
            ("participant_id".to_string(), participant.get()),
            ("contribution_id".to_string(), contribution.get()),
        ]);
        inner
            .links
            .entry(PARTICIPANT_PAYMENTS.to_string())
            .or_default()
            .push(row);
        Ok(())
    }

    fn get_config(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read()?.config.get(key).cloned())
    }

    fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.write()?
            .config
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_config(&self, key: &str) -> Result<bool> {
        Ok(self.write()?.config.remove(key).is_some())
    }

    fn list_config(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.read()?.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_neighbors_match_sqlite_rules() {
        let store = MemoryStore::new();
        for id in [1, 2, 3] {
            store.insert_party(PartyId::new(id)).unwrap();
        }
        store
            .insert_relationship(&RelationshipEdge::new(PartyId::new(1), PartyId::new(2)).permit_a_to_b())
            .unwrap();
        store
            .insert_relationship(&RelationshipEdge::new(PartyId::new(3), PartyId::new(2)).permit_b_to_a())
            .unwrap();
        store
            .insert_relationship(
                &RelationshipEdge::new(PartyId::new(1), PartyId::new(3))
                    .permit_a_to_b()
                    .inactive(),
            )
            .unwrap();

        let from_one = store
            .permitted_neighbors(&BTreeSet::from([PartyId::new(1)]), today())
            .unwrap();
        assert_eq!(from_one, BTreeSet::from([PartyId::new(2)]));

        let from_two = store
            .permitted_neighbors(&BTreeSet::from([PartyId::new(2)]), today())
            .unwrap();
        assert_eq!(from_two, BTreeSet::from([PartyId::new(3)]));
    }

    #[test]
    fn test_unregistered_attribute_table_is_not_found() {
        let store = MemoryStore::new();
        let descriptor = AttributeDescriptor::new("value_missing", "owner").unwrap();
        assert!(matches!(
            store.load_all_attribute_values(&descriptor),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_upsert_and_resolve() {
        let store = MemoryStore::new();
        let descriptor = AttributeDescriptor::new("value_event_owner", "owner_party").unwrap();
        let field_id = store.register_attribute("Event owner", &descriptor).unwrap();

        assert_eq!(
            store.resolve_attribute(&AttributeRef::Id(field_id)).unwrap(),
            Some(descriptor.clone())
        );

        let event = EntityId::new(1);
        assert_eq!(
            store.upsert_attribute_value(&descriptor, event, 0).unwrap(),
            UpsertResult::Skipped
        );
        assert_eq!(store.load_attribute_value(&descriptor, event).unwrap(), None);
        assert_eq!(
            store.upsert_attribute_value(&descriptor, event, 5).unwrap(),
            UpsertResult::Inserted
        );
        assert_eq!(
            store.upsert_attribute_value(&descriptor, event, 6).unwrap(),
            UpsertResult::Updated
        );
        assert_eq!(store.load_attribute_value(&descriptor, event).unwrap(), Some(6));
    }

    #[test]
    fn test_follow_hop_takes_smallest_target() {
        let store = MemoryStore::new();
        store
            .insert_participant_payment(EntityId::new(8), EntityId::new(50))
            .unwrap();
        store
            .insert_participant_payment(EntityId::new(3), EntityId::new(50))
            .unwrap();

        let hop = ForeignKeyHop::new(PARTICIPANT_PAYMENTS, "contribution_id", "participant_id").unwrap();
        let links = store.follow_hop(&hop, &BTreeSet::from([EntityId::new(50)])).unwrap();
        assert_eq!(links, BTreeMap::from([(EntityId::new(50), EntityId::new(3))]));
    }

    #[test]
    fn test_custom_link_table() {
        let store = MemoryStore::new();
        let hop = ForeignKeyHop::new("event_sponsors", "sponsor_id", "event_id").unwrap();
        let ids = BTreeSet::from([EntityId::new(7), EntityId::new(8)]);

        assert!(matches!(store.follow_hop(&hop, &ids), Err(StoreError::NotFound(_))));

        store
            .insert_link_row("event_sponsors", &[("sponsor_id", 7), ("event_id", 40)])
            .unwrap();
        store
            .insert_link_row("event_sponsors", &[("sponsor_id", 9), ("event_id", 41)])
            .unwrap();

        let links = store.follow_hop(&hop, &ids).unwrap();
        assert_eq!(links, BTreeMap::from([(EntityId::new(7), EntityId::new(40))]));

        assert!(matches!(
            store.insert_link_row("event sponsors", &[("sponsor_id", 1)]),
            Err(StoreError::Core(_))
        ));
        assert!(store
            .insert_link_row("event_sponsors", &[("sponsor-id", 1)])
            .is_err());
    }

    #[test]
    fn test_dates_beyond_year_9999_are_rejected() {
        let store = MemoryStore::new();
        let far = NaiveDate::from_ymd_opt(10000, 1, 1).unwrap();
        let edge = RelationshipEdge::new(PartyId::new(1), PartyId::new(2))
            .permit_a_to_b()
            .between(Some(far), None);

        assert!(matches!(
            store.insert_relationship(&edge),
            Err(StoreError::Core(relacl_core::CoreError::InvalidDate { .. }))
        ));
        assert!(store
            .permitted_neighbors(&BTreeSet::from([PartyId::new(1)]), far)
            .is_err());
    }
}
