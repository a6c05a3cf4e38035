//! Store trait: the abstract interface over the host's relational data.
//!
//! This trait keeps the permission engine storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use relacl_core::{
    AttributeDescriptor, AttributeRef, EntityId, ForeignKeyHop, HostUserId, PartyId,
    RelationshipEdge,
};

use crate::error::Result;

/// Result of writing an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertResult {
    /// A new row was created for the entity.
    Inserted,
    /// The entity's existing row was overwritten.
    Updated,
    /// Nothing was written: zero means "no value" and is never persisted.
    Skipped,
}

/// The Store trait: synchronous access to relationships, attributes and
/// configuration.
///
/// All calls happen inside one host request; there is no async runtime
/// and no cross-request state beyond what is persisted.
///
/// # Design Notes
///
/// - **Read-only graph**: relationships and parties belong to the host.
///   The seeding methods exist for installers and fixtures; the
///   permission engine never calls them.
/// - **Batching**: neighbor and link lookups take whole id sets so a BFS
///   round or a chain hop is one query, not one query per id.
/// - **Zero is absent**: attribute values of zero are neither written nor
///   reported.
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Relationship Graph
    // ─────────────────────────────────────────────────────────────────────────

    /// Check whether a party row exists.
    fn party_exists(&self, party: PartyId) -> Result<bool>;

    /// One BFS step: every party reachable from a member of `frontier`
    /// through an edge valid on `on` whose permission flag grants the
    /// direction leaving that member.
    ///
    /// Edges leaving a party without a party row are ignored.
    fn permitted_neighbors(
        &self,
        frontier: &BTreeSet<PartyId>,
        on: NaiveDate,
    ) -> Result<BTreeSet<PartyId>>;

    /// Create a party row. Idempotent.
    fn insert_party(&self, party: PartyId) -> Result<()>;

    /// Create a relationship row.
    fn insert_relationship(&self, edge: &RelationshipEdge) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Identity Mapping
    // ─────────────────────────────────────────────────────────────────────────

    /// Map a host user to the party representing them.
    fn party_for_user(&self, user: HostUserId) -> Result<Option<PartyId>>;

    /// Record (or replace) the party for a host user.
    fn map_user(&self, user: HostUserId, party: PartyId) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Attribute Storage
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve a logical attribute to its table and column.
    ///
    /// Returns `None` when the catalog has no such attribute.
    fn resolve_attribute(&self, attribute: &AttributeRef) -> Result<Option<AttributeDescriptor>>;

    /// Create the value table and catalog entries for an attribute.
    ///
    /// Returns the attribute's field id. Registering the same title and
    /// column twice returns the existing id.
    fn register_attribute(&self, title: &str, descriptor: &AttributeDescriptor) -> Result<i64>;

    /// Load one entity's value.
    fn load_attribute_value(
        &self,
        descriptor: &AttributeDescriptor,
        entity: EntityId,
    ) -> Result<Option<i64>>;

    /// Load values for the given entities. Entities without a value are
    /// absent from the map.
    fn load_attribute_values(
        &self,
        descriptor: &AttributeDescriptor,
        entities: &BTreeSet<EntityId>,
    ) -> Result<BTreeMap<EntityId, i64>>;

    /// Load every stored value of the attribute.
    fn load_all_attribute_values(
        &self,
        descriptor: &AttributeDescriptor,
    ) -> Result<BTreeMap<EntityId, i64>>;

    /// Insert or update the entity's value. One row per entity.
    fn upsert_attribute_value(
        &self,
        descriptor: &AttributeDescriptor,
        entity: EntityId,
        value: i64,
    ) -> Result<UpsertResult>;

    // ─────────────────────────────────────────────────────────────────────────
    // Link Tables
    // ─────────────────────────────────────────────────────────────────────────

    /// Follow one foreign-key hop for a batch of ids.
    ///
    /// Ids without a link row are absent from the result. When a key has
    /// several link rows the smallest target id wins.
    fn follow_hop(
        &self,
        hop: &ForeignKeyHop,
        ids: &BTreeSet<EntityId>,
    ) -> Result<BTreeMap<EntityId, EntityId>>;

    /// Create a participant row linking a party to an event.
    fn insert_participant(
        &self,
        participant: EntityId,
        event: EntityId,
        party: PartyId,
    ) -> Result<()>;

    /// Record that a contribution paid for a participant.
    fn insert_participant_payment(
        &self,
        participant: EntityId,
        contribution: EntityId,
    ) -> Result<()>;

    // ─────────────────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a configuration value.
    fn get_config(&self, key: &str) -> Result<Option<String>>;

    /// Create or overwrite a configuration value.
    fn set_config(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a configuration value. Returns whether a row was removed.
    fn delete_config(&self, key: &str) -> Result<bool>;

    /// Every configuration row, keyed by config key.
    fn list_config(&self) -> Result<BTreeMap<String, String>>;
}
