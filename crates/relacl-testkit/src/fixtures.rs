//! Test fixtures and helpers.
//!
//! A [`GraphFixture`] describes parties, relationships and event owners
//! once and seeds them into any [`Store`], so the same scenario can run
//! against both backends.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use relacl::{AclConfig, RelAcl, DEFAULT_OWNER_ATTRIBUTE_KEY};
use relacl_core::{AttributeDescriptor, AttributeRef, EntityId, PartyId, RelationshipEdge};
use relacl_store::{MemoryStore, Result, SqliteStore, Store};

/// Title the fixtures register the event owner attribute under.
pub const OWNER_TITLE: &str = "Event owner";

/// Storage location of the fixture owner attribute.
pub fn owner_descriptor() -> AttributeDescriptor {
    AttributeDescriptor::new("event_owner", "owner_party")
        .unwrap_or_else(|e| panic!("fixture descriptor is invalid: {}", e))
}

/// A reusable graph scenario.
#[derive(Debug, Clone, Default)]
pub struct GraphFixture {
    pub parties: BTreeSet<PartyId>,
    pub edges: Vec<RelationshipEdge>,
    pub owners: Vec<(EntityId, PartyId)>,
}

impl GraphFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add parties.
    pub fn parties(mut self, ids: impl IntoIterator<Item = i64>) -> Self {
        self.parties.extend(ids.into_iter().map(PartyId::new));
        self
    }

    /// Add an edge. Its endpoints are not added as parties.
    pub fn edge(mut self, edge: RelationshipEdge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Record `owner` as owner of `event`.
    pub fn owner(mut self, event: i64, owner: i64) -> Self {
        self.owners.push((EntityId::new(event), PartyId::new(owner)));
        self
    }

    /// Write the scenario into `store`, registering the owner attribute and
    /// pointing the owner config key at it.
    pub fn seed_into<S: Store + ?Sized>(&self, store: &S) -> Result<()> {
        for party in &self.parties {
            store.insert_party(*party)?;
        }
        for edge in &self.edges {
            store.insert_relationship(edge)?;
        }

        let descriptor = owner_descriptor();
        store.register_attribute(OWNER_TITLE, &descriptor)?;
        store.set_config(DEFAULT_OWNER_ATTRIBUTE_KEY, OWNER_TITLE)?;
        for (event, owner) in &self.owners {
            store.upsert_attribute_value(&descriptor, *event, owner.get())?;
        }
        Ok(())
    }

    pub fn memory_store(&self) -> Result<MemoryStore> {
        let store = MemoryStore::new();
        self.seed_into(&store)?;
        Ok(store)
    }

    pub fn sqlite_store(&self) -> Result<SqliteStore> {
        let store = SqliteStore::open_memory()?;
        self.seed_into(&store)?;
        Ok(store)
    }

    /// A facade over a seeded in-memory store.
    pub fn acl(&self, config: AclConfig) -> Result<RelAcl<MemoryStore>> {
        Ok(RelAcl::new(self.memory_store()?, config))
    }

    /// The fixture owner attribute reference.
    pub fn owner_attribute() -> AttributeRef {
        AttributeRef::name(OWNER_TITLE)
    }
}

/// A grants B; C's edge to B grants B to C. Seed 1 reaches {2, 3} only by
/// expanding twice. Event 42 is unowned.
pub fn two_hop_fixture() -> GraphFixture {
    GraphFixture::new()
        .parties([1, 2, 3, 4])
        .edge(RelationshipEdge::new(PartyId::new(1), PartyId::new(2)).permit_a_to_b())
        .edge(RelationshipEdge::new(PartyId::new(3), PartyId::new(2)).permit_b_to_a())
        .owner(10, 2)
        .owner(20, 3)
        .owner(30, 4)
}

/// Closure computed the slow way: re-scan every edge from every member
/// until nothing changes. Used as an oracle in property tests.
pub fn naive_closure(
    parties: &BTreeSet<PartyId>,
    edges: &[RelationshipEdge],
    seed: PartyId,
    on: NaiveDate,
    include_seed: bool,
) -> BTreeSet<PartyId> {
    if !parties.contains(&seed) {
        return BTreeSet::new();
    }

    let mut members = BTreeSet::new();
    let mut sources = BTreeSet::from([seed]);
    loop {
        let mut grew = false;
        for edge in edges {
            for from in &sources {
                if !parties.contains(from) {
                    continue;
                }
                if let Some(to) = edge.neighbor_of(*from, on) {
                    grew |= members.insert(to);
                }
            }
        }
        if !grew {
            break;
        }
        sources = members.clone();
        sources.insert(seed);
    }

    if include_seed {
        members.insert(seed);
    } else {
        members.remove(&seed);
    }
    members
}
