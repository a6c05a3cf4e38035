//! Ownership filtering against a permission closure.
//!
//! Resources whose owner cannot be determined stay visible. A missing row
//! anywhere along an owner chain is treated the same as a missing owner
//! attribute. Only an owner attribute the catalog cannot resolve at all is
//! an error.

use std::collections::{BTreeMap, BTreeSet};

use relacl_core::{EntityId, PartyId};
use relacl_store::{AttributeStore, Store};

use crate::chain::OwnerChain;
use crate::error::{PermsError, Result};
use crate::resolver::PermissionClosure;

/// Filters resources down to those owned by members of a closure.
pub struct OwnershipFilter<'a, S: Store + ?Sized> {
    store: &'a S,
    closure: &'a PermissionClosure,
}

impl<'a, S: Store + ?Sized> OwnershipFilter<'a, S> {
    pub fn new(store: &'a S, closure: &'a PermissionClosure) -> Self {
        Self { store, closure }
    }

    pub fn closure(&self) -> &PermissionClosure {
        self.closure
    }

    /// Resolve the owner of each id in `ids` by following `chain`.
    ///
    /// Every hop is one batched lookup. Ids whose chain breaks, or whose
    /// final entity has no owner value, are absent from the result.
    pub fn owners_of(
        &self,
        chain: &OwnerChain,
        ids: &BTreeSet<EntityId>,
    ) -> Result<BTreeMap<EntityId, PartyId>> {
        // Resolve the attribute first so a missing mapping fails even for
        // an empty batch.
        let attribute = AttributeStore::open(self.store, chain.attribute().clone())?;

        let mut reached: BTreeMap<EntityId, EntityId> = ids
            .iter()
            .filter(|id| id.is_valid())
            .map(|id| (*id, *id))
            .collect();

        for hop in chain.hops() {
            if reached.is_empty() {
                break;
            }
            let keys: BTreeSet<EntityId> = reached.values().copied().collect();
            let links = self.store.follow_hop(hop, &keys)?;
            reached = reached
                .into_iter()
                .filter_map(|(origin, at)| links.get(&at).map(|next| (origin, *next)))
                .collect();
            tracing::trace!(table = hop.table(), remaining = reached.len(), "owner hop");
        }

        let targets: BTreeSet<EntityId> = reached.values().copied().collect();
        let values = attribute.get_many(&targets)?;

        Ok(reached
            .into_iter()
            .filter_map(|(origin, target)| {
                values
                    .get(&target)
                    .map(|owner| (origin, PartyId::new(*owner)))
            })
            .collect())
    }

    /// Keep the rows whose owner is in the closure or unknown, in order.
    pub fn filter<T>(
        &self,
        chain: &OwnerChain,
        rows: Vec<(EntityId, T)>,
    ) -> Result<Vec<(EntityId, T)>> {
        let ids: BTreeSet<EntityId> = rows.iter().map(|(id, _)| *id).collect();
        let owners = self.owners_of(chain, &ids)?;

        let before = rows.len();
        let kept: Vec<(EntityId, T)> = rows
            .into_iter()
            .filter(|(id, _)| self.permits(owners.get(id).copied()))
            .collect();

        tracing::debug!(before, after = kept.len(), "rows filtered by ownership");
        Ok(kept)
    }

    /// In-place variant of [`filter`](Self::filter) for keyed collections.
    pub fn retain<T>(&self, chain: &OwnerChain, rows: &mut BTreeMap<EntityId, T>) -> Result<()> {
        let ids: BTreeSet<EntityId> = rows.keys().copied().collect();
        let owners = self.owners_of(chain, &ids)?;
        rows.retain(|id, _| self.permits(owners.get(id).copied()));
        Ok(())
    }

    /// Whether the closure may act on one resource.
    pub fn is_allowed(&self, chain: &OwnerChain, resource: EntityId) -> Result<bool> {
        let owners = self.owners_of(chain, &BTreeSet::from([resource]))?;
        Ok(self.permits(owners.get(&resource).copied()))
    }

    /// Like [`is_allowed`](Self::is_allowed), but a refusal is an
    /// [`PermsError::AccessDenied`] naming the owner.
    pub fn ensure_allowed(&self, chain: &OwnerChain, resource: EntityId) -> Result<()> {
        let owners = self.owners_of(chain, &BTreeSet::from([resource]))?;
        match owners.get(&resource) {
            Some(owner) if !self.closure.contains(*owner) => {
                Err(PermsError::AccessDenied {
                    resource,
                    owner: *owner,
                })
            }
            _ => Ok(()),
        }
    }

    /// Keep rows that name a party directly, when that party is in the
    /// closure.
    ///
    /// Unlike owner chains this is strict: a row always names its party,
    /// so there is nothing to fail open on.
    pub fn retain_parties<T>(&self, rows: &mut Vec<T>, party_of: impl Fn(&T) -> PartyId) {
        rows.retain(|row| self.closure.contains(party_of(row)));
    }

    fn permits(&self, owner: Option<PartyId>) -> bool {
        owner.map_or(true, |owner| self.closure.contains(owner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use relacl_core::{AttributeDescriptor, AttributeRef, RelationshipEdge};
    use relacl_store::{MemoryStore, SqliteStore};

    use crate::resolver::RelationshipGraphResolver;

    const OWNER: &str = "Event owner";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn e(id: i64) -> EntityId {
        EntityId::new(id)
    }

    fn p(id: i64) -> PartyId {
        PartyId::new(id)
    }

    /// Party 1 may edit party 2; party 3 is unrelated.
    /// Event 10 is owned by 2, event 20 by 3, event 42 has no owner.
    fn seeded<S: Store>(store: S) -> S {
        for id in [1, 2, 3] {
            store.insert_party(p(id)).unwrap();
        }
        store
            .insert_relationship(&RelationshipEdge::new(p(1), p(2)).permit_a_to_b())
            .unwrap();

        let descriptor = AttributeDescriptor::new("event_owner", "owner_party").unwrap();
        store.register_attribute(OWNER, &descriptor).unwrap();
        store.upsert_attribute_value(&descriptor, e(10), 2).unwrap();
        store.upsert_attribute_value(&descriptor, e(20), 3).unwrap();
        store
    }

    fn closure_of<S: Store>(store: &S, seed: i64) -> PermissionClosure {
        RelationshipGraphResolver::new(store)
            .resolve(p(seed), today())
            .unwrap()
    }

    fn events() -> OwnerChain {
        OwnerChain::direct(AttributeRef::name(OWNER))
    }

    #[test]
    fn test_filter_keeps_owned_and_unowned() {
        let store = seeded(MemoryStore::new());
        let closure = closure_of(&store, 1);
        let filter = OwnershipFilter::new(&store, &closure);

        let rows = vec![(e(42), "unowned"), (e(20), "other"), (e(10), "mine")];
        let kept = filter.filter(&events(), rows).unwrap();

        // Original order survives
        assert_eq!(kept, vec![(e(42), "unowned"), (e(10), "mine")]);
    }

    #[test]
    fn test_unowned_visible_to_anyone() {
        let store = seeded(SqliteStore::open_memory().unwrap());
        for caller in [1, 2, 3, 99] {
            let closure = closure_of(&store, caller);
            let filter = OwnershipFilter::new(&store, &closure);
            assert!(filter.is_allowed(&events(), e(42)).unwrap());
        }
    }

    #[test]
    fn test_ensure_allowed_names_owner() {
        let store = seeded(MemoryStore::new());
        let closure = closure_of(&store, 1);
        let filter = OwnershipFilter::new(&store, &closure);

        filter.ensure_allowed(&events(), e(10)).unwrap();
        match filter.ensure_allowed(&events(), e(20)) {
            Err(PermsError::AccessDenied { resource, owner }) => {
                assert_eq!(resource, e(20));
                assert_eq!(owner, p(3));
            }
            other => panic!("expected AccessDenied, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_attribute_is_configuration_error() {
        let store = seeded(MemoryStore::new());
        let closure = closure_of(&store, 1);
        let filter = OwnershipFilter::new(&store, &closure);

        let chain = OwnerChain::direct(AttributeRef::name("Nobody registered this"));
        let err = filter.filter(&chain, Vec::<(EntityId, ())>::new()).unwrap_err();
        assert!(matches!(err, PermsError::ConfigurationMissing(_)));
    }

    #[test]
    fn test_contribution_chain_resolves_in_batch() {
        let store = seeded(SqliteStore::open_memory().unwrap());
        // participant 100 at event 10 (owner 2), participant 200 at event 20 (owner 3)
        store.insert_participant(e(100), e(10), p(2)).unwrap();
        store.insert_participant(e(200), e(20), p(3)).unwrap();
        store.insert_participant_payment(e(100), e(1000)).unwrap();
        store.insert_participant_payment(e(200), e(2000)).unwrap();

        let closure = closure_of(&store, 1);
        let filter = OwnershipFilter::new(&store, &closure);
        let chain = OwnerChain::via_contribution(AttributeRef::name(OWNER));

        let owners = filter
            .owners_of(&chain, &BTreeSet::from([e(1000), e(2000), e(3000)]))
            .unwrap();
        assert_eq!(owners, BTreeMap::from([(e(1000), p(2)), (e(2000), p(3))]));

        // 3000 has no payment row: chain broken, kept
        let mut rows = BTreeMap::from([(e(1000), ()), (e(2000), ()), (e(3000), ())]);
        filter.retain(&chain, &mut rows).unwrap();
        assert_eq!(rows.keys().copied().collect::<Vec<_>>(), vec![e(1000), e(3000)]);
    }

    #[test]
    fn test_participant_chain() {
        let store = seeded(MemoryStore::new());
        store.insert_participant(e(100), e(10), p(2)).unwrap();
        store.insert_participant(e(200), e(20), p(3)).unwrap();

        let closure = closure_of(&store, 1);
        let filter = OwnershipFilter::new(&store, &closure);
        let chain = OwnerChain::via_participant(AttributeRef::name(OWNER));

        assert!(filter.is_allowed(&chain, e(100)).unwrap());
        assert!(!filter.is_allowed(&chain, e(200)).unwrap());
    }

    #[test]
    fn test_retain_parties_is_strict() {
        let store = seeded(MemoryStore::new());
        let closure = closure_of(&store, 1);
        let filter = OwnershipFilter::new(&store, &closure);

        let mut rows = vec![(p(1), "self"), (p(2), "granted"), (p(3), "stranger")];
        filter.retain_parties(&mut rows, |row| row.0);
        assert_eq!(rows, vec![(p(1), "self"), (p(2), "granted")]);
    }

    #[test]
    fn test_empty_closure_keeps_only_unowned() {
        let store = seeded(MemoryStore::new());
        let closure = PermissionClosure::empty(None, today());
        let filter = OwnershipFilter::new(&store, &closure);

        let kept = filter
            .filter(&events(), vec![(e(10), ()), (e(20), ()), (e(42), ())])
            .unwrap();
        assert_eq!(kept, vec![(e(42), ())]);
    }
}
