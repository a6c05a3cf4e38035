//! Permission closure over the relationship graph.
//!
//! Starting from a seed party, the resolver repeatedly asks the store for
//! parties reachable through permissioned, currently valid edges until a
//! round discovers nobody new. The result is every party the seed may
//! edit, directly or transitively.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use relacl_core::PartyId;
use relacl_store::Store;

use crate::error::Result;

/// The set of parties a seed party may edit, as of one date.
///
/// Lives for one request at most; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionClosure {
    seed: Option<PartyId>,
    evaluated_on: NaiveDate,
    members: BTreeSet<PartyId>,
    rounds: usize,
}

impl PermissionClosure {
    /// A closure that grants nothing, for callers without a party.
    pub fn empty(seed: Option<PartyId>, evaluated_on: NaiveDate) -> Self {
        Self {
            seed,
            evaluated_on,
            members: BTreeSet::new(),
            rounds: 0,
        }
    }

    pub fn seed(&self) -> Option<PartyId> {
        self.seed
    }

    /// The date every edge was checked against.
    pub fn evaluated_on(&self) -> NaiveDate {
        self.evaluated_on
    }

    /// Store round trips used, including the final round that found nothing.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn contains(&self, party: PartyId) -> bool {
        self.members.contains(&party)
    }

    pub fn members(&self) -> &BTreeSet<PartyId> {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = PartyId> + '_ {
        self.members.iter().copied()
    }
}

/// Breadth-first resolver over a [`Store`]'s relationship graph.
pub struct RelationshipGraphResolver<'s, S: Store + ?Sized> {
    store: &'s S,
    include_seed: bool,
}

impl<'s, S: Store + ?Sized> RelationshipGraphResolver<'s, S> {
    /// Create a resolver that includes the seed in its own closure.
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            include_seed: true,
        }
    }

    /// Choose whether the seed belongs to its own closure.
    ///
    /// Applied after the fixed point, so a cycle leading back to the seed
    /// does not change the answer.
    pub fn include_seed(mut self, include: bool) -> Self {
        self.include_seed = include;
        self
    }

    /// Compute the closure of `seed` with every edge evaluated on `on`.
    ///
    /// An unknown or invalid seed yields an empty closure, not an error.
    pub fn resolve(&self, seed: PartyId, on: NaiveDate) -> Result<PermissionClosure> {
        if !seed.is_valid() || !self.store.party_exists(seed)? {
            tracing::debug!(%seed, "seed party unknown, closure is empty");
            return Ok(PermissionClosure::empty(Some(seed), on));
        }

        // Seed round: direct grants
        let mut members = self.store.permitted_neighbors(&BTreeSet::from([seed]), on)?;
        let mut frontier = members.clone();
        let mut rounds = 1;

        // Expansion rounds. Parties found in earlier rounds were already
        // expanded, so only the newest ones need querying.
        while !frontier.is_empty() {
            let discovered = self.store.permitted_neighbors(&frontier, on)?;
            rounds += 1;

            let fresh: BTreeSet<PartyId> = discovered.difference(&members).copied().collect();
            tracing::debug!(
                %seed,
                round = rounds,
                discovered = discovered.len(),
                fresh = fresh.len(),
                "expansion round"
            );

            members.extend(fresh.iter().copied());
            frontier = fresh;
        }

        if self.include_seed {
            members.insert(seed);
        } else {
            members.remove(&seed);
        }

        tracing::debug!(%seed, %on, size = members.len(), rounds, "closure resolved");

        Ok(PermissionClosure {
            seed: Some(seed),
            evaluated_on: on,
            members,
            rounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use relacl_core::RelationshipEdge;
    use relacl_store::{MemoryStore, SqliteStore};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn p(id: i64) -> PartyId {
        PartyId::new(id)
    }

    fn with_parties<S: Store>(store: S, ids: &[i64]) -> S {
        for id in ids {
            store.insert_party(p(*id)).unwrap();
        }
        store
    }

    fn set(ids: &[i64]) -> BTreeSet<PartyId> {
        ids.iter().map(|i| p(*i)).collect()
    }

    #[test]
    fn test_two_round_closure_follows_reverse_grant() {
        // A may edit B; C's edge to B grants B->C
        let store = with_parties(MemoryStore::new(), &[1, 2, 3]);
        store
            .insert_relationship(&RelationshipEdge::new(p(1), p(2)).permit_a_to_b())
            .unwrap();
        store
            .insert_relationship(&RelationshipEdge::new(p(3), p(2)).permit_b_to_a())
            .unwrap();

        let closure = RelationshipGraphResolver::new(&store)
            .include_seed(false)
            .resolve(p(1), date(2024, 6, 1))
            .unwrap();

        assert_eq!(closure.members(), &set(&[2, 3]));
        // seed round, round finding C, round finding nothing
        assert_eq!(closure.rounds(), 3);
    }

    #[test]
    fn test_seed_policy() {
        let store = with_parties(MemoryStore::new(), &[1, 2]);
        store
            .insert_relationship(&RelationshipEdge::new(p(1), p(2)).permit_a_to_b().permit_b_to_a())
            .unwrap();
        let today = date(2024, 6, 1);

        let included = RelationshipGraphResolver::new(&store).resolve(p(1), today).unwrap();
        assert_eq!(included.members(), &set(&[1, 2]));

        // The 2->1 grant leads back to the seed; the policy still wins
        let excluded = RelationshipGraphResolver::new(&store)
            .include_seed(false)
            .resolve(p(1), today)
            .unwrap();
        assert_eq!(excluded.members(), &set(&[2]));
    }

    #[test]
    fn test_unknown_seed_is_empty() {
        let store = with_parties(MemoryStore::new(), &[2]);
        store
            .insert_relationship(&RelationshipEdge::new(p(1), p(2)).permit_a_to_b())
            .unwrap();

        let closure = RelationshipGraphResolver::new(&store)
            .resolve(p(1), date(2024, 6, 1))
            .unwrap();
        assert!(closure.is_empty());
        assert_eq!(closure.rounds(), 0);

        let closure = RelationshipGraphResolver::new(&store)
            .resolve(p(0), date(2024, 6, 1))
            .unwrap();
        assert!(closure.is_empty());
    }

    #[test]
    fn test_expired_edge_excluded_today() {
        let store = with_parties(SqliteStore::open_memory().unwrap(), &[1, 2]);
        let yesterday = date(2024, 6, 1);
        let today = date(2024, 6, 2);
        store
            .insert_relationship(
                &RelationshipEdge::new(p(1), p(2))
                    .permit_a_to_b()
                    .between(Some(yesterday), Some(yesterday)),
            )
            .unwrap();

        let resolver = RelationshipGraphResolver::new(&store).include_seed(false);
        assert_eq!(resolver.resolve(p(1), yesterday).unwrap().members(), &set(&[2]));
        assert!(resolver.resolve(p(1), today).unwrap().is_empty());
    }

    #[test]
    fn test_cycles_terminate() {
        let store = with_parties(SqliteStore::open_memory().unwrap(), &[1, 2, 3, 4]);
        for (a, b) in [(1, 2), (2, 3), (3, 4), (4, 2)] {
            store
                .insert_relationship(&RelationshipEdge::new(p(a), p(b)).permit_a_to_b())
                .unwrap();
        }

        let closure = RelationshipGraphResolver::new(&store)
            .resolve(p(1), date(2024, 6, 1))
            .unwrap();
        assert_eq!(closure.members(), &set(&[1, 2, 3, 4]));
    }

    #[test]
    fn test_ungranted_direction_is_not_followed() {
        let store = with_parties(MemoryStore::new(), &[1, 2, 3]);
        store
            .insert_relationship(&RelationshipEdge::new(p(1), p(2)).permit_a_to_b())
            .unwrap();
        // 2 is party_a here but the edge only grants 3->2
        store
            .insert_relationship(&RelationshipEdge::new(p(2), p(3)).permit_b_to_a())
            .unwrap();

        let closure = RelationshipGraphResolver::new(&store)
            .include_seed(false)
            .resolve(p(1), date(2024, 6, 1))
            .unwrap();
        assert_eq!(closure.members(), &set(&[2]));
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        let store = with_parties(MemoryStore::new(), &[1, 2]);
        for _ in 0..3 {
            store
                .insert_relationship(&RelationshipEdge::new(p(1), p(2)).permit_a_to_b())
                .unwrap();
        }

        let closure = RelationshipGraphResolver::new(&store)
            .include_seed(false)
            .resolve(p(1), date(2024, 6, 1))
            .unwrap();
        assert_eq!(closure.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_path_takes_one_round_per_hop(len in 1i64..40) {
            // 1 -> 2 -> ... -> len + 1
            let store = MemoryStore::new();
            for id in 1..=len + 1 {
                store.insert_party(p(id)).unwrap();
            }
            for id in 1..=len {
                store
                    .insert_relationship(&RelationshipEdge::new(p(id), p(id + 1)).permit_a_to_b())
                    .unwrap();
            }

            let closure = RelationshipGraphResolver::new(&store)
                .include_seed(false)
                .resolve(p(1), date(2024, 6, 1))
                .unwrap();
            prop_assert_eq!(closure.len() as i64, len);
            prop_assert_eq!(closure.rounds() as i64, len + 1);
        }
    }
}
