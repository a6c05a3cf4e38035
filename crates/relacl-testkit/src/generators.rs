//! Proptest generators for property-based testing.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;

use relacl_core::{PartyId, RelationshipEdge};

/// First day of the generated date range.
pub fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Days covered by generated dates.
pub const DAY_SPAN: i64 = 60;

/// Generate a date within the first [`DAY_SPAN`] days after [`epoch`].
pub fn date() -> impl Strategy<Value = NaiveDate> {
    (0..DAY_SPAN).prop_map(|offset| epoch() + Duration::days(offset))
}

/// Generate a party id in `1..=max`.
pub fn party_id(max: i64) -> impl Strategy<Value = PartyId> {
    (1..=max).prop_map(PartyId::new)
}

/// Generate an optional validity window. Bounds may be inverted.
pub fn window() -> impl Strategy<Value = (Option<NaiveDate>, Option<NaiveDate>)> {
    (prop::option::of(date()), prop::option::of(date()))
}

/// Generate an edge between parties in `1..=max_party`.
pub fn edge(max_party: i64) -> impl Strategy<Value = RelationshipEdge> {
    (
        party_id(max_party),
        party_id(max_party),
        any::<bool>(),
        any::<bool>(),
        prop::bool::weighted(0.85),
        window(),
    )
        .prop_map(|(a, b, a_to_b, b_to_a, active, (start, end))| {
            let mut edge = RelationshipEdge::new(a, b).between(start, end);
            if a_to_b {
                edge = edge.permit_a_to_b();
            }
            if b_to_a {
                edge = edge.permit_b_to_a();
            }
            if !active {
                edge = edge.inactive();
            }
            edge
        })
}

/// Edges that are active, unbounded and grant A to B.
pub fn always_valid_edge(max_party: i64) -> impl Strategy<Value = RelationshipEdge> {
    (party_id(max_party), party_id(max_party))
        .prop_map(|(a, b)| RelationshipEdge::new(a, b).permit_a_to_b())
}

/// Parameters for one resolution: a graph, a seed and a date.
#[derive(Debug, Clone)]
pub struct GraphParams {
    /// Parties `1..=party_count` exist.
    pub party_count: i64,
    pub edges: Vec<RelationshipEdge>,
    pub seed: PartyId,
    pub on: NaiveDate,
}

/// Largest party universe generated by [`GraphParams`].
pub const MAX_PARTIES: i64 = 12;

impl Arbitrary for GraphParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (2..=MAX_PARTIES)
            .prop_flat_map(|party_count| {
                (
                    Just(party_count),
                    prop::collection::vec(edge(party_count), 0..40),
                    party_id(party_count),
                    date(),
                )
            })
            .prop_map(|(party_count, edges, seed, on)| GraphParams {
                party_count,
                edges,
                seed,
                on,
            })
            .boxed()
    }
}

impl GraphParams {
    pub fn parties(&self) -> impl Iterator<Item = PartyId> {
        (1..=self.party_count).map(PartyId::new)
    }
}
