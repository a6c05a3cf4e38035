//! Owner chains: how a resource id reaches the attribute naming its owner.

use serde::{Deserialize, Serialize};

use relacl_core::{AttributeRef, ForeignKeyHop};
use relacl_store::schema::{PARTICIPANTS, PARTICIPANT_PAYMENTS};

/// A sequence of foreign-key hops ending at an owner attribute.
///
/// An empty hop list means the resource carries the attribute itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerChain {
    hops: Vec<ForeignKeyHop>,
    attribute: AttributeRef,
}

impl OwnerChain {
    /// The resource itself carries `attribute`.
    pub fn direct(attribute: AttributeRef) -> Self {
        Self {
            hops: Vec::new(),
            attribute,
        }
    }

    /// Follow `hops` in order, then read `attribute`.
    pub fn with_hops(hops: Vec<ForeignKeyHop>, attribute: AttributeRef) -> Self {
        Self { hops, attribute }
    }

    /// Participant -> event -> owner.
    pub fn via_participant(attribute: AttributeRef) -> Self {
        Self::with_hops(participant_hops(), attribute)
    }

    /// Contribution -> participant -> event -> owner.
    pub fn via_contribution(attribute: AttributeRef) -> Self {
        Self::with_hops(contribution_hops(), attribute)
    }

    /// Append a hop, applied after the existing ones.
    pub fn hop(mut self, hop: ForeignKeyHop) -> Self {
        self.hops.push(hop);
        self
    }

    pub fn hops(&self) -> &[ForeignKeyHop] {
        &self.hops
    }

    pub fn attribute(&self) -> &AttributeRef {
        &self.attribute
    }

    pub fn is_direct(&self) -> bool {
        self.hops.is_empty()
    }
}

/// Hops from a participant id to its event id.
pub fn participant_hops() -> Vec<ForeignKeyHop> {
    vec![ForeignKeyHop::from_static(PARTICIPANTS, "id", "event_id")]
}

/// Hops from a contribution id to the event of the participant it paid for.
pub fn contribution_hops() -> Vec<ForeignKeyHop> {
    vec![
        ForeignKeyHop::from_static(PARTICIPANT_PAYMENTS, "contribution_id", "participant_id"),
        ForeignKeyHop::from_static(PARTICIPANTS, "id", "event_id"),
    ]
}
