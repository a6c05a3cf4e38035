//! Relationship edges.
//!
//! An edge links two parties. Each direction carries its own "may edit"
//! flag, and the whole edge is only usable while it is active and inside
//! its optional date window.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::PartyId;

/// Earliest date a store can hold and compare.
///
/// Dates are persisted as `YYYY-MM-DD` text and compared as strings, which
/// only orders correctly for four-digit, non-negative years.
pub const MIN_STORABLE_DATE: NaiveDate = match NaiveDate::from_ymd_opt(0, 1, 1) {
    Some(d) => d,
    None => NaiveDate::MIN,
};

/// Latest date a store can hold and compare.
pub const MAX_STORABLE_DATE: NaiveDate = match NaiveDate::from_ymd_opt(9999, 12, 31) {
    Some(d) => d,
    None => NaiveDate::MAX,
};

/// Reject dates outside [`MIN_STORABLE_DATE`]..=[`MAX_STORABLE_DATE`].
pub fn validate_storable_date(date: NaiveDate) -> Result<NaiveDate> {
    if date < MIN_STORABLE_DATE || date > MAX_STORABLE_DATE {
        return Err(CoreError::InvalidDate {
            value: date.to_string(),
            reason: "year must be between 0000 and 9999".into(),
        });
    }
    Ok(date)
}

/// Traversal direction along an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// From `party_a` to `party_b`, gated by `permission_a_to_b`.
    AToB,
    /// From `party_b` to `party_a`, gated by `permission_b_to_a`.
    BToA,
}

/// A link between two parties, owned by the host's relationship subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipEdge {
    pub party_a: PartyId,
    pub party_b: PartyId,

    /// `party_a` may edit `party_b`.
    pub permission_a_to_b: bool,

    /// `party_b` may edit `party_a`.
    pub permission_b_to_a: bool,

    pub is_active: bool,

    /// Inclusive lower bound. `None` means "since forever".
    pub start_date: Option<NaiveDate>,

    /// Inclusive upper bound. `None` means "open ended".
    pub end_date: Option<NaiveDate>,
}

impl RelationshipEdge {
    /// An active, unbounded edge with no permissions in either direction.
    pub fn new(party_a: PartyId, party_b: PartyId) -> Self {
        Self {
            party_a,
            party_b,
            permission_a_to_b: false,
            permission_b_to_a: false,
            is_active: true,
            start_date: None,
            end_date: None,
        }
    }

    /// Grant `party_a` edit rights over `party_b`.
    pub fn permit_a_to_b(mut self) -> Self {
        self.permission_a_to_b = true;
        self
    }

    /// Grant `party_b` edit rights over `party_a`.
    pub fn permit_b_to_a(mut self) -> Self {
        self.permission_b_to_a = true;
        self
    }

    /// Restrict the edge to an inclusive date window.
    pub fn between(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    /// Mark the edge as disabled.
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Check that both window bounds fit the storable date range.
    pub fn validate_dates(&self) -> Result<()> {
        for date in [self.start_date, self.end_date].into_iter().flatten() {
            validate_storable_date(date)?;
        }
        Ok(())
    }

    /// Check whether the edge is usable on `on`.
    pub fn is_valid_on(&self, on: NaiveDate) -> bool {
        if !self.is_active {
            return false;
        }

        if let Some(start) = self.start_date {
            if start > on {
                return false;
            }
        }

        if let Some(end) = self.end_date {
            if end < on {
                return false;
            }
        }

        true
    }

    /// Whether the edge grants traversal in `direction`, ignoring validity.
    pub fn permits(&self, direction: Direction) -> bool {
        match direction {
            Direction::AToB => self.permission_a_to_b,
            Direction::BToA => self.permission_b_to_a,
        }
    }

    /// The party reachable from `from` through this edge on `on`, if any.
    ///
    /// Returns `None` when `from` is not an endpoint, the edge is not
    /// valid on `on`, or the direction leaving `from` carries no grant.
    /// A self-loop is treated as an `AToB` edge.
    pub fn neighbor_of(&self, from: PartyId, on: NaiveDate) -> Option<PartyId> {
        if !self.is_valid_on(on) {
            return None;
        }

        if from == self.party_a && self.permits(Direction::AToB) {
            return Some(self.party_b);
        }
        if from == self.party_b && self.permits(Direction::BToA) {
            return Some(self.party_a);
        }

        None
    }
}
