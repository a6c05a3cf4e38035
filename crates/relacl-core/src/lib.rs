//! # relacl Core
//!
//! Pure primitives for relationship-derived access control: party
//! identifiers, relationship edges with directional permissions and
//! validity windows, and logical-to-physical attribute descriptors.
//!
//! This crate contains no I/O and no storage. Everything here is plain
//! data plus the rules that decide whether an edge may be traversed on a
//! given date.
//!
//! ## Key Types
//!
//! - [`PartyId`] - A person or organization node in the relationship graph
//! - [`EntityId`] - The id of an owned resource (event, participant, contribution)
//! - [`RelationshipEdge`] - A link between two parties with per-direction grants
//! - [`AttributeRef`] - A logical attribute, by numeric id or by title
//! - [`AttributeDescriptor`] - The physical `(table, column)` an attribute lives in
//! - [`ForeignKeyHop`] - One id-to-id lookup on the way from a row to its owner

pub mod attribute;
pub mod edge;
pub mod error;
pub mod link;
pub mod types;

pub use attribute::{validate_identifier, AttributeDescriptor, AttributeRef};
pub use edge::{
    validate_storable_date, Direction, RelationshipEdge, MAX_STORABLE_DATE, MIN_STORABLE_DATE,
};
pub use error::{CoreError, Result};
pub use link::ForeignKeyHop;
pub use types::{EntityId, HostUserId, PartyId};
