//! # relacl Permissions
//!
//! Permission closures over the relationship graph, and ownership
//! filtering of resources against them.
//!
//! ## Overview
//!
//! A party may edit another party when a relationship between them grants
//! that direction and is valid on the evaluation date. Grants chain: if A
//! may edit B and B may edit C, A may edit C. The
//! [`RelationshipGraphResolver`] computes this transitive set as a
//! [`PermissionClosure`].
//!
//! Resources such as events carry an owner attribute naming a party. The
//! [`OwnershipFilter`] keeps resources whose owner is in the caller's
//! closure. Resources with no owner stay visible.
//!
//! ## Key Concepts
//!
//! - **Closure**: every party reachable from a seed through permissioned,
//!   currently valid edges
//! - **Owner chain**: the foreign-key hops from a resource to the entity
//!   carrying the owner attribute ([`OwnerChain`])
//! - **Fail open**: a resource without a resolvable owner is never hidden
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use relacl_core::{AttributeRef, EntityId, PartyId};
//! use relacl_perms::{OwnerChain, OwnershipFilter, RelationshipGraphResolver};
//! use relacl_store::SqliteStore;
//!
//! fn example() -> relacl_perms::Result<()> {
//!     let store = SqliteStore::open("relacl.db")?;
//!     let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//!
//!     let closure = RelationshipGraphResolver::new(&store).resolve(PartyId::new(7), today)?;
//!     let filter = OwnershipFilter::new(&store, &closure);
//!
//!     let events = OwnerChain::direct(AttributeRef::name("Event owner"));
//!     filter.ensure_allowed(&events, EntityId::new(42))?;
//!     Ok(())
//! }
//! ```

pub mod chain;
pub mod error;
pub mod filter;
pub mod resolver;

pub use chain::{contribution_hops, participant_hops, OwnerChain};
pub use error::{PermsError, Result};
pub use filter::OwnershipFilter;
pub use resolver::{PermissionClosure, RelationshipGraphResolver};
