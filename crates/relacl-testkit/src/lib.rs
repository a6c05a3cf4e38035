//! # relacl Testkit
//!
//! Testing utilities for relacl.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Generators**: Proptest strategies for parties, dates, edges and whole graphs
//! - **Fixtures**: Graph scenarios that seed either store backend
//! - **Oracle**: A slow, obviously-correct closure for comparison
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use relacl_testkit::generators::GraphParams;
//!
//! proptest! {
//!     #[test]
//!     fn resolution_is_idempotent(params: GraphParams) {
//!         // seed a store from params, resolve twice, compare
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use relacl_testkit::fixtures::two_hop_fixture;
//!
//! let store = two_hop_fixture().memory_store().unwrap();
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{naive_closure, two_hop_fixture, GraphFixture, OWNER_TITLE};
pub use generators::GraphParams;
