//! # relacl Store
//!
//! Storage abstraction for relacl. Provides a trait-based interface over
//! the host's relationship graph, attribute tables, link tables and
//! configuration, with SQLite and in-memory implementations.
//!
//! ## Key Types
//!
//! - [`Store`] - The trait for all storage operations
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`AttributeStore`] - Reads and writes one logical attribute
//! - [`UpsertResult`] - Result of writing an attribute value
//!
//! ## Usage
//!
//! ```rust,no_run
//! use relacl_core::{AttributeRef, EntityId};
//! use relacl_store::{AttributeStore, SqliteStore};
//!
//! fn example() -> relacl_store::Result<()> {
//!     let store = SqliteStore::open("relacl.db")?;
//!
//!     let owners = AttributeStore::open(&store, AttributeRef::name("Event owner"))?;
//!     owners.upsert(EntityId::new(42), 7)?;
//!     assert_eq!(owners.get(EntityId::new(42))?, Some(7));
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Zero is "no value"**: zero attribute values are skipped on write
//!   and never reported on read
//! - **Batch lookups**: neighbor, value and link queries take id sets
//! - **Validated names**: dynamic table and column names come from
//!   validated descriptors only

pub mod attribute;
pub mod error;
pub mod memory;
pub mod migration;
pub mod schema;
pub mod sqlite;
pub mod traits;

pub use attribute::AttributeStore;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{Store, UpsertResult};
