//! # relacl
//!
//! Relationship-derived edit visibility for host applications.
//!
//! ## Overview
//!
//! Parties are linked by relationships that may grant one side the right
//! to edit the other. relacl turns those grants into a transitive
//! permission closure and uses it to decide which events, participants
//! and contributions a caller may see or edit.
//!
//! - **Closures**: who a party may edit, directly or through others
//! - **Ownership**: resources carry an owner attribute; unowned ones stay visible
//! - **Gating**: edit requests on resources outside the closure are denied
//! - **Configuration**: the owner attribute is named in a persisted config table
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use relacl::{AclConfig, RelAcl, RequestKind};
//! use relacl::core::{EntityId, HostUserId};
//! use relacl::store::SqliteStore;
//!
//! fn example() -> relacl::Result<()> {
//!     let store = SqliteStore::open("relacl.db")?;
//!     let acl = RelAcl::new(store, AclConfig::default());
//!
//!     let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
//!     let request = acl.begin_request(HostUserId::new(12), today)?;
//!
//!     // Gate an edit form
//!     request.authorize(&RequestKind::EditEvent(EntityId::new(42)))?;
//!
//!     // Filter a listing
//!     let rows = vec![(EntityId::new(42), "Spring gala"), (EntityId::new(43), "AGM")];
//!     let visible = request.filter(&RequestKind::ManageEvents, rows)?;
//!     println!("{} visible events", visible.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `relacl::core` - Identifiers, edges and attribute references
//! - `relacl::store` - Storage abstraction, SQLite and in-memory stores
//! - `relacl::perms` - Closure resolution and ownership filtering

pub mod admin;
pub mod config;
pub mod context;
pub mod error;
pub mod request;

// Re-export component crates
pub use relacl_core as core;
pub use relacl_perms as perms;
pub use relacl_store as store;

pub use admin::{AdminReply, ConfigAdmin};
pub use config::{AclConfig, DEFAULT_OWNER_ATTRIBUTE_KEY};
pub use context::RequestContext;
pub use error::{AclError, Result};
pub use request::{RequestKind, ResourceKind};

use std::sync::Arc;

use chrono::NaiveDate;
use relacl_core::{AttributeRef, HostUserId, PartyId};
use relacl_store::{AttributeStore, Store};

/// Entry point: a store plus engine configuration.
///
/// Holds no per-request state. Call [`begin_request`](Self::begin_request)
/// once per host request and drop the context when the request ends.
pub struct RelAcl<S: Store> {
    store: Arc<S>,
    config: AclConfig,
}

impl<S: Store> RelAcl<S> {
    pub fn new(store: S, config: AclConfig) -> Self {
        Self {
            store: Arc::new(store),
            config,
        }
    }

    /// Share an existing store.
    pub fn with_shared_store(store: Arc<S>, config: AclConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &AclConfig {
        &self.config
    }

    /// Start a request for a host user.
    ///
    /// A user without a party mapping gets a context with an empty closure.
    pub fn begin_request(
        &self,
        user: HostUserId,
        today: NaiveDate,
    ) -> Result<RequestContext<'_, S>> {
        let party = self.store.party_for_user(user)?;
        if party.is_none() {
            tracing::debug!(%user, "host user has no party");
        }
        Ok(RequestContext::new(&*self.store, &self.config, party, today))
    }

    /// Start a request for a party directly.
    pub fn begin_request_for_party(
        &self,
        party: PartyId,
        today: NaiveDate,
    ) -> RequestContext<'_, S> {
        RequestContext::new(&*self.store, &self.config, Some(party), today)
    }

    /// Configuration table administration.
    pub fn admin(&self) -> ConfigAdmin<'_, S> {
        ConfigAdmin::new(&*self.store)
    }

    /// Bind an accessor to one attribute.
    pub fn attribute_store(&self, attribute: AttributeRef) -> Result<AttributeStore<'_, S>> {
        Ok(AttributeStore::open(&*self.store, attribute)?)
    }
}
