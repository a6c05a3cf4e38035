//! Per-request state.
//!
//! A [`RequestContext`] is created once per host request and handed to
//! every hook that request runs. It memoizes the caller's closure and the
//! owner attribute, so several hooks within one request share one BFS.
//! Nothing survives the request: build a new context for the next one.

use std::cell::OnceCell;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use relacl_core::{AttributeRef, EntityId, PartyId};
use relacl_perms::{OwnerChain, OwnershipFilter, PermissionClosure, RelationshipGraphResolver};
use relacl_store::{AttributeStore, Store, UpsertResult};

use crate::config::AclConfig;
use crate::error::{AclError, Result};
use crate::request::{RequestKind, ResourceKind};

/// One request's view of what the caller may edit.
pub struct RequestContext<'a, S: Store + ?Sized> {
    store: &'a S,
    config: &'a AclConfig,
    party: Option<PartyId>,
    today: NaiveDate,
    closure: OnceCell<PermissionClosure>,
    owner_attribute: OnceCell<AttributeRef>,
}

impl<'a, S: Store + ?Sized> RequestContext<'a, S> {
    /// Create a context for a caller. `None` means the caller has no party
    /// and may only see unowned resources.
    pub fn new(
        store: &'a S,
        config: &'a AclConfig,
        party: Option<PartyId>,
        today: NaiveDate,
    ) -> Self {
        Self {
            store,
            config,
            party,
            today,
            closure: OnceCell::new(),
            owner_attribute: OnceCell::new(),
        }
    }

    pub fn party(&self) -> Option<PartyId> {
        self.party
    }

    /// The date relationship validity is evaluated against.
    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// The caller's closure, resolved on first use.
    pub fn allowed_parties(&self) -> Result<&PermissionClosure> {
        if let Some(closure) = self.closure.get() {
            return Ok(closure);
        }

        let closure = match self.party {
            Some(party) => RelationshipGraphResolver::new(self.store)
                .include_seed(self.config.include_seed)
                .resolve(party, self.today)?,
            None => PermissionClosure::empty(None, self.today),
        };

        Ok(self.closure.get_or_init(|| closure))
    }

    /// The owner attribute named by the configuration table.
    ///
    /// A missing or unparsable row is [`AclError::ConfigurationMissing`].
    pub fn owner_attribute(&self) -> Result<&AttributeRef> {
        if let Some(attribute) = self.owner_attribute.get() {
            return Ok(attribute);
        }

        let key = &self.config.owner_attribute_key;
        let raw = self.store.get_config(key)?.ok_or_else(|| {
            AclError::ConfigurationMissing(format!("config key {:?} is not set", key))
        })?;
        let attribute: AttributeRef = raw.parse().map_err(|_| {
            AclError::ConfigurationMissing(format!(
                "config key {:?} has invalid value {:?}",
                key, raw
            ))
        })?;

        Ok(self.owner_attribute.get_or_init(|| attribute))
    }

    /// The owner chain for a resource kind, or `None` for party rows.
    pub fn chain_for(&self, resource: ResourceKind) -> Result<Option<OwnerChain>> {
        let hops = match resource {
            ResourceKind::Party => return Ok(None),
            ResourceKind::Event => Vec::new(),
            ResourceKind::Participant => self.config.participant_hops.clone(),
            ResourceKind::Contribution => self.config.contribution_hops.clone(),
        };
        let attribute = self.owner_attribute()?.clone();
        Ok(Some(OwnerChain::with_hops(hops, attribute)))
    }

    /// Keep the rows the caller may see, in their original order.
    ///
    /// Rows of [`ResourceKind::Party`] requests are keyed by party id.
    pub fn filter<T>(
        &self,
        kind: &RequestKind,
        rows: Vec<(EntityId, T)>,
    ) -> Result<Vec<(EntityId, T)>> {
        let closure = self.allowed_parties()?;
        match self.chain_for(kind.resource())? {
            Some(chain) => Ok(OwnershipFilter::new(self.store, closure).filter(&chain, rows)?),
            None => Ok(rows
                .into_iter()
                .filter(|(id, _)| closure.contains(PartyId::new(id.get())))
                .collect()),
        }
    }

    /// In-place variant of [`filter`](Self::filter).
    pub fn retain<T>(&self, kind: &RequestKind, rows: &mut BTreeMap<EntityId, T>) -> Result<()> {
        let closure = self.allowed_parties()?;
        match self.chain_for(kind.resource())? {
            Some(chain) => OwnershipFilter::new(self.store, closure).retain(&chain, rows)?,
            None => rows.retain(|id, _| closure.contains(PartyId::new(id.get()))),
        }
        Ok(())
    }

    /// Keep rows naming a party in the caller's closure.
    pub fn retain_parties<T>(
        &self,
        rows: &mut Vec<T>,
        party_of: impl Fn(&T) -> PartyId,
    ) -> Result<()> {
        let closure = self.allowed_parties()?;
        OwnershipFilter::new(self.store, closure).retain_parties(rows, party_of);
        Ok(())
    }

    /// Whether the caller may act on one resource.
    pub fn is_allowed(&self, resource: ResourceKind, id: EntityId) -> Result<bool> {
        let closure = self.allowed_parties()?;
        match self.chain_for(resource)? {
            Some(chain) => Ok(OwnershipFilter::new(self.store, closure).is_allowed(&chain, id)?),
            None => Ok(closure.contains(PartyId::new(id.get()))),
        }
    }

    /// Gate a request. Listing requests always pass; edit requests fail
    /// with [`AclError::AccessDenied`] when the target is not allowed.
    pub fn authorize(&self, kind: &RequestKind) -> Result<()> {
        let Some(id) = kind.target() else {
            return Ok(());
        };
        let resource = kind.resource();

        if self.is_allowed(resource, id)? {
            return Ok(());
        }

        tracing::warn!(
            party = ?self.party,
            %resource,
            %id,
            "access denied"
        );
        Err(AclError::AccessDenied { resource, id })
    }

    /// Record the caller as owner of a newly created event.
    ///
    /// Skipped when the caller has no party.
    pub fn record_owner(&self, event: EntityId) -> Result<UpsertResult> {
        let Some(party) = self.party else {
            return Ok(UpsertResult::Skipped);
        };
        let owners = AttributeStore::open(self.store, self.owner_attribute()?.clone())?;
        Ok(owners.upsert(event, party.get())?)
    }
}
