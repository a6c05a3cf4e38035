//! Per-attribute accessor over the store.
//!
//! An [`AttributeStore`] is bound to one logical attribute. The physical
//! table and column are resolved once at construction and reused for
//! every read and write.

use std::collections::{BTreeMap, BTreeSet};

use relacl_core::{AttributeDescriptor, AttributeRef, EntityId};

use crate::error::{Result, StoreError};
use crate::traits::{Store, UpsertResult};

/// Scalar values of one attribute, one per entity.
pub struct AttributeStore<'s, S: Store + ?Sized> {
    store: &'s S,
    attribute: AttributeRef,
    descriptor: AttributeDescriptor,
}

impl<'s, S: Store + ?Sized> AttributeStore<'s, S> {
    /// Bind to `attribute`, resolving where its values live.
    ///
    /// Fails with [`StoreError::ConfigurationMissing`] if the catalog does
    /// not know the attribute.
    pub fn open(store: &'s S, attribute: AttributeRef) -> Result<Self> {
        let descriptor = store.resolve_attribute(&attribute)?.ok_or_else(|| {
            StoreError::ConfigurationMissing(format!("no storage registered for {}", attribute))
        })?;

        tracing::debug!(
            %attribute,
            table = descriptor.table_name(),
            column = descriptor.column_name(),
            "attribute resolved"
        );

        Ok(Self {
            store,
            attribute,
            descriptor,
        })
    }

    pub fn attribute(&self) -> &AttributeRef {
        &self.attribute
    }

    pub fn descriptor(&self) -> &AttributeDescriptor {
        &self.descriptor
    }

    /// The value stored for `entity`, if any.
    pub fn get(&self, entity: EntityId) -> Result<Option<i64>> {
        self.store.load_attribute_value(&self.descriptor, entity)
    }

    /// Values for a batch of entities, in one round trip per chunk.
    pub fn get_many(&self, entities: &BTreeSet<EntityId>) -> Result<BTreeMap<EntityId, i64>> {
        self.store.load_attribute_values(&self.descriptor, entities)
    }

    /// Every stored value.
    pub fn get_all(&self) -> Result<BTreeMap<EntityId, i64>> {
        self.store.load_all_attribute_values(&self.descriptor)
    }

    /// Insert or update the value for `entity`. Zero is never written.
    pub fn upsert(&self, entity: EntityId, value: i64) -> Result<UpsertResult> {
        let result = self.store.upsert_attribute_value(&self.descriptor, entity, value)?;
        match result {
            UpsertResult::Skipped => {
                tracing::warn!(%entity, value, attribute = %self.attribute, "attribute write skipped")
            }
            _ => tracing::debug!(%entity, value, ?result, "attribute written"),
        }
        Ok(result)
    }
}
