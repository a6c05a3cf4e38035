//! Error types for the permissions module.

use relacl_core::{CoreError, EntityId, PartyId};
use relacl_store::StoreError;
use thiserror::Error;

/// Errors that can occur during permission operations.
#[derive(Debug, Error)]
pub enum PermsError {
    /// The caller's closure does not contain the resource's owner.
    #[error("access denied to resource {resource} owned by party {owner}")]
    AccessDenied { resource: EntityId, owner: PartyId },

    /// The owner attribute or another required mapping is not configured.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(StoreError),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl From<StoreError> for PermsError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConfigurationMissing(msg) => PermsError::ConfigurationMissing(msg),
            other => PermsError::Store(other),
        }
    }
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
