//! Error types for the relacl facade.

use relacl_core::{CoreError, EntityId};
use relacl_perms::PermsError;
use relacl_store::StoreError;
use thiserror::Error;

use crate::request::ResourceKind;

/// Errors that can occur while serving a request.
#[derive(Debug, Error)]
pub enum AclError {
    /// A required configuration row or attribute mapping is absent.
    ///
    /// Blocks the request: guessing an owner attribute would leak or hide
    /// data.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// The caller may not act on the resource.
    #[error("access denied to {resource} {id}")]
    AccessDenied { resource: ResourceKind, id: EntityId },

    /// The request itself is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(StoreError),

    /// Permission error.
    #[error("permission error: {0}")]
    Perms(PermsError),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

impl From<StoreError> for AclError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ConfigurationMissing(msg) => AclError::ConfigurationMissing(msg),
            other => AclError::Store(other),
        }
    }
}

impl From<PermsError> for AclError {
    fn from(e: PermsError) -> Self {
        match e {
            PermsError::ConfigurationMissing(msg) => AclError::ConfigurationMissing(msg),
            PermsError::Store(store) => store.into(),
            other => AclError::Perms(other),
        }
    }
}

/// Result type for facade operations.
pub type Result<T> = std::result::Result<T, AclError>;
