//! Error types for the store module.

use relacl_core::CoreError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A required attribute or configuration mapping does not exist.
    ///
    /// Without it no correct ownership decision can be made, so callers
    /// must surface this instead of falling back to a default.
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),

    /// A table or other named object is unknown to the store.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A stored name or value failed core validation.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock guarding store state was poisoned by a panicking writer.
    #[error("store lock poisoned: {0}")]
    Poisoned(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
