//! Error types for relacl core.

use thiserror::Error;

/// Errors raised while constructing core values.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid SQL identifier: {0:?}")]
    InvalidIdentifier(String),

    #[error("invalid attribute reference: {0:?}")]
    InvalidAttributeRef(String),

    #[error("invalid date {value:?}: {reason}")]
    InvalidDate { value: String, reason: String },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
