//! Foreign-key hops between host tables.
//!
//! Some resources only reach their owner through other rows: a
//! contribution is paid for a participant, the participant attends an
//! event, and only the event carries the owner attribute. Each step is a
//! [`ForeignKeyHop`] mapping ids in one column to ids in another.

use serde::{Deserialize, Serialize};

use crate::attribute::validate_identifier;
use crate::error::Result;

/// One `key_column -> value_column` lookup in `table`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyHop {
    table: String,
    key_column: String,
    value_column: String,
}

impl ForeignKeyHop {
    /// Create a hop, rejecting names that are not plain identifiers.
    pub fn new(
        table: impl Into<String>,
        key_column: impl Into<String>,
        value_column: impl Into<String>,
    ) -> Result<Self> {
        let hop = Self {
            table: table.into(),
            key_column: key_column.into(),
            value_column: value_column.into(),
        };
        validate_identifier(&hop.table)?;
        validate_identifier(&hop.key_column)?;
        validate_identifier(&hop.value_column)?;
        Ok(hop)
    }

    /// Create a hop from compile-time names.
    ///
    /// The names must already be plain identifiers; this is checked in
    /// debug builds only.
    pub fn from_static(
        table: &'static str,
        key_column: &'static str,
        value_column: &'static str,
    ) -> Self {
        debug_assert!(validate_identifier(table).is_ok());
        debug_assert!(validate_identifier(key_column).is_ok());
        debug_assert!(validate_identifier(value_column).is_ok());
        Self {
            table: table.to_string(),
            key_column: key_column.to_string(),
            value_column: value_column.to_string(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    pub fn value_column(&self) -> &str {
        &self.value_column
    }
}
