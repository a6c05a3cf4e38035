//! Logical attribute references and their physical storage location.
//!
//! Owner data lives in generic per-entity attribute tables whose names are
//! only known at runtime. A logical [`AttributeRef`] is resolved once into
//! an [`AttributeDescriptor`] naming the table and value column.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A logical attribute, addressed by numeric field id or by group title.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeRef {
    /// The numeric id of the attribute field.
    Id(i64),
    /// The title of the attribute group; its first field is used.
    Name(String),
}

impl AttributeRef {
    pub fn id(id: i64) -> Self {
        Self::Id(id)
    }

    pub fn name(title: impl Into<String>) -> Self {
        Self::Name(title.into())
    }
}

impl FromStr for AttributeRef {
    type Err = CoreError;

    /// Parse a configuration value: all digits is an id, anything else a title.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CoreError::InvalidAttributeRef(s.to_string()));
        }

        if trimmed.bytes().all(|b| b.is_ascii_digit()) {
            let id = trimmed
                .parse::<i64>()
                .map_err(|_| CoreError::InvalidAttributeRef(s.to_string()))?;
            if id == 0 {
                return Err(CoreError::InvalidAttributeRef(s.to_string()));
            }
            return Ok(Self::Id(id));
        }

        Ok(Self::Name(trimmed.to_string()))
    }
}

impl fmt::Display for AttributeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeRef::Id(id) => write!(f, "attribute #{}", id),
            AttributeRef::Name(name) => write!(f, "attribute {:?}", name),
        }
    }
}

/// Physical location of an attribute's values.
///
/// Both names are validated identifiers, so they can be interpolated into
/// SQL. Values are keyed by an `entity_id` column in `table_name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeDescriptor {
    table_name: String,
    column_name: String,
}

impl AttributeDescriptor {
    /// Create a descriptor, rejecting names that are not plain identifiers.
    pub fn new(table_name: impl Into<String>, column_name: impl Into<String>) -> Result<Self> {
        let table_name = table_name.into();
        let column_name = column_name.into();
        validate_identifier(&table_name)?;
        validate_identifier(&column_name)?;
        Ok(Self {
            table_name,
            column_name,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn column_name(&self) -> &str {
        &self.column_name
    }
}

/// Accept `[A-Za-z_][A-Za-z0-9_]*`, at most 64 characters.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut bytes = name.bytes();
    let valid = match bytes.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == b'_')
                && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
        }
        None => false,
    };

    if valid && name.len() <= 64 {
        Ok(())
    } else {
        Err(CoreError::InvalidIdentifier(name.to_string()))
    }
}
