//! Administrative access to the configuration table.
//!
//! Every operation returns an [`AdminReply`] rather than an error so the
//! host can hand the body straight back to its admin screen.

use std::collections::BTreeMap;

use relacl_store::Store;

use crate::error::{AclError, Result};

/// Longest accepted config key.
pub const MAX_KEY_LEN: usize = 255;

/// Outcome of an admin operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminReply {
    /// The write succeeded.
    Ok,
    /// Every configuration row.
    Rows(BTreeMap<String, String>),
    /// A human-readable failure.
    Error(String),
}

impl AdminReply {
    pub fn is_ok(&self) -> bool {
        !matches!(self, AdminReply::Error(_))
    }

    /// The response body: `ok`, a JSON object of rows, or the message.
    pub fn to_body(&self) -> String {
        match self {
            AdminReply::Ok => "ok".to_string(),
            AdminReply::Rows(rows) => serde_json::to_string(rows)
                .unwrap_or_else(|e| format!("could not encode configuration: {}", e)),
            AdminReply::Error(message) => message.clone(),
        }
    }
}

impl From<Result<()>> for AdminReply {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => AdminReply::Ok,
            Err(e) => AdminReply::Error(e.to_string()),
        }
    }
}

/// CRUD over the configuration table.
pub struct ConfigAdmin<'s, S: Store + ?Sized> {
    store: &'s S,
}

impl<'s, S: Store + ?Sized> ConfigAdmin<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Read every row.
    pub fn get_config(&self) -> AdminReply {
        match self.store.list_config() {
            Ok(rows) => AdminReply::Rows(rows),
            Err(e) => AdminReply::Error(AclError::from(e).to_string()),
        }
    }

    /// Create the row if absent, otherwise overwrite its value.
    pub fn save_config_row(&self, key: &str, value: &str) -> AdminReply {
        self.save(key, value).into()
    }

    /// Delete a row. Deleting an absent key succeeds.
    pub fn delete_config_row(&self, key: &str) -> AdminReply {
        self.delete(key).into()
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        let key = validate_key(key)?;
        let value = value.trim();
        if value.is_empty() {
            return Err(AclError::InvalidRequest(format!(
                "value for {:?} must not be empty",
                key
            )));
        }

        self.store.set_config(key, value)?;
        tracing::info!(key, value, "config row saved");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let key = validate_key(key)?;
        let removed = self.store.delete_config(key)?;
        tracing::info!(key, removed, "config row deleted");
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<&str> {
    let key = key.trim();
    if key.is_empty() {
        return Err(AclError::InvalidRequest(
            "config key must not be empty".to_string(),
        ));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(AclError::InvalidRequest(format!(
            "config key longer than {} bytes",
            MAX_KEY_LEN
        )));
    }
    Ok(key)
}
