//! Engine configuration.

use relacl_core::ForeignKeyHop;
use relacl_perms::{contribution_hops, participant_hops};
use serde::{Deserialize, Serialize};

/// Default config key naming the event owner attribute.
pub const DEFAULT_OWNER_ATTRIBUTE_KEY: &str = "event_owner_attribute";

/// Configuration for [`RelAcl`](crate::RelAcl).
///
/// The owner attribute itself lives in the persisted configuration table
/// so administrators can change it; this struct only names the key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AclConfig {
    /// Whether a party belongs to its own closure.
    pub include_seed: bool,
    /// Config key whose value is the owner attribute id or title.
    pub owner_attribute_key: String,
    /// Hops from a participant id to the entity carrying the owner.
    pub participant_hops: Vec<ForeignKeyHop>,
    /// Hops from a contribution id to the entity carrying the owner.
    pub contribution_hops: Vec<ForeignKeyHop>,
}

impl Default for AclConfig {
    fn default() -> Self {
        Self {
            include_seed: true,
            owner_attribute_key: DEFAULT_OWNER_ATTRIBUTE_KEY.to_string(),
            participant_hops: participant_hops(),
            contribution_hops: contribution_hops(),
        }
    }
}
