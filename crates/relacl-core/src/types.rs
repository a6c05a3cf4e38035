//! Strong type definitions for relacl.
//!
//! All identifiers are newtypes over the host database's integer keys so a
//! party id can never be passed where an event id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw integer key.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// The raw integer key.
            pub const fn get(self) -> i64 {
                self.0
            }

            /// Host keys start at 1; zero and negatives mean "no such row".
            pub const fn is_valid(self) -> bool {
                self.0 > 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

integer_id!(
    /// A person or organization node in the relationship graph.
    PartyId,
    "PartyId"
);

integer_id!(
    /// The id of an owned resource row: an event, participant or contribution.
    EntityId,
    "EntityId"
);

integer_id!(
    /// The host framework's own user id, mapped to a [`PartyId`] by the store.
    HostUserId,
    "HostUserId"
);
