//! Names of the host tables the store knows about.
//!
//! Owner chains refer to link tables by name, so both backends and the
//! chain definitions share these constants.

/// Participant rows: `id`, `event_id`, `party_id`.
pub const PARTICIPANTS: &str = "participants";

/// Payment links: `id`, `participant_id`, `contribution_id`.
pub const PARTICIPANT_PAYMENTS: &str = "participant_payments";

/// The column every attribute value table is keyed by.
pub const ENTITY_ID_COLUMN: &str = "entity_id";

/// Largest id list bound into a single `IN (...)` query.
pub(crate) const MAX_BATCH: usize = 400;
