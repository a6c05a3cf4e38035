//! What the host is asking for.
//!
//! The host maps its own pages and forms onto a [`RequestKind`]; the core
//! never inspects host types.

use std::fmt;

use relacl_core::EntityId;
use serde::{Deserialize, Serialize};

/// The kind of resource a request lists or edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Owner attribute stored on the event itself.
    Event,
    /// Owner reached through the participant's event.
    Participant,
    /// Owner reached through payment, participant, then event.
    Contribution,
    /// Rows keyed by party id, checked against the closure directly.
    Party,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Event => "event",
            ResourceKind::Participant => "participant",
            ResourceKind::Contribution => "contribution",
            ResourceKind::Party => "party",
        };
        f.write_str(name)
    }
}

/// A host request the core is asked to filter or gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Event management listing.
    ManageEvents,
    /// Event dashboard listing.
    EventDashboard,
    /// Editing one event.
    EditEvent(EntityId),
    /// Participant search results.
    ParticipantSearch,
    /// Editing one participant record.
    EditParticipant(EntityId),
    /// The events tab of a contact, listing participant records.
    ContactEventsTab,
    /// The contributions tab of a contact.
    ContactContributionsTab,
    /// A contact's summary page, whose activity feed lists event
    /// participations by participant id.
    ContactSummary,
    /// Recent contributions on the contribution dashboard.
    ContributionDashboard,
    /// Contribution search results.
    ContributionSearch,
    /// Editing one contribution.
    EditContribution(EntityId),
    /// Event report rows.
    EventReport,
    /// Contribution report rows.
    ContributionReport,
}

impl RequestKind {
    /// The resource kind the request's rows or target belong to.
    pub fn resource(&self) -> ResourceKind {
        match self {
            RequestKind::ManageEvents
            | RequestKind::EventDashboard
            | RequestKind::EditEvent(_)
            | RequestKind::EventReport => ResourceKind::Event,
            RequestKind::ParticipantSearch => ResourceKind::Party,
            RequestKind::EditParticipant(_)
            | RequestKind::ContactEventsTab
            | RequestKind::ContactSummary => ResourceKind::Participant,
            RequestKind::ContactContributionsTab
            | RequestKind::ContributionDashboard
            | RequestKind::ContributionSearch
            | RequestKind::EditContribution(_)
            | RequestKind::ContributionReport => ResourceKind::Contribution,
        }
    }

    /// The single resource an edit request targets, if any.
    pub fn target(&self) -> Option<EntityId> {
        match self {
            RequestKind::EditEvent(id)
            | RequestKind::EditParticipant(id)
            | RequestKind::EditContribution(id) => Some(*id),
            _ => None,
        }
    }
}
