//! Change notifications published after each committed mutation.
//!
//! # Responsibility
//! - Define the typed event union observers react to.
//! - Provide the bounded broadcast bus carrying it.
//!
//! # Invariants
//! - Events describe committed state only; nothing is published for a
//!   rolled back transaction.
//! - Observers re-query current state on every event; no event carries
//!   entity payloads beyond ids.

mod bus;

pub use bus::{ChangeBus, ChangeSubscription, DEFAULT_EVENT_BUFFER_CAPACITY};

use crate::model::{FeatureId, GraphId, GroupId};

/// One logical effect of a committed mutation.
///
/// Tracker and function events carry the feature id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeEvent {
    TrackerCreated(FeatureId),
    TrackerUpdated(FeatureId),
    TrackerDeleted(FeatureId),
    FunctionCreated(FeatureId),
    FunctionUpdated(FeatureId),
    FunctionDeleted(FeatureId),
    GraphCreated(GraphId),
    /// The graph must be recomputed.
    GraphUpdated(GraphId),
    GraphDeleted(GraphId),
    GroupCreated(GroupId),
    GroupUpdated(GroupId),
    GroupDeleted(GroupId),
    /// Data points of this feature were inserted, edited or deleted.
    DataPoint(FeatureId),
    /// Children of this group were reordered.
    DisplayIndexChanged(GroupId),
    GlobalNote,
    ReminderChanged,
    /// Anything may have changed, or the subscriber missed events; observers
    /// reload everything.
    Unknown,
}

impl ChangeEvent {
    /// Short tag used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TrackerCreated(_) => "tracker_created",
            Self::TrackerUpdated(_) => "tracker_updated",
            Self::TrackerDeleted(_) => "tracker_deleted",
            Self::FunctionCreated(_) => "function_created",
            Self::FunctionUpdated(_) => "function_updated",
            Self::FunctionDeleted(_) => "function_deleted",
            Self::GraphCreated(_) => "graph_created",
            Self::GraphUpdated(_) => "graph_updated",
            Self::GraphDeleted(_) => "graph_deleted",
            Self::GroupCreated(_) => "group_created",
            Self::GroupUpdated(_) => "group_updated",
            Self::GroupDeleted(_) => "group_deleted",
            Self::DataPoint(_) => "data_point",
            Self::DisplayIndexChanged(_) => "display_index_changed",
            Self::GlobalNote => "global_note",
            Self::ReminderChanged => "reminder_changed",
            Self::Unknown => "unknown",
        }
    }
}
