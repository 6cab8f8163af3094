//! Which child slices a change event invalidates.

use crate::events::ChangeEvent;
use crate::model::GraphId;
use std::collections::BTreeSet;

/// Reload work for a group view. Plans merge, so a burst of events costs one
/// reload per slice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshPlan {
    pub groups: bool,
    pub features: bool,
    pub all_graphs: bool,
    /// Graphs to reload individually; empty when `all_graphs` is set.
    pub graphs: BTreeSet<GraphId>,
    /// Graphs to drop from the view.
    pub removed_graphs: BTreeSet<GraphId>,
}

impl RefreshPlan {
    /// Reload everything.
    pub fn full() -> Self {
        Self {
            groups: true,
            features: true,
            all_graphs: true,
            ..Self::default()
        }
    }

    pub fn for_event(event: &ChangeEvent) -> Self {
        match *event {
            ChangeEvent::TrackerCreated(_)
            | ChangeEvent::TrackerUpdated(_)
            | ChangeEvent::FunctionCreated(_)
            | ChangeEvent::FunctionDeleted(_)
            | ChangeEvent::DataPoint(_) => Self {
                features: true,
                ..Self::default()
            },
            ChangeEvent::TrackerDeleted(_) | ChangeEvent::FunctionUpdated(_) => Self {
                features: true,
                all_graphs: true,
                ..Self::default()
            },
            ChangeEvent::GraphCreated(id) | ChangeEvent::GraphUpdated(id) => Self {
                graphs: BTreeSet::from([id]),
                ..Self::default()
            },
            ChangeEvent::GraphDeleted(id) => Self {
                removed_graphs: BTreeSet::from([id]),
                ..Self::default()
            },
            ChangeEvent::GroupCreated(_)
            | ChangeEvent::GroupUpdated(_)
            | ChangeEvent::GroupDeleted(_) => Self {
                groups: true,
                ..Self::default()
            },
            ChangeEvent::DisplayIndexChanged(_) | ChangeEvent::Unknown => Self::full(),
            ChangeEvent::GlobalNote | ChangeEvent::ReminderChanged => Self::default(),
        }
    }

    pub fn merge(&mut self, other: Self) {
        self.groups |= other.groups;
        self.features |= other.features;
        self.all_graphs |= other.all_graphs;
        self.removed_graphs.extend(other.removed_graphs);
        self.graphs.extend(other.graphs);
        self.graphs.retain(|id| !self.removed_graphs.contains(id));
        if self.all_graphs {
            self.graphs.clear();
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl FromIterator<ChangeEvent> for RefreshPlan {
    fn from_iter<I: IntoIterator<Item = ChangeEvent>>(events: I) -> Self {
        let mut plan = Self::default();
        for event in events {
            plan.merge(Self::for_event(&event));
        }
        plan
    }
}
