//! Merges the three independently loaded child slices of a group.
//!
//! # Invariants
//! - Nothing is emitted until groups, features and graphs have each loaded
//!   once since the last [`ChildComposer::reset`].
//! - Every emitted list is sorted and free of duplicates.

use super::group_child::{sort_group_children, DisplayFunction, DisplayGraph, GroupChild};
use crate::model::feature::DisplayTracker;
use crate::model::group::Group;
use crate::model::GraphId;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct ChildComposer {
    groups: Option<Vec<Group>>,
    features: Option<(Vec<DisplayTracker>, Vec<DisplayFunction>)>,
    graphs: Option<BTreeMap<GraphId, DisplayGraph>>,
}

impl ChildComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets every slice; used when the viewed group changes.
    pub fn reset(&mut self) {
        self.groups = None;
        self.features = None;
        self.graphs = None;
    }

    pub fn is_complete(&self) -> bool {
        self.groups.is_some() && self.features.is_some() && self.graphs.is_some()
    }

    pub fn set_groups(&mut self, groups: Vec<Group>) -> Option<Vec<GroupChild>> {
        self.groups = Some(groups);
        self.compose()
    }

    pub fn set_features(
        &mut self,
        trackers: Vec<DisplayTracker>,
        functions: Vec<DisplayFunction>,
    ) -> Option<Vec<GroupChild>> {
        self.features = Some((trackers, functions));
        self.compose()
    }

    pub fn set_graphs(&mut self, graphs: Vec<DisplayGraph>) -> Option<Vec<GroupChild>> {
        self.graphs = Some(
            graphs
                .into_iter()
                .map(|display| (display.graph.id, display))
                .collect(),
        );
        self.compose()
    }

    /// Replaces or adds one graph. Ignored until the graph slice has loaded.
    pub fn upsert_graph(&mut self, graph: DisplayGraph) -> Option<Vec<GroupChild>> {
        if let Some(graphs) = &mut self.graphs {
            graphs.insert(graph.graph.id, graph);
        }
        self.compose()
    }

    pub fn remove_graph(&mut self, id: GraphId) -> Option<Vec<GroupChild>> {
        if let Some(graphs) = &mut self.graphs {
            graphs.remove(&id);
        }
        self.compose()
    }

    /// The merged list, or `None` while a slice is still missing.
    pub fn compose(&self) -> Option<Vec<GroupChild>> {
        let (Some(groups), Some((trackers, functions)), Some(graphs)) =
            (&self.groups, &self.features, &self.graphs)
        else {
            return None;
        };
        let children = groups
            .iter()
            .cloned()
            .map(GroupChild::Group)
            .chain(trackers.iter().cloned().map(GroupChild::Tracker))
            .chain(functions.iter().cloned().map(GroupChild::Function))
            .chain(graphs.values().cloned().map(GroupChild::Graph))
            .collect();
        Some(sort_group_children(children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::graph::{GraphConfig, GraphOrStat};
    use crate::model::validity::Validity;

    fn group(id: i64) -> Group {
        Group {
            id,
            name: String::new(),
            parent_group_id: Some(0),
            display_index: 0,
            color_index: 0,
        }
    }

    fn graph(id: i64, display_index: i32) -> DisplayGraph {
        DisplayGraph {
            graph: GraphOrStat {
                id,
                group_id: 0,
                name: String::new(),
                display_index,
                config: GraphConfig::last_value(1),
            },
            validity: Validity::Valid,
        }
    }

    #[test]
    fn waits_for_all_three_slices() {
        let mut composer = ChildComposer::new();
        assert!(composer.set_groups(vec![group(1)]).is_none());
        assert!(composer.set_graphs(vec![graph(5, 1)]).is_none());
        let merged = composer.set_features(Vec::new(), Vec::new()).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn reset_requires_a_fresh_load() {
        let mut composer = ChildComposer::new();
        composer.set_groups(Vec::new());
        composer.set_features(Vec::new(), Vec::new());
        composer.set_graphs(Vec::new());
        assert!(composer.is_complete());

        composer.reset();
        assert!(composer.set_groups(vec![group(2)]).is_none());
        assert!(composer.compose().is_none());
    }

    #[test]
    fn single_graph_changes_apply_in_place() {
        let mut composer = ChildComposer::new();
        composer.set_groups(Vec::new());
        composer.set_features(Vec::new(), Vec::new());
        composer.set_graphs(vec![graph(1, 0), graph(2, 1)]);

        let merged = composer.upsert_graph(graph(2, 0)).unwrap();
        let ids: Vec<i64> = merged.iter().map(GroupChild::id).collect();
        assert_eq!(ids, vec![2, 1]);

        let merged = composer.remove_graph(1).unwrap();
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn upsert_before_load_does_not_complete() {
        let mut composer = ChildComposer::new();
        composer.set_groups(Vec::new());
        composer.set_features(Vec::new(), Vec::new());
        assert!(composer.upsert_graph(graph(1, 0)).is_none());
    }
}
