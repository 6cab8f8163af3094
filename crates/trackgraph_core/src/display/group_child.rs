//! Children of a group as one presentation list.

use crate::model::feature::DisplayTracker;
use crate::model::function::Function;
use crate::model::graph::GraphOrStat;
use crate::model::group::Group;
use crate::model::validity::Validity;
use std::collections::HashSet;

/// Function row with its current evaluation validity.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFunction {
    pub function: Function,
    pub validity: Validity,
}

/// Graph row with its current evaluation validity.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayGraph {
    pub graph: GraphOrStat,
    pub validity: Validity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupChildKind {
    Group,
    Tracker,
    Function,
    Graph,
}

/// One row of a group listing. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupChild {
    Group(Group),
    Tracker(DisplayTracker),
    Function(DisplayFunction),
    Graph(DisplayGraph),
}

impl GroupChild {
    pub fn kind(&self) -> GroupChildKind {
        match self {
            Self::Group(_) => GroupChildKind::Group,
            Self::Tracker(_) => GroupChildKind::Tracker,
            Self::Function(_) => GroupChildKind::Function,
            Self::Graph(_) => GroupChildKind::Graph,
        }
    }

    /// Creation-ordered id used as the ordering tiebreak.
    ///
    /// Trackers and functions report their feature id, which both kinds
    /// draw from one sequence.
    pub fn id(&self) -> i64 {
        match self {
            Self::Group(group) => group.id,
            Self::Tracker(display) => display.tracker.feature_id,
            Self::Function(display) => display.function.feature_id,
            Self::Graph(display) => display.graph.id,
        }
    }

    pub fn display_index(&self) -> i32 {
        match self {
            Self::Group(group) => group.display_index,
            Self::Tracker(display) => display.tracker.display_index,
            Self::Function(display) => display.function.display_index,
            Self::Graph(display) => display.graph.display_index,
        }
    }
}

/// Orders by display index ascending, then id descending, keeping the first
/// occurrence of each `(kind, id)`.
pub fn sort_group_children(children: Vec<GroupChild>) -> Vec<GroupChild> {
    let mut seen = HashSet::new();
    let mut unique: Vec<GroupChild> = children
        .into_iter()
        .filter(|child| seen.insert((child.kind(), child.id())))
        .collect();
    unique.sort_by(|a, b| {
        a.display_index()
            .cmp(&b.display_index())
            .then_with(|| b.id().cmp(&a.id()))
    });
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::graph::GraphConfig;

    fn group(id: i64, display_index: i32) -> GroupChild {
        GroupChild::Group(Group {
            id,
            name: format!("g{id}"),
            parent_group_id: Some(0),
            display_index,
            color_index: 0,
        })
    }

    fn graph(id: i64, display_index: i32) -> GroupChild {
        GroupChild::Graph(DisplayGraph {
            graph: GraphOrStat {
                id,
                group_id: 0,
                name: format!("graph{id}"),
                display_index,
                config: GraphConfig::last_value(1),
            },
            validity: Validity::Valid,
        })
    }

    fn order(children: &[GroupChild]) -> Vec<(GroupChildKind, i64)> {
        children.iter().map(|c| (c.kind(), c.id())).collect()
    }

    #[test]
    fn ties_put_newer_ids_first() {
        let sorted = sort_group_children(vec![group(1, 0), graph(7, 1), group(3, 0), graph(2, 0)]);
        assert_eq!(
            order(&sorted),
            vec![
                (GroupChildKind::Group, 3),
                (GroupChildKind::Graph, 2),
                (GroupChildKind::Group, 1),
                (GroupChildKind::Graph, 7),
            ]
        );
    }

    #[test]
    fn duplicates_collapse_per_kind() {
        let sorted = sort_group_children(vec![group(1, 0), group(1, 5), graph(1, 2)]);
        assert_eq!(
            order(&sorted),
            vec![(GroupChildKind::Group, 1), (GroupChildKind::Graph, 1)]
        );
        assert_eq!(sorted[0].display_index(), 0);
    }
}
