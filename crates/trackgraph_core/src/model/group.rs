//! Group hierarchy domain model.
//!
//! # Invariants
//! - Parent links form a tree rooted at `ROOT_GROUP_ID`.
//! - Only the root group has `parent_group_id == None`.

use super::{FeatureId, GraphId, GroupId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub parent_group_id: Option<GroupId>,
    pub display_index: i32,
    pub color_index: i32,
}

/// Request to create one group. A missing parent means the root group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCreateRequest {
    pub name: String,
    pub parent_group_id: Option<GroupId>,
    #[serde(default)]
    pub color_index: i32,
}

impl GroupCreateRequest {
    pub fn new(name: impl Into<String>, parent_group_id: Option<GroupId>) -> Self {
        Self {
            name: name.into(),
            parent_group_id,
            color_index: 0,
        }
    }
}

/// Partial group update; `None` fields keep their stored value.
///
/// Re-parenting goes through `DataService::move_component`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupUpdateRequest {
    pub id: GroupId,
    pub name: Option<String>,
    pub color_index: Option<i32>,
}

/// Everything removed by one group delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedGroupInfo {
    pub group_id: GroupId,
    /// The group itself and all descendant groups.
    pub deleted_group_ids: Vec<GroupId>,
    pub deleted_feature_ids: Vec<FeatureId>,
    /// Graphs owned by the subtree plus graphs orphaned by the feature loss.
    pub deleted_graph_ids: Vec<GraphId>,
}

/// Snapshot of the whole group hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupTree {
    groups: BTreeMap<GroupId, Group>,
    children: BTreeMap<GroupId, Vec<GroupId>>,
}

impl GroupTree {
    /// Builds the tree from a flat list, ordering siblings by display index.
    pub fn from_groups(groups: Vec<Group>) -> Self {
        let mut children: BTreeMap<GroupId, Vec<GroupId>> = BTreeMap::new();
        let mut by_id = BTreeMap::new();
        for group in groups {
            if let Some(parent) = group.parent_group_id {
                children.entry(parent).or_default().push(group.id);
            }
            by_id.insert(group.id, group);
        }
        for ids in children.values_mut() {
            ids.sort_by_key(|id| {
                let index = by_id.get(id).map_or(i32::MAX, |group: &Group| group.display_index);
                (index, std::cmp::Reverse(*id))
            });
        }
        Self {
            groups: by_id,
            children,
        }
    }

    pub fn get(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn children_of(&self, id: GroupId) -> &[GroupId] {
        self.children.get(&id).map_or(&[], Vec::as_slice)
    }

    /// `id` and every group below it, parents before children.
    pub fn subtree(&self, id: GroupId) -> Vec<GroupId> {
        let mut out = Vec::new();
        if !self.groups.contains_key(&id) {
            return out;
        }
        let mut queue = std::collections::VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            if out.contains(&current) {
                continue;
            }
            out.push(current);
            queue.extend(self.children_of(current).iter().copied());
        }
        out
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
