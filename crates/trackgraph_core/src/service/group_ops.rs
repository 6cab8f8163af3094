//! Group mutations and hierarchy queries.
//!
//! # Invariants
//! - The root group always exists; it can be renamed but never deleted.
//! - Deleting a group removes its whole subtree, the graphs it owns and its
//!   features, then cleans up graphs elsewhere that read those features.

use super::cascade::delete_features;
use super::ordering::shift_for_insert;
use super::scope::normalize_name;
use super::DataService;
use crate::error::{CoreError, CoreResult};
use crate::events::ChangeEvent;
use crate::model::group::{DeletedGroupInfo, Group, GroupCreateRequest, GroupTree, GroupUpdateRequest};
use crate::model::{GroupId, ROOT_GROUP_ID};
use crate::repo::feature_repo::FeatureRepository;
use crate::repo::graph_repo::GraphRepository;
use crate::repo::group_repo::GroupRepository;
use log::debug;

impl DataService {
    /// Creates a group at display index 0 of its parent (the root when
    /// `parent_group_id` is `None`).
    pub fn create_group(&self, request: &GroupCreateRequest) -> CoreResult<Group> {
        let name = normalize_name(&request.name)?;
        let parent_id = request.parent_group_id.unwrap_or(ROOT_GROUP_ID);
        self.write("create_group", |scope| {
            scope.require_group(parent_id)?;
            shift_for_insert(scope, parent_id)?;
            let id = scope
                .groups()
                .insert_group(&name, parent_id, 0, request.color_index)?;
            let group = scope.require_group(id)?;
            scope.record(ChangeEvent::GroupCreated(id));
            Ok(group)
        })
    }

    pub fn update_group(&self, request: &GroupUpdateRequest) -> CoreResult<Group> {
        let name = request.name.as_deref().map(normalize_name).transpose()?;
        self.write("update_group", |scope| {
            let mut group = scope.require_group(request.id)?;
            if let Some(name) = name {
                group.name = name;
            }
            if let Some(color_index) = request.color_index {
                group.color_index = color_index;
            }
            scope.groups().update_group(&group)?;
            scope.record(ChangeEvent::GroupUpdated(group.id));
            Ok(group)
        })
    }

    /// Deletes `id` with everything below it.
    ///
    /// # Errors
    /// - `InvalidArgument` for the root group.
    /// - `NotFound` when the group does not exist.
    pub fn delete_group(&self, id: GroupId) -> CoreResult<DeletedGroupInfo> {
        if id == ROOT_GROUP_ID {
            return Err(CoreError::InvalidArgument(
                "the root group cannot be deleted".to_string(),
            ));
        }
        self.write("delete_group", |scope| {
            scope.require_group(id)?;
            let groups = scope.groups();
            let subtree = groups.subtree_ids(id)?;

            let graphs = scope.graphs();
            let mut deleted_graph_ids = Vec::new();
            for graph_id in graphs.list_graph_ids_in_groups(&subtree)? {
                if graphs.delete_graph(graph_id)? {
                    scope.record(ChangeEvent::GraphDeleted(graph_id));
                    deleted_graph_ids.push(graph_id);
                }
            }

            let deleted_feature_ids = scope.features().list_feature_ids_in_groups(&subtree)?;
            let orphaned = delete_features(scope, &deleted_feature_ids)?;
            deleted_graph_ids.extend(orphaned);

            groups.delete_groups(&subtree)?;
            for group_id in &subtree {
                scope.record(ChangeEvent::GroupDeleted(*group_id));
            }
            debug!(
                "event=group_delete module=service status=ok group_id={id} groups={} features={} graphs={}",
                subtree.len(),
                deleted_feature_ids.len(),
                deleted_graph_ids.len()
            );
            Ok(DeletedGroupInfo {
                group_id: id,
                deleted_group_ids: subtree,
                deleted_feature_ids,
                deleted_graph_ids,
            })
        })
    }

    pub fn get_group(&self, id: GroupId) -> CoreResult<Group> {
        self.read(|scope| scope.require_group(id))
    }

    /// Direct child groups ordered by display index, newest first on ties.
    pub fn list_child_groups(&self, parent_id: GroupId) -> CoreResult<Vec<Group>> {
        self.read(|scope| Ok(scope.groups().list_child_groups(parent_id)?))
    }

    pub fn list_all_groups(&self) -> CoreResult<Vec<Group>> {
        self.read(|scope| Ok(scope.groups().list_all_groups()?))
    }

    pub fn group_tree(&self) -> CoreResult<GroupTree> {
        Ok(GroupTree::from_groups(self.list_all_groups()?))
    }
}
