//! Group placement: shift-on-insert, child reordering and moves.
//!
//! # Invariants
//! - New children enter at display index 0; existing siblings shift by one.
//! - Reordering only touches children of the named group; omitted children
//!   keep their index.
//! - A group never moves under itself or a descendant, and the root group
//!   never moves.

use super::scope::TxScope;
use super::DataService;
use crate::analysis::would_create_group_cycle;
use crate::error::{CoreError, CoreResult, EntityRef};
use crate::events::ChangeEvent;
use crate::model::{FunctionId, GraphId, GroupId, TrackerId, ROOT_GROUP_ID};
use crate::repo::feature_repo::FeatureRepository;
use crate::repo::function_repo::FunctionRepository;
use crate::repo::graph_repo::GraphRepository;
use crate::repo::group_repo::GroupRepository;
use serde::{Deserialize, Serialize};

/// A child of a group, addressed by its own row id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentRef {
    Group(GroupId),
    Tracker(TrackerId),
    Function(FunctionId),
    Graph(GraphId),
}

/// Makes room at index 0 of `group_id`.
pub(crate) fn shift_for_insert(scope: &TxScope<'_>, group_id: GroupId) -> CoreResult<()> {
    scope.groups().shift_child_indexes(group_id)?;
    Ok(())
}

impl DataService {
    /// Sets each listed child's display index to its position in `order`.
    ///
    /// Children of other groups and unknown ids are skipped without error.
    /// Returns how many children were reindexed.
    pub fn update_group_child_order(
        &self,
        group_id: GroupId,
        order: &[ComponentRef],
    ) -> CoreResult<usize> {
        self.write("update_group_child_order", |scope| {
            scope.require_group(group_id)?;
            let mut changed = 0usize;
            for (index, child) in order.iter().enumerate() {
                let display_index = i32::try_from(index).map_err(|_| {
                    CoreError::InvalidArgument("order list is too long".to_string())
                })?;
                if reindex_child(scope, group_id, *child, display_index)? {
                    changed += 1;
                }
            }
            if changed > 0 {
                scope.record(ChangeEvent::DisplayIndexChanged(group_id));
            }
            Ok(changed)
        })
    }

    /// Moves a tracker, function, graph or group into `to_group_id`.
    ///
    /// The component keeps its display index.
    pub fn move_component(&self, component: ComponentRef, to_group_id: GroupId) -> CoreResult<()> {
        self.write("move_component", |scope| {
            scope.require_group(to_group_id)?;
            match component {
                ComponentRef::Group(group_id) => move_group(scope, group_id, to_group_id),
                ComponentRef::Tracker(tracker_id) => {
                    let tracker = scope.require_tracker(tracker_id)?;
                    let mut feature = tracker.feature();
                    feature.group_id = to_group_id;
                    scope.features().update_feature(&feature)?;
                    scope.record(ChangeEvent::TrackerUpdated(tracker.feature_id));
                    Ok(())
                }
                ComponentRef::Function(function_id) => {
                    let function = scope.require_function(function_id)?;
                    let features = scope.features();
                    let Some(mut feature) = features.get_feature(function.feature_id)? else {
                        return Err(CoreError::NotFound(EntityRef::Feature(function.feature_id)));
                    };
                    feature.group_id = to_group_id;
                    features.update_feature(&feature)?;
                    scope.record(ChangeEvent::FunctionUpdated(function.feature_id));
                    Ok(())
                }
                ComponentRef::Graph(graph_id) => {
                    let mut graph = scope.require_graph(graph_id)?;
                    graph.group_id = to_group_id;
                    scope.graphs().update_graph(&graph)?;
                    scope.record(ChangeEvent::GraphUpdated(graph_id));
                    Ok(())
                }
            }
        })
    }
}

fn move_group(scope: &mut TxScope<'_>, group_id: GroupId, to_group_id: GroupId) -> CoreResult<()> {
    if group_id == ROOT_GROUP_ID {
        return Err(CoreError::InvalidArgument(
            "the root group cannot be moved".to_string(),
        ));
    }
    let mut group = scope.require_group(group_id)?;
    let groups = scope.groups();
    let cyclic = would_create_group_cycle(group_id, to_group_id, |id| {
        Ok::<_, CoreError>(groups.get_group(id)?.and_then(|g| g.parent_group_id))
    })?;
    if cyclic {
        return Err(CoreError::CyclicMove {
            group_id,
            target_parent_id: to_group_id,
        });
    }
    group.parent_group_id = Some(to_group_id);
    groups.update_group(&group)?;
    scope.record(ChangeEvent::GroupUpdated(group_id));
    Ok(())
}

fn reindex_child(
    scope: &TxScope<'_>,
    group_id: GroupId,
    child: ComponentRef,
    display_index: i32,
) -> CoreResult<bool> {
    match child {
        ComponentRef::Group(id) => {
            let groups = scope.groups();
            match groups.get_group(id)? {
                Some(group) if id != ROOT_GROUP_ID && group.parent_group_id == Some(group_id) => {
                    Ok(groups.set_display_index(id, display_index)?)
                }
                _ => Ok(false),
            }
        }
        ComponentRef::Tracker(id) => {
            let features = scope.features();
            match features.get_tracker(id)? {
                Some(tracker) if tracker.group_id == group_id => {
                    Ok(features.set_display_index(tracker.feature_id, display_index)?)
                }
                _ => Ok(false),
            }
        }
        ComponentRef::Function(id) => {
            match scope.functions().get_function(id)? {
                Some(function) if function.group_id == group_id => Ok(scope
                    .features()
                    .set_display_index(function.feature_id, display_index)?),
                _ => Ok(false),
            }
        }
        ComponentRef::Graph(id) => {
            let graphs = scope.graphs();
            match graphs.get_graph(id)? {
                Some(graph) if graph.group_id == group_id => {
                    Ok(graphs.set_display_index(id, display_index)?)
                }
                _ => Ok(false),
            }
        }
    }
}
