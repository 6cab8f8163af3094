//! Live, ordered listing of one group's children.

use super::composer::ChildComposer;
use super::group_child::{DisplayFunction, DisplayGraph, GroupChild};
use super::refresh::RefreshPlan;
use crate::error::{CoreError, CoreResult};
use crate::events::ChangeSubscription;
use crate::model::{GraphId, GroupId};
use crate::service::DataService;
use log::debug;

/// Keeps a sorted child list of one group current by reacting to change
/// events.
pub struct GroupView<'a> {
    service: &'a DataService,
    subscription: ChangeSubscription,
    group_id: Option<GroupId>,
    composer: ChildComposer,
    children: Option<Vec<GroupChild>>,
}

impl<'a> GroupView<'a> {
    /// Subscribes to `service`; no group is shown until [`GroupView::set_group`].
    pub fn new(service: &'a DataService) -> Self {
        Self {
            subscription: service.subscribe(),
            service,
            group_id: None,
            composer: ChildComposer::new(),
            children: None,
        }
    }

    pub fn group_id(&self) -> Option<GroupId> {
        self.group_id
    }

    /// Latest merged list; `None` before the first complete load.
    pub fn children(&self) -> Option<&[GroupChild]> {
        self.children.as_deref()
    }

    /// Switches to `group_id` and loads all three slices.
    ///
    /// Events buffered before the switch are discarded; the full load
    /// already reflects them.
    pub fn set_group(&mut self, group_id: GroupId) -> CoreResult<Option<&[GroupChild]>> {
        self.service.get_group(group_id)?;
        self.subscription.drain();
        self.group_id = Some(group_id);
        self.composer.reset();
        self.children = None;
        self.apply(group_id, RefreshPlan::full())?;
        Ok(self.children())
    }

    /// Applies every pending event. Returns the new list when anything was
    /// reloaded.
    pub fn poll(&mut self) -> CoreResult<Option<&[GroupChild]>> {
        let Some(group_id) = self.group_id else {
            self.subscription.drain();
            return Ok(None);
        };
        let plan: RefreshPlan = self.subscription.drain().into_iter().collect();
        if plan.is_empty() {
            return Ok(None);
        }
        self.apply(group_id, plan)?;
        Ok(self.children())
    }

    fn apply(&mut self, group_id: GroupId, plan: RefreshPlan) -> CoreResult<()> {
        debug!(
            "event=group_view_refresh module=display status=start group_id={group_id} groups={} features={} all_graphs={} graphs={} removed={}",
            plan.groups,
            plan.features,
            plan.all_graphs,
            plan.graphs.len(),
            plan.removed_graphs.len()
        );
        let mut merged = None;
        if plan.groups {
            merged = self
                .composer
                .set_groups(self.service.list_child_groups(group_id)?);
        }
        if plan.features {
            merged = self.composer.set_features(
                self.service.list_display_trackers_for_group(group_id)?,
                self.load_functions(group_id)?,
            );
        }
        if plan.all_graphs {
            merged = self.composer.set_graphs(self.load_graphs(group_id)?);
        }
        for graph_id in &plan.graphs {
            merged = match self.load_graph(group_id, *graph_id)? {
                Some(graph) => self.composer.upsert_graph(graph),
                None => self.composer.remove_graph(*graph_id),
            };
        }
        for graph_id in &plan.removed_graphs {
            merged = self.composer.remove_graph(*graph_id);
        }
        if merged.is_some() {
            self.children = merged;
        }
        Ok(())
    }

    fn load_functions(&self, group_id: GroupId) -> CoreResult<Vec<DisplayFunction>> {
        let analyser = self.service.dependency_analyser()?;
        Ok(self
            .service
            .list_functions_for_group(group_id)?
            .into_iter()
            .map(|function| DisplayFunction {
                validity: analyser.function_validity(function.feature_id),
                function,
            })
            .collect())
    }

    fn load_graphs(&self, group_id: GroupId) -> CoreResult<Vec<DisplayGraph>> {
        let analyser = self.service.dependency_analyser()?;
        Ok(self
            .service
            .list_graphs_for_group(group_id)?
            .into_iter()
            .map(|graph| DisplayGraph {
                validity: analyser.graph_validity(graph.id),
                graph,
            })
            .collect())
    }

    /// The graph if it still exists inside `group_id`.
    fn load_graph(&self, group_id: GroupId, graph_id: GraphId) -> CoreResult<Option<DisplayGraph>> {
        let graph = match self.service.get_graph(graph_id) {
            Ok(graph) if graph.group_id == group_id => graph,
            Ok(_) | Err(CoreError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(err),
        };
        Ok(Some(DisplayGraph {
            validity: self.service.graph_validity(graph_id)?,
            graph,
        }))
    }
}
