//! Graph/stat mutations and queries.

use super::ordering::shift_for_insert;
use super::scope::{normalize_name, TxScope};
use super::DataService;
use crate::error::{CoreError, CoreResult, EntityRef};
use crate::events::ChangeEvent;
use crate::model::graph::{GraphConfig, GraphCreateRequest, GraphOrStat, GraphUpdateRequest};
use crate::model::validity::Validity;
use crate::model::{GraphId, GroupId};
use crate::repo::graph_repo::GraphRepository;

impl DataService {
    /// Creates a graph at display index 0 of its group.
    ///
    /// # Errors
    /// - `InvalidArgument` for a blank name or a config reading no feature.
    /// - `NotFound` for a missing group or referenced feature.
    pub fn create_graph(&self, request: &GraphCreateRequest) -> CoreResult<GraphOrStat> {
        let name = normalize_name(&request.name)?;
        self.write("create_graph", |scope| {
            scope.require_group(request.group_id)?;
            require_references(scope, &request.config)?;
            insert_graph(scope, request.group_id, &name, &request.config)
        })
    }

    /// Renames and/or reconfigures a graph. The kind cannot change.
    pub fn update_graph(&self, request: &GraphUpdateRequest) -> CoreResult<GraphOrStat> {
        let name = request.name.as_deref().map(normalize_name).transpose()?;
        self.write("update_graph", |scope| {
            let mut graph = scope.require_graph(request.id)?;
            if let Some(config) = &request.config {
                if config.kind() != graph.config.kind() {
                    return Err(CoreError::InvalidArgument(format!(
                        "graph {} is a {}; cannot change it to {}",
                        graph.id,
                        graph.config.kind().as_str(),
                        config.kind().as_str()
                    )));
                }
                require_references(scope, config)?;
                graph.config = config.clone();
            }
            if let Some(name) = name {
                graph.name = name;
            }
            scope.graphs().update_graph(&graph)?;
            scope.record(ChangeEvent::GraphUpdated(graph.id));
            Ok(graph)
        })
    }

    /// Copies a graph next to the original, at display index 0.
    pub fn duplicate_graph(&self, id: GraphId) -> CoreResult<GraphOrStat> {
        self.write("duplicate_graph", |scope| {
            let original = scope.require_graph(id)?;
            insert_graph(scope, original.group_id, &original.name, &original.config)
        })
    }

    pub fn delete_graph(&self, id: GraphId) -> CoreResult<()> {
        self.write("delete_graph", |scope| {
            scope.require_graph(id)?;
            scope.graphs().delete_graph(id)?;
            scope.record(ChangeEvent::GraphDeleted(id));
            Ok(())
        })
    }

    pub fn get_graph(&self, id: GraphId) -> CoreResult<GraphOrStat> {
        self.read(|scope| scope.require_graph(id))
    }

    pub fn list_graphs_for_group(&self, group_id: GroupId) -> CoreResult<Vec<GraphOrStat>> {
        self.read(|scope| Ok(scope.graphs().list_graphs_for_group(group_id)?))
    }

    pub fn list_all_graphs(&self) -> CoreResult<Vec<GraphOrStat>> {
        self.read(|scope| Ok(scope.graphs().list_all_graphs()?))
    }

    /// Whether every feature the graph reads currently resolves.
    pub fn graph_validity(&self, id: GraphId) -> CoreResult<Validity> {
        self.read(|scope| {
            scope.require_graph(id)?;
            Ok(scope.analyser()?.graph_validity(id))
        })
    }
}

fn insert_graph(
    scope: &mut TxScope<'_>,
    group_id: GroupId,
    name: &str,
    config: &GraphConfig,
) -> CoreResult<GraphOrStat> {
    shift_for_insert(scope, group_id)?;
    let id = scope.graphs().insert_graph(group_id, name, 0, config)?;
    let graph = scope.require_graph(id)?;
    scope.record(ChangeEvent::GraphCreated(id));
    Ok(graph)
}

fn require_references(scope: &TxScope<'_>, config: &GraphConfig) -> CoreResult<()> {
    let references = config.referenced_feature_ids();
    if references.is_empty() {
        return Err(CoreError::InvalidArgument(
            "a graph must read at least one feature".to_string(),
        ));
    }
    let analyser = scope.analyser()?;
    match references.iter().find(|id| !analyser.contains_feature(**id)) {
        Some(missing) => Err(CoreError::NotFound(EntityRef::Feature(*missing))),
        None => Ok(()),
    }
}
