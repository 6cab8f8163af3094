//! Function mutations and dependency queries.
//!
//! # Invariants
//! - A stored function's inputs equal the feature nodes of its graph.
//! - No write leaves a function depending on itself, directly or through
//!   other functions.

use super::cascade::delete_features;
use super::ordering::shift_for_insert;
use super::scope::{normalize_name, TxScope};
use super::DataService;
use crate::analysis::DependencyAnalyser;
use crate::error::{CoreError, CoreResult, EntityRef};
use crate::events::ChangeEvent;
use crate::model::function::{dedup_inputs, Function, FunctionCreateRequest, FunctionUpdateRequest};
use crate::model::function_graph::{FunctionGraph, FunctionGraphError};
use crate::model::validity::Validity;
use crate::model::{FeatureId, FunctionId, GraphId, GroupId};
use crate::repo::feature_repo::FeatureRepository;
use crate::repo::function_repo::FunctionRepository;
use std::collections::BTreeSet;

impl DataService {
    /// Creates a function at display index 0 of its group.
    ///
    /// # Errors
    /// - `InvalidArgument` for a blank name or when the graph's feature nodes
    ///   differ from the declared inputs.
    /// - `CyclicFunctionGraph` when node dependencies loop.
    /// - `NotFound` for a missing group or input feature.
    pub fn create_function(&self, request: &FunctionCreateRequest) -> CoreResult<Function> {
        let name = normalize_name(&request.name)?;
        let inputs = checked_inputs(&request.function_graph, &request.input_feature_ids)?;
        self.write("create_function", |scope| {
            scope.require_group(request.group_id)?;
            require_inputs_exist(&scope.analyser()?, &inputs)?;
            insert_function(
                scope,
                &name,
                request.group_id,
                &request.description,
                &request.function_graph,
                &inputs,
            )
        })
    }

    /// Applies the `Some` fields of `request`.
    ///
    /// # Errors
    /// - `CyclicDependency` when a new input already depends on this function.
    /// - `InvalidArgument` when only one of graph and inputs is given.
    pub fn update_function(&self, request: &FunctionUpdateRequest) -> CoreResult<Function> {
        let name = request.name.as_deref().map(normalize_name).transpose()?;
        let rewired = match (&request.function_graph, &request.input_feature_ids) {
            (Some(graph), Some(inputs)) => Some((graph, checked_inputs(graph, inputs)?)),
            (None, None) => None,
            _ => {
                return Err(CoreError::InvalidArgument(
                    "function_graph and input_feature_ids must be updated together".to_string(),
                ))
            }
        };

        self.write("update_function", |scope| {
            let mut function = scope.require_function(request.id)?;
            if let Some((graph, inputs)) = &rewired {
                let analyser = scope.analyser()?;
                require_inputs_exist(&analyser, inputs)?;
                let offending = analyser.cyclic_inputs(function.feature_id, inputs);
                if !offending.is_empty() {
                    return Err(CoreError::CyclicDependency {
                        function_feature_id: function.feature_id,
                        offending_input_ids: offending,
                    });
                }
                function.function_graph = (*graph).clone();
                function.input_feature_ids = inputs.clone();
            }
            if let Some(name) = name {
                function.name = name;
            }
            if let Some(description) = &request.description {
                function.description.clone_from(description);
            }

            let features = scope.features();
            let Some(mut feature) = features.get_feature(function.feature_id)? else {
                return Err(CoreError::NotFound(EntityRef::Feature(function.feature_id)));
            };
            feature.name.clone_from(&function.name);
            feature.description.clone_from(&function.description);
            features.update_feature(&feature)?;
            scope.functions().update_function(
                function.id,
                &function.function_graph,
                &function.input_feature_ids,
            )?;
            scope.record(ChangeEvent::FunctionUpdated(function.feature_id));
            scope.require_function(function.id)
        })
    }

    /// Copies a function, into `to_group_id` when given, else beside the
    /// original.
    pub fn duplicate_function(
        &self,
        id: FunctionId,
        to_group_id: Option<GroupId>,
    ) -> CoreResult<Function> {
        self.write("duplicate_function", |scope| {
            let original = scope.require_function(id)?;
            let group_id = to_group_id.unwrap_or(original.group_id);
            scope.require_group(group_id)?;
            insert_function(
                scope,
                &original.name,
                group_id,
                &original.description,
                &original.function_graph,
                &original.input_feature_ids,
            )
        })
    }

    /// Deletes the function and cleans up the graphs and functions reading it.
    ///
    /// Returns the ids of graphs deleted as a consequence.
    pub fn delete_function(&self, id: FunctionId) -> CoreResult<Vec<GraphId>> {
        self.write("delete_function", |scope| {
            let function = scope.require_function(id)?;
            delete_features(scope, &[function.feature_id])
        })
    }

    pub fn get_function(&self, id: FunctionId) -> CoreResult<Function> {
        self.read(|scope| scope.require_function(id))
    }

    pub fn get_function_by_feature_id(&self, feature_id: FeatureId) -> CoreResult<Function> {
        self.read(|scope| {
            scope
                .functions()
                .get_function_by_feature_id(feature_id)?
                .ok_or(CoreError::NotFound(EntityRef::Feature(feature_id)))
        })
    }

    pub fn list_functions_for_group(&self, group_id: GroupId) -> CoreResult<Vec<Function>> {
        self.read(|scope| Ok(scope.functions().list_functions_for_group(group_id)?))
    }

    pub fn list_all_functions(&self) -> CoreResult<Vec<Function>> {
        self.read(|scope| Ok(scope.functions().list_all_functions()?))
    }

    /// Whether the function can currently be evaluated.
    pub fn function_validity(&self, id: FunctionId) -> CoreResult<Validity> {
        self.read(|scope| {
            let function = scope.require_function(id)?;
            Ok(scope.analyser()?.function_validity(function.feature_id))
        })
    }

    /// Features whose value transitively reads `feature_id`, excluding itself.
    pub fn features_depending_on(&self, feature_id: FeatureId) -> CoreResult<BTreeSet<FeatureId>> {
        self.with_feature_analyser(feature_id, |analyser| {
            let mut dependents = analyser.dependents_of(feature_id);
            dependents.remove(&feature_id);
            dependents
        })
    }

    /// Features `feature_id` transitively reads, including itself.
    pub fn dependencies_of(&self, feature_id: FeatureId) -> CoreResult<BTreeSet<FeatureId>> {
        self.with_feature_analyser(feature_id, |analyser| analyser.dependencies_of(feature_id))
    }

    /// Graphs affected by a change to `feature_id`.
    pub fn dependent_graphs(&self, feature_id: FeatureId) -> CoreResult<BTreeSet<GraphId>> {
        self.with_feature_analyser(feature_id, |analyser| analyser.dependent_graphs(feature_id))
    }

    /// Whether giving `function_feature_id` the inputs `candidate_inputs`
    /// would close a dependency cycle.
    pub fn would_create_cycle(
        &self,
        function_feature_id: FeatureId,
        candidate_inputs: &[FeatureId],
    ) -> CoreResult<bool> {
        self.read(|scope| {
            Ok(scope
                .analyser()?
                .would_create_cycle(function_feature_id, candidate_inputs))
        })
    }

    /// Analyser over the current committed state.
    pub fn dependency_analyser(&self) -> CoreResult<DependencyAnalyser> {
        self.read(|scope| scope.analyser())
    }

    fn with_feature_analyser<T>(
        &self,
        feature_id: FeatureId,
        query: impl FnOnce(&DependencyAnalyser) -> T,
    ) -> CoreResult<T> {
        self.read(|scope| {
            let analyser = scope.analyser()?;
            if !analyser.contains_feature(feature_id) {
                return Err(CoreError::NotFound(EntityRef::Feature(feature_id)));
            }
            Ok(query(&analyser))
        })
    }
}

fn insert_function(
    scope: &mut TxScope<'_>,
    name: &str,
    group_id: GroupId,
    description: &str,
    graph: &FunctionGraph,
    inputs: &[FeatureId],
) -> CoreResult<Function> {
    shift_for_insert(scope, group_id)?;
    let feature_id = scope
        .features()
        .insert_feature(name, group_id, 0, description)?;
    let function_id = scope
        .functions()
        .insert_function(feature_id, graph, inputs)?;
    let function = scope.require_function(function_id)?;
    scope.record(ChangeEvent::FunctionCreated(feature_id));
    Ok(function)
}

/// Validates the node graph against the declared inputs and returns the
/// deduplicated input list.
fn checked_inputs(graph: &FunctionGraph, declared: &[FeatureId]) -> CoreResult<Vec<FeatureId>> {
    let inputs = dedup_inputs(declared);
    let declared_set: BTreeSet<FeatureId> = inputs.iter().copied().collect();
    if graph.feature_node_ids() != declared_set {
        return Err(CoreError::InvalidArgument(
            "feature nodes of the function graph must match input_feature_ids".to_string(),
        ));
    }
    graph.validate_acyclic().map_err(|err| match err {
        FunctionGraphError::Cycle { node_id } => CoreError::CyclicFunctionGraph { node_id },
        FunctionGraphError::DuplicateNodeId { .. } => CoreError::InvalidArgument(err.to_string()),
    })?;
    Ok(inputs)
}

fn require_inputs_exist(analyser: &DependencyAnalyser, inputs: &[FeatureId]) -> CoreResult<()> {
    match inputs.iter().find(|id| !analyser.contains_feature(**id)) {
        Some(missing) => Err(CoreError::NotFound(EntityRef::Feature(*missing))),
        None => Ok(()),
    }
}
