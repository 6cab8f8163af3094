//! Feature dependency graph and the queries built on it.
//!
//! # Responsibility
//! - Hold function input edges in both directions.
//! - Compute dependencies, dependents, dependent graphs, orphaned graphs,
//!   cycle checks and validity.
//!
//! # Invariants
//! - `dependencies_of(x)` and `dependents_of(x)` always contain `x`.
//! - `y ∈ dependents_of(x)` exactly when `x ∈ dependencies_of(y)`.
//! - A feature is resolvable when it is a tracker, or a function with no
//!   inputs or with at least one resolvable input. Dangling input ids are
//!   never resolvable.

use super::reachability::reachable_from;
use crate::model::validity::{InvalidConfiguration, Validity};
use crate::model::{FeatureId, GraphId};
use crate::repo::dependency_repo::load_dependency_snapshot;
use crate::repo::RepoResult;
use log::warn;
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Which variant a feature id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Tracker,
    Function,
}

/// Dependency-relevant state read from the entity store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencySnapshot {
    pub features: BTreeMap<FeatureId, FeatureKind>,
    /// Function feature id to its declared input feature ids.
    pub function_inputs: BTreeMap<FeatureId, Vec<FeatureId>>,
    /// Graph id to the feature ids its config references.
    pub graph_references: BTreeMap<GraphId, BTreeSet<FeatureId>>,
}

impl DependencySnapshot {
    pub fn with_tracker(mut self, feature_id: FeatureId) -> Self {
        self.features.insert(feature_id, FeatureKind::Tracker);
        self
    }

    pub fn with_function(mut self, feature_id: FeatureId, inputs: &[FeatureId]) -> Self {
        self.features.insert(feature_id, FeatureKind::Function);
        self.function_inputs.insert(feature_id, inputs.to_vec());
        self
    }

    pub fn with_graph(mut self, graph_id: GraphId, references: &[FeatureId]) -> Self {
        self.graph_references
            .insert(graph_id, references.iter().copied().collect());
        self
    }
}

/// In-memory dependency graph built from one snapshot.
///
/// Built fresh for every question; nothing is cached across mutations.
#[derive(Debug, Clone)]
pub struct DependencyAnalyser {
    snapshot: DependencySnapshot,
    dependents: HashMap<FeatureId, Vec<FeatureId>>,
}

impl DependencyAnalyser {
    pub fn new(snapshot: DependencySnapshot) -> Self {
        let mut dependents: HashMap<FeatureId, Vec<FeatureId>> = HashMap::new();
        for (function_id, inputs) in &snapshot.function_inputs {
            for input in inputs {
                dependents.entry(*input).or_default().push(*function_id);
            }
        }
        Self {
            snapshot,
            dependents,
        }
    }

    /// Loads a snapshot from `conn` and builds the analyser.
    pub fn load(conn: &Connection) -> RepoResult<Self> {
        Ok(Self::new(load_dependency_snapshot(conn)?))
    }

    pub fn snapshot(&self) -> &DependencySnapshot {
        &self.snapshot
    }

    pub fn contains_feature(&self, feature_id: FeatureId) -> bool {
        self.snapshot.features.contains_key(&feature_id)
    }

    pub fn feature_kind(&self, feature_id: FeatureId) -> Option<FeatureKind> {
        self.snapshot.features.get(&feature_id).copied()
    }

    fn inputs_of(&self, feature_id: FeatureId) -> &[FeatureId] {
        self.snapshot
            .function_inputs
            .get(&feature_id)
            .map_or(&[], Vec::as_slice)
    }

    /// Features `feature_id` reads from, transitively, including itself.
    pub fn dependencies_of(&self, feature_id: FeatureId) -> BTreeSet<FeatureId> {
        let reach = reachable_from(feature_id, |id| self.inputs_of(id).to_vec());
        if reach.returned_to_start {
            warn!(
                "event=dependency_cycle module=analysis status=warn direction=dependencies feature_id={feature_id}"
            );
        }
        reach.visited
    }

    /// Features that read `feature_id`, transitively, including itself.
    pub fn dependents_of(&self, feature_id: FeatureId) -> BTreeSet<FeatureId> {
        let reach = reachable_from(feature_id, |id| {
            self.dependents.get(&id).cloned().unwrap_or_default()
        });
        if reach.returned_to_start {
            warn!(
                "event=dependency_cycle module=analysis status=warn direction=dependents feature_id={feature_id}"
            );
        }
        reach.visited
    }

    /// Functions listing `feature_id` as a direct input.
    pub fn direct_dependents_of(&self, feature_id: FeatureId) -> BTreeSet<FeatureId> {
        self.dependents
            .get(&feature_id)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Graphs reading `feature_id` directly or through functions.
    pub fn dependent_graphs(&self, feature_id: FeatureId) -> BTreeSet<GraphId> {
        let affected = self.dependents_of(feature_id);
        self.snapshot
            .graph_references
            .iter()
            .filter(|(_, references)| references.iter().any(|id| affected.contains(id)))
            .map(|(graph_id, _)| *graph_id)
            .collect()
    }

    /// Union of [`Self::dependent_graphs`] over several features.
    pub fn dependent_graphs_of_all(
        &self,
        feature_ids: impl IntoIterator<Item = FeatureId>,
    ) -> BTreeSet<GraphId> {
        feature_ids
            .into_iter()
            .flat_map(|id| self.dependent_graphs(id))
            .collect()
    }

    /// Graphs none of whose referenced features resolve, including graphs
    /// that reference nothing.
    pub fn orphaned_graphs(&self) -> BTreeSet<GraphId> {
        let resolvable = self.resolvable_features();
        self.snapshot
            .graph_references
            .iter()
            .filter(|(_, references)| !references.iter().any(|id| resolvable.contains(id)))
            .map(|(graph_id, _)| *graph_id)
            .collect()
    }

    /// Whether giving `function_feature_id` the inputs `candidate_inputs`
    /// closes a path back to itself.
    pub fn would_create_cycle(
        &self,
        function_feature_id: FeatureId,
        candidate_inputs: &[FeatureId],
    ) -> bool {
        !self
            .cyclic_inputs(function_feature_id, candidate_inputs)
            .is_empty()
    }

    /// Candidate inputs that already depend on `function_feature_id`.
    pub fn cyclic_inputs(
        &self,
        function_feature_id: FeatureId,
        candidate_inputs: &[FeatureId],
    ) -> Vec<FeatureId> {
        let mut offending: Vec<FeatureId> = candidate_inputs
            .iter()
            .copied()
            .filter(|input| self.dependencies_of(*input).contains(&function_feature_id))
            .collect();
        offending.sort_unstable();
        offending.dedup();
        offending
    }

    /// Least fixpoint of the resolvability rule over all features.
    pub fn resolvable_features(&self) -> HashSet<FeatureId> {
        let mut resolvable: HashSet<FeatureId> = self
            .snapshot
            .features
            .iter()
            .filter(|(id, kind)| match kind {
                FeatureKind::Tracker => true,
                FeatureKind::Function => self.inputs_of(**id).is_empty(),
            })
            .map(|(id, _)| *id)
            .collect();
        loop {
            let newly: Vec<FeatureId> = self
                .snapshot
                .function_inputs
                .iter()
                .filter(|(id, inputs)| {
                    !resolvable.contains(*id)
                        && self.snapshot.features.contains_key(*id)
                        && inputs.iter().any(|input| resolvable.contains(input))
                })
                .map(|(id, _)| *id)
                .collect();
            if newly.is_empty() {
                return resolvable;
            }
            resolvable.extend(newly);
        }
    }

    /// Validity of one function; missing functions report themselves missing.
    pub fn function_validity(&self, feature_id: FeatureId) -> Validity {
        if !self.contains_feature(feature_id) {
            return Validity::Invalid(InvalidConfiguration {
                missing_feature_ids: BTreeSet::from([feature_id]),
                unresolved_feature_ids: BTreeSet::new(),
            });
        }
        let resolvable = self.resolvable_features();
        if resolvable.contains(&feature_id) {
            return Validity::Valid;
        }
        self.classify(self.inputs_of(feature_id).iter().copied(), &resolvable)
    }

    /// Validity of a graph reading `references`: every reference must
    /// resolve.
    pub fn references_validity(&self, references: &BTreeSet<FeatureId>) -> Validity {
        let resolvable = self.resolvable_features();
        if !references.is_empty() && references.iter().all(|id| resolvable.contains(id)) {
            return Validity::Valid;
        }
        self.classify(references.iter().copied(), &resolvable)
    }

    /// Validity of a stored graph, by id.
    pub fn graph_validity(&self, graph_id: GraphId) -> Validity {
        match self.snapshot.graph_references.get(&graph_id) {
            Some(references) => self.references_validity(references),
            None => Validity::Invalid(InvalidConfiguration::default()),
        }
    }

    fn classify(
        &self,
        ids: impl Iterator<Item = FeatureId>,
        resolvable: &HashSet<FeatureId>,
    ) -> Validity {
        let mut config = InvalidConfiguration::default();
        for id in ids {
            if !self.contains_feature(id) {
                config.missing_feature_ids.insert(id);
            } else if !resolvable.contains(&id) {
                config.unresolved_feature_ids.insert(id);
            }
        }
        Validity::Invalid(config)
    }
}
