//! Function (derived feature) domain model.
//!
//! # Invariants
//! - `input_feature_ids` is ordered by first appearance and free of
//!   duplicates; it equals the feature node set of `function_graph`.
//! - A function never lists its own feature id as an input, directly or
//!   through other functions.

use super::function_graph::FunctionGraph;
use super::{FeatureId, FunctionId, GroupId};
use serde::{Deserialize, Serialize};

/// Function read model, joined with its feature row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub id: FunctionId,
    pub feature_id: FeatureId,
    pub name: String,
    pub group_id: GroupId,
    pub display_index: i32,
    pub description: String,
    pub function_graph: FunctionGraph,
    pub input_feature_ids: Vec<FeatureId>,
}

/// Request to create one function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCreateRequest {
    pub name: String,
    pub group_id: GroupId,
    #[serde(default)]
    pub description: String,
    pub function_graph: FunctionGraph,
    pub input_feature_ids: Vec<FeatureId>,
}

impl FunctionCreateRequest {
    /// Request whose graph simply forwards `input_feature_ids`.
    pub fn passthrough(
        name: impl Into<String>,
        group_id: GroupId,
        input_feature_ids: Vec<FeatureId>,
    ) -> Self {
        Self {
            name: name.into(),
            group_id,
            description: String::new(),
            function_graph: FunctionGraph::passthrough(&input_feature_ids),
            input_feature_ids,
        }
    }
}

/// Partial function update; `None` fields keep their stored value.
///
/// `function_graph` and `input_feature_ids` are validated together, so when
/// one is given the other must be given too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionUpdateRequest {
    pub id: FunctionId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub function_graph: Option<FunctionGraph>,
    pub input_feature_ids: Option<Vec<FeatureId>>,
}

impl FunctionUpdateRequest {
    pub fn new(id: FunctionId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Replaces graph and inputs with a passthrough over `input_feature_ids`.
    pub fn with_passthrough_inputs(mut self, input_feature_ids: Vec<FeatureId>) -> Self {
        self.function_graph = Some(FunctionGraph::passthrough(&input_feature_ids));
        self.input_feature_ids = Some(input_feature_ids);
        self
    }
}

/// Removes repeated ids while keeping first-appearance order.
pub(crate) fn dedup_inputs(ids: &[FeatureId]) -> Vec<FeatureId> {
    let mut seen = std::collections::HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}
