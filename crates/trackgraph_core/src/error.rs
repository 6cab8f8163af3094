//! Public error taxonomy of the mutation and query API.
//!
//! # Invariants
//! - Validation kinds (`NotFound`, `CyclicDependency`, `CyclicFunctionGraph`,
//!   `CyclicMove`, `InvalidArgument`) are raised before any write is applied.
//! - `StorageFailure` means the transaction was rolled back in full.

use crate::db::DbError;
use crate::model::function_graph::NodeId;
use crate::model::{FeatureId, FunctionId, GraphId, GroupId, TrackerId};
use crate::repo::RepoError;
use std::fmt::{Display, Formatter};

pub type CoreResult<T> = Result<T, CoreError>;

/// Entity named by a `NotFound` error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Tracker(TrackerId),
    Function(FunctionId),
    Feature(FeatureId),
    Group(GroupId),
    Graph(GraphId),
    DataPoint { feature_id: FeatureId, timestamp: i64 },
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tracker(id) => write!(f, "tracker {id}"),
            Self::Function(id) => write!(f, "function {id}"),
            Self::Feature(id) => write!(f, "feature {id}"),
            Self::Group(id) => write!(f, "group {id}"),
            Self::Graph(id) => write!(f, "graph {id}"),
            Self::DataPoint {
                feature_id,
                timestamp,
            } => write!(f, "data point {feature_id}@{timestamp}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(EntityRef),
    #[error("function feature {function_feature_id} would depend on itself through inputs {offending_input_ids:?}")]
    CyclicDependency {
        function_feature_id: FeatureId,
        offending_input_ids: Vec<FeatureId>,
    },
    #[error("function graph node {node_id} is part of a cycle")]
    CyclicFunctionGraph { node_id: NodeId },
    #[error("group {group_id} cannot move under {target_parent_id}: target is the group or one of its descendants")]
    CyclicMove {
        group_id: GroupId,
        target_parent_id: GroupId,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("storage failure: {0}")]
    StorageFailure(#[from] RepoError),
}

impl CoreError {
    /// Stable machine-readable code for log lines.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::CyclicDependency { .. } => "cyclic_dependency",
            Self::CyclicFunctionGraph { .. } => "cyclic_function_graph",
            Self::CyclicMove { .. } => "cyclic_move",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::StorageFailure(_) => "storage_failure",
        }
    }
}

impl From<DbError> for CoreError {
    fn from(value: DbError) -> Self {
        Self::StorageFailure(RepoError::Db(value))
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StorageFailure(RepoError::from(value))
    }
}
