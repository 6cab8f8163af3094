//! Repository layer: SQLite persistence for every entity.
//!
//! # Responsibility
//! - Define data access contracts per aggregate (groups, features and
//!   trackers, functions, data points, graphs).
//! - Isolate SQL details from the dependency analyser and the service.
//!
//! # Invariants
//! - Repositories never open transactions; callers scope them through
//!   `Store::run_in_transaction`.
//! - Reads reject malformed persisted rows with `RepoError::InvalidData`
//!   instead of masking them.

pub mod data_point_repo;
pub mod dependency_repo;
pub mod feature_repo;
pub mod function_repo;
pub mod graph_repo;
pub mod group_repo;

use crate::db::DbError;

pub type RepoResult<T> = Result<T, RepoError>;

/// Store-level failure shared by all repositories.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{0}")]
    Db(#[from] DbError),
    #[error("invalid persisted data: {0}")]
    InvalidData(String),
    #[error("invalid persisted json: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Builds `?1, ?2, …` placeholders for an `IN (…)` list.
pub(crate) fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|index| format!("?{index}"))
        .collect::<Vec<_>>()
        .join(", ")
}
