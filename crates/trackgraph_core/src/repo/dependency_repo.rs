//! Loads the dependency-relevant slice of the store in three queries.

use super::RepoResult;
use crate::analysis::{DependencySnapshot, FeatureKind};
use crate::model::{FeatureId, GraphId};
use rusqlite::Connection;

/// Reads every feature kind, function input edge and graph reference.
pub fn load_dependency_snapshot(conn: &Connection) -> RepoResult<DependencySnapshot> {
    let mut snapshot = DependencySnapshot::default();

    let mut stmt = conn.prepare(
        "SELECT f.id, fn.id IS NOT NULL
         FROM features f
         LEFT JOIN functions fn ON fn.feature_id = f.id;",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, FeatureId>(0)?, row.get::<_, bool>(1)?)))?;
    for row in rows {
        let (id, is_function) = row?;
        let kind = if is_function {
            FeatureKind::Function
        } else {
            FeatureKind::Tracker
        };
        snapshot.features.insert(id, kind);
    }

    let mut stmt = conn.prepare(
        "SELECT fn.feature_id, i.input_feature_id
         FROM functions fn
         LEFT JOIN function_inputs i ON i.function_id = fn.id
         ORDER BY fn.feature_id ASC, i.position ASC;",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, FeatureId>(0)?, row.get::<_, Option<FeatureId>>(1)?))
    })?;
    for row in rows {
        let (function_id, input) = row?;
        let inputs = snapshot.function_inputs.entry(function_id).or_default();
        if let Some(input) = input {
            inputs.push(input);
        }
    }

    let mut stmt = conn.prepare(
        "SELECT g.id, r.feature_id
         FROM graphs_stats g
         LEFT JOIN graph_features r ON r.graph_id = g.id;",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, GraphId>(0)?, row.get::<_, Option<FeatureId>>(1)?))
    })?;
    for row in rows {
        let (graph_id, feature_id) = row?;
        let references = snapshot.graph_references.entry(graph_id).or_default();
        if let Some(feature_id) = feature_id {
            references.insert(feature_id);
        }
    }

    Ok(snapshot)
}
