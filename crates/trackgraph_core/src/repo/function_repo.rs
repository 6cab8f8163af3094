//! Function repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist function rows with their serialized computation graph.
//! - Persist the ordered input edge list in `function_inputs`.
//!
//! # Invariants
//! - Input edges are replaced as a whole; `position` follows the request
//!   order.
//! - Input edges may point at deleted features; reads keep them.

use super::{RepoError, RepoResult};
use crate::model::function::Function;
use crate::model::function_graph::FunctionGraph;
use crate::model::{FeatureId, FunctionId, GroupId};
use rusqlite::{params, Connection, Row};

const FUNCTION_SELECT_SQL: &str = "SELECT
    fn.id AS id,
    fn.feature_id AS feature_id,
    f.name AS name,
    f.group_id AS group_id,
    f.display_index AS display_index,
    f.description AS description,
    fn.function_graph AS function_graph
FROM functions fn
JOIN features f ON f.id = fn.feature_id";

/// Repository interface for function rows and their inputs.
pub trait FunctionRepository {
    fn insert_function(
        &self,
        feature_id: FeatureId,
        graph: &FunctionGraph,
        input_feature_ids: &[FeatureId],
    ) -> RepoResult<FunctionId>;
    /// Rewrites the graph and the full input list of one function.
    fn update_function(
        &self,
        id: FunctionId,
        graph: &FunctionGraph,
        input_feature_ids: &[FeatureId],
    ) -> RepoResult<()>;
    fn get_function(&self, id: FunctionId) -> RepoResult<Option<Function>>;
    fn get_function_by_feature_id(&self, feature_id: FeatureId) -> RepoResult<Option<Function>>;
    fn list_functions_for_group(&self, group_id: GroupId) -> RepoResult<Vec<Function>>;
    fn list_all_functions(&self) -> RepoResult<Vec<Function>>;
    /// Feature ids of functions listing `input_feature_id` directly.
    fn list_direct_dependent_feature_ids(
        &self,
        input_feature_id: FeatureId,
    ) -> RepoResult<Vec<FeatureId>>;
}

/// SQLite-backed function repository.
pub struct SqliteFunctionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFunctionRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn write_inputs(&self, id: FunctionId, input_feature_ids: &[FeatureId]) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM function_inputs WHERE function_id = ?1;", [id])?;
        let mut stmt = self.conn.prepare(
            "INSERT OR IGNORE INTO function_inputs (function_id, input_feature_id, position)
             VALUES (?1, ?2, ?3);",
        )?;
        for (position, input) in input_feature_ids.iter().enumerate() {
            stmt.execute(params![id, input, position as i64])?;
        }
        Ok(())
    }

    fn load_inputs(&self, id: FunctionId) -> RepoResult<Vec<FeatureId>> {
        let mut stmt = self.conn.prepare(
            "SELECT input_feature_id FROM function_inputs
             WHERE function_id = ?1 ORDER BY position ASC;",
        )?;
        let rows = stmt.query_map([id], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn query_functions(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<Function>> {
        let sql = format!(
            "{FUNCTION_SELECT_SQL} {filter} ORDER BY f.display_index ASC, fn.id DESC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params)?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_function_row(row)?);
        }
        for function in &mut items {
            function.input_feature_ids = self.load_inputs(function.id)?;
        }
        Ok(items)
    }
}

impl FunctionRepository for SqliteFunctionRepository<'_> {
    fn insert_function(
        &self,
        feature_id: FeatureId,
        graph: &FunctionGraph,
        input_feature_ids: &[FeatureId],
    ) -> RepoResult<FunctionId> {
        self.conn.execute(
            "INSERT INTO functions (feature_id, function_graph) VALUES (?1, ?2);",
            params![feature_id, graph.to_json()?],
        )?;
        let id = self.conn.last_insert_rowid();
        self.write_inputs(id, input_feature_ids)?;
        Ok(id)
    }

    fn update_function(
        &self,
        id: FunctionId,
        graph: &FunctionGraph,
        input_feature_ids: &[FeatureId],
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE functions SET function_graph = ?2 WHERE id = ?1;",
            params![id, graph.to_json()?],
        )?;
        if changed == 0 {
            return Err(RepoError::InvalidData(format!(
                "function {id} vanished during update"
            )));
        }
        self.write_inputs(id, input_feature_ids)
    }

    fn get_function(&self, id: FunctionId) -> RepoResult<Option<Function>> {
        Ok(self.query_functions("WHERE fn.id = ?1", [id])?.pop())
    }

    fn get_function_by_feature_id(&self, feature_id: FeatureId) -> RepoResult<Option<Function>> {
        Ok(self
            .query_functions("WHERE fn.feature_id = ?1", [feature_id])?
            .pop())
    }

    fn list_functions_for_group(&self, group_id: GroupId) -> RepoResult<Vec<Function>> {
        self.query_functions("WHERE f.group_id = ?1", [group_id])
    }

    fn list_all_functions(&self) -> RepoResult<Vec<Function>> {
        self.query_functions("", [])
    }

    fn list_direct_dependent_feature_ids(
        &self,
        input_feature_id: FeatureId,
    ) -> RepoResult<Vec<FeatureId>> {
        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT fn.feature_id
             FROM function_inputs i
             JOIN functions fn ON fn.id = i.function_id
             WHERE i.input_feature_id = ?1
             ORDER BY fn.feature_id ASC;",
        )?;
        let rows = stmt.query_map([input_feature_id], |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn parse_function_row(row: &Row<'_>) -> RepoResult<Function> {
    let graph_raw: String = row.get("function_graph")?;
    Ok(Function {
        id: row.get("id")?,
        feature_id: row.get("feature_id")?,
        name: row.get("name")?,
        group_id: row.get("group_id")?,
        display_index: row.get("display_index")?,
        description: row.get("description")?,
        function_graph: FunctionGraph::from_json(&graph_raw)?,
        input_feature_ids: Vec::new(),
    })
}
