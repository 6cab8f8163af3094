//! Graph/stat repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist graphs as a kind tag plus a JSON payload.
//! - Keep the flattened `graph_features` reference index in sync with each
//!   payload.
//!
//! # Invariants
//! - Every write of a config rewrites its `graph_features` rows in the same
//!   statement sequence.

use super::{placeholders, RepoError, RepoResult};
use crate::model::graph::{GraphConfig, GraphKind, GraphOrStat};
use crate::model::{GraphId, GroupId};
use rusqlite::{params, params_from_iter, Connection, Row};

const GRAPH_SELECT_SQL: &str = "SELECT
    id,
    group_id,
    name,
    display_index,
    kind,
    config
FROM graphs_stats";

/// Repository interface for graphs/stats.
pub trait GraphRepository {
    fn insert_graph(
        &self,
        group_id: GroupId,
        name: &str,
        display_index: i32,
        config: &GraphConfig,
    ) -> RepoResult<GraphId>;
    /// Writes group, name, display index and config of `graph`.
    fn update_graph(&self, graph: &GraphOrStat) -> RepoResult<()>;
    fn get_graph(&self, id: GraphId) -> RepoResult<Option<GraphOrStat>>;
    fn list_graphs_for_group(&self, group_id: GroupId) -> RepoResult<Vec<GraphOrStat>>;
    fn list_all_graphs(&self) -> RepoResult<Vec<GraphOrStat>>;
    fn list_graph_ids_in_groups(&self, group_ids: &[GroupId]) -> RepoResult<Vec<GraphId>>;
    fn delete_graph(&self, id: GraphId) -> RepoResult<bool>;
    fn set_display_index(&self, id: GraphId, display_index: i32) -> RepoResult<bool>;
}

/// SQLite-backed graph repository.
pub struct SqliteGraphRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGraphRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn write_references(&self, id: GraphId, config: &GraphConfig) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM graph_features WHERE graph_id = ?1;", [id])?;
        let mut stmt = self
            .conn
            .prepare("INSERT INTO graph_features (graph_id, feature_id) VALUES (?1, ?2);")?;
        for feature_id in config.referenced_feature_ids() {
            stmt.execute(params![id, feature_id])?;
        }
        Ok(())
    }

    fn query_graphs(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<GraphOrStat>> {
        let sql = format!("{GRAPH_SELECT_SQL} {filter} ORDER BY display_index ASC, id DESC;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params)?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_graph_row(row)?);
        }
        Ok(items)
    }
}

impl GraphRepository for SqliteGraphRepository<'_> {
    fn insert_graph(
        &self,
        group_id: GroupId,
        name: &str,
        display_index: i32,
        config: &GraphConfig,
    ) -> RepoResult<GraphId> {
        self.conn.execute(
            "INSERT INTO graphs_stats (group_id, name, display_index, kind, config)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                group_id,
                name,
                display_index,
                config.kind().as_str(),
                config.payload_json()?,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.write_references(id, config)?;
        Ok(id)
    }

    fn update_graph(&self, graph: &GraphOrStat) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE graphs_stats
             SET group_id = ?2,
                 name = ?3,
                 display_index = ?4,
                 kind = ?5,
                 config = ?6
             WHERE id = ?1;",
            params![
                graph.id,
                graph.group_id,
                graph.name,
                graph.display_index,
                graph.config.kind().as_str(),
                graph.config.payload_json()?,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::InvalidData(format!(
                "graph {} vanished during update",
                graph.id
            )));
        }
        self.write_references(graph.id, &graph.config)
    }

    fn get_graph(&self, id: GraphId) -> RepoResult<Option<GraphOrStat>> {
        Ok(self.query_graphs("WHERE id = ?1", [id])?.pop())
    }

    fn list_graphs_for_group(&self, group_id: GroupId) -> RepoResult<Vec<GraphOrStat>> {
        self.query_graphs("WHERE group_id = ?1", [group_id])
    }

    fn list_all_graphs(&self) -> RepoResult<Vec<GraphOrStat>> {
        self.query_graphs("", [])
    }

    fn list_graph_ids_in_groups(&self, group_ids: &[GroupId]) -> RepoResult<Vec<GraphId>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id FROM graphs_stats WHERE group_id IN ({}) ORDER BY id ASC;",
            placeholders(group_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(group_ids.iter()), |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn delete_graph(&self, id: GraphId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM graphs_stats WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn set_display_index(&self, id: GraphId, display_index: i32) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE graphs_stats SET display_index = ?2 WHERE id = ?1;",
            params![id, display_index],
        )?;
        Ok(changed > 0)
    }
}

fn parse_graph_row(row: &Row<'_>) -> RepoResult<GraphOrStat> {
    let kind_raw: String = row.get("kind")?;
    let kind = GraphKind::parse(&kind_raw)
        .ok_or_else(|| RepoError::InvalidData(format!("unknown graph kind `{kind_raw}`")))?;
    let payload: String = row.get("config")?;
    Ok(GraphOrStat {
        id: row.get("id")?,
        group_id: row.get("group_id")?,
        name: row.get("name")?,
        display_index: row.get("display_index")?,
        config: GraphConfig::from_payload_json(kind, &payload)?,
    })
}
