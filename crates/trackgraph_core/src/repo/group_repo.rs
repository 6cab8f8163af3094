//! Group repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the group hierarchy and the display indexes of group children.
//!
//! # Invariants
//! - Child listing is deterministic: `display_index ASC, id DESC`.
//! - The root group row is never deleted through this repository.

use super::{placeholders, RepoError, RepoResult};
use crate::model::group::Group;
use crate::model::{GroupId, ROOT_GROUP_ID};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::{HashSet, VecDeque};

const GROUP_SELECT_SQL: &str = "SELECT
    id,
    name,
    parent_group_id,
    display_index,
    color_index
FROM groups";

/// Repository interface for group rows.
pub trait GroupRepository {
    fn insert_group(
        &self,
        name: &str,
        parent_group_id: GroupId,
        display_index: i32,
        color_index: i32,
    ) -> RepoResult<GroupId>;
    fn get_group(&self, id: GroupId) -> RepoResult<Option<Group>>;
    fn list_child_groups(&self, parent_group_id: GroupId) -> RepoResult<Vec<Group>>;
    fn list_all_groups(&self) -> RepoResult<Vec<Group>>;
    /// Writes name, parent, display index and color of `group`.
    fn update_group(&self, group: &Group) -> RepoResult<()>;
    /// `group_id` plus all descendants, parents first.
    fn subtree_ids(&self, group_id: GroupId) -> RepoResult<Vec<GroupId>>;
    fn delete_groups(&self, ids: &[GroupId]) -> RepoResult<usize>;
    fn set_display_index(&self, id: GroupId, display_index: i32) -> RepoResult<bool>;
    /// Adds one to the display index of every feature, graph and subgroup in
    /// `group_id`.
    fn shift_child_indexes(&self, group_id: GroupId) -> RepoResult<()>;
}

/// SQLite-backed group repository.
pub struct SqliteGroupRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteGroupRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl GroupRepository for SqliteGroupRepository<'_> {
    fn insert_group(
        &self,
        name: &str,
        parent_group_id: GroupId,
        display_index: i32,
        color_index: i32,
    ) -> RepoResult<GroupId> {
        self.conn.execute(
            "INSERT INTO groups (name, parent_group_id, display_index, color_index)
             VALUES (?1, ?2, ?3, ?4);",
            params![name, parent_group_id, display_index, color_index],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_group(&self, id: GroupId) -> RepoResult<Option<Group>> {
        let sql = format!("{GROUP_SELECT_SQL} WHERE id = ?1;");
        let group = self
            .conn
            .query_row(&sql, [id], parse_group_row)
            .optional()?;
        Ok(group)
    }

    fn list_child_groups(&self, parent_group_id: GroupId) -> RepoResult<Vec<Group>> {
        let sql = format!(
            "{GROUP_SELECT_SQL} WHERE parent_group_id = ?1 AND id != ?2
             ORDER BY display_index ASC, id DESC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![parent_group_id, ROOT_GROUP_ID], parse_group_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn list_all_groups(&self) -> RepoResult<Vec<Group>> {
        let sql = format!("{GROUP_SELECT_SQL} ORDER BY id ASC;");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], parse_group_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn update_group(&self, group: &Group) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE groups
             SET name = ?2,
                 parent_group_id = ?3,
                 display_index = ?4,
                 color_index = ?5
             WHERE id = ?1;",
            params![
                group.id,
                group.name,
                group.parent_group_id,
                group.display_index,
                group.color_index,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::InvalidData(format!(
                "group {} vanished during update",
                group.id
            )));
        }
        Ok(())
    }

    fn subtree_ids(&self, group_id: GroupId) -> RepoResult<Vec<GroupId>> {
        if self.get_group(group_id)?.is_none() {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "SELECT id FROM groups WHERE parent_group_id = ?1 AND id != ?2 ORDER BY id ASC;",
        )?;
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([group_id]);
        while let Some(current) = queue.pop_front() {
            if !seen.insert(current) {
                continue;
            }
            out.push(current);
            let children = stmt.query_map(params![current, ROOT_GROUP_ID], |row| row.get(0))?;
            for child in children {
                queue.push_back(child?);
            }
        }
        Ok(out)
    }

    fn delete_groups(&self, ids: &[GroupId]) -> RepoResult<usize> {
        let ids: Vec<GroupId> = ids
            .iter()
            .copied()
            .filter(|id| *id != ROOT_GROUP_ID)
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "DELETE FROM groups WHERE id IN ({});",
            placeholders(ids.len())
        );
        Ok(self.conn.execute(&sql, params_from_iter(ids.iter()))?)
    }

    fn set_display_index(&self, id: GroupId, display_index: i32) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE groups SET display_index = ?2 WHERE id = ?1;",
            params![id, display_index],
        )?;
        Ok(changed > 0)
    }

    fn shift_child_indexes(&self, group_id: GroupId) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE features SET display_index = display_index + 1 WHERE group_id = ?1;",
            [group_id],
        )?;
        self.conn.execute(
            "UPDATE graphs_stats SET display_index = display_index + 1 WHERE group_id = ?1;",
            [group_id],
        )?;
        self.conn.execute(
            "UPDATE groups SET display_index = display_index + 1
             WHERE parent_group_id = ?1 AND id != ?2;",
            params![group_id, ROOT_GROUP_ID],
        )?;
        Ok(())
    }
}

fn parse_group_row(row: &Row<'_>) -> rusqlite::Result<Group> {
    Ok(Group {
        id: row.get("id")?,
        name: row.get("name")?,
        parent_group_id: row.get("parent_group_id")?,
        display_index: row.get("display_index")?,
        color_index: row.get("color_index")?,
    })
}
