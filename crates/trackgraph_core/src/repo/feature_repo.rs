//! Feature and tracker repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist feature rows shared by trackers and functions.
//! - Persist tracker rows, including timer state.
//!
//! # Invariants
//! - Deleting a feature cascades to its tracker or function row, its data
//!   points and its function inputs through foreign keys.
//! - Listings are deterministic: `display_index ASC, id DESC`.

use super::{placeholders, RepoError, RepoResult};
use crate::model::feature::{DataType, DisplayTracker, Feature, Tracker, TrackerCreateRequest};
use crate::model::{FeatureId, GroupId, TrackerId};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const TRACKER_SELECT_SQL: &str = "SELECT
    t.id AS id,
    t.feature_id AS feature_id,
    f.name AS name,
    f.group_id AS group_id,
    f.display_index AS display_index,
    f.description AS description,
    t.data_type AS data_type,
    t.has_default_value AS has_default_value,
    t.default_value AS default_value,
    t.default_label AS default_label,
    t.timer_start_instant AS timer_start_instant,
    (SELECT MAX(d.timestamp) FROM data_points d WHERE d.feature_id = t.feature_id)
        AS last_data_point_timestamp
FROM trackers t
JOIN features f ON f.id = t.feature_id";

/// Repository interface for feature and tracker rows.
pub trait FeatureRepository {
    fn insert_feature(
        &self,
        name: &str,
        group_id: GroupId,
        display_index: i32,
        description: &str,
    ) -> RepoResult<FeatureId>;
    fn get_feature(&self, id: FeatureId) -> RepoResult<Option<Feature>>;
    fn update_feature(&self, feature: &Feature) -> RepoResult<()>;
    /// Returns whether a row was removed.
    fn delete_feature(&self, id: FeatureId) -> RepoResult<bool>;
    fn list_feature_ids_in_groups(&self, group_ids: &[GroupId]) -> RepoResult<Vec<FeatureId>>;
    fn set_display_index(&self, id: FeatureId, display_index: i32) -> RepoResult<bool>;

    fn insert_tracker(
        &self,
        feature_id: FeatureId,
        request: &TrackerCreateRequest,
    ) -> RepoResult<TrackerId>;
    /// Writes the tracker-only columns of `tracker`.
    fn update_tracker(&self, tracker: &Tracker) -> RepoResult<()>;
    fn get_tracker(&self, id: TrackerId) -> RepoResult<Option<Tracker>>;
    fn get_tracker_by_feature_id(&self, feature_id: FeatureId) -> RepoResult<Option<Tracker>>;
    fn list_display_trackers_for_group(&self, group_id: GroupId)
        -> RepoResult<Vec<DisplayTracker>>;
    fn list_all_trackers(&self) -> RepoResult<Vec<Tracker>>;
    fn list_active_timer_trackers(&self) -> RepoResult<Vec<DisplayTracker>>;
    fn set_timer_start(&self, id: TrackerId, started_at: Option<i64>) -> RepoResult<()>;
}

/// SQLite-backed feature repository.
pub struct SqliteFeatureRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFeatureRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_display_trackers(
        &self,
        filter: &str,
        params: impl rusqlite::Params,
    ) -> RepoResult<Vec<DisplayTracker>> {
        let sql = format!("{TRACKER_SELECT_SQL} {filter} ORDER BY f.display_index ASC, t.id DESC;");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params)?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(DisplayTracker {
                tracker: parse_tracker_row(row)?,
                last_data_point_timestamp: row.get("last_data_point_timestamp")?,
            });
        }
        Ok(items)
    }

    fn query_one_tracker(
        &self,
        filter: &str,
        id: i64,
    ) -> RepoResult<Option<Tracker>> {
        let sql = format!("{TRACKER_SELECT_SQL} {filter};");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_tracker_row(row)?));
        }
        Ok(None)
    }
}

impl FeatureRepository for SqliteFeatureRepository<'_> {
    fn insert_feature(
        &self,
        name: &str,
        group_id: GroupId,
        display_index: i32,
        description: &str,
    ) -> RepoResult<FeatureId> {
        self.conn.execute(
            "INSERT INTO features (name, group_id, display_index, description)
             VALUES (?1, ?2, ?3, ?4);",
            params![name, group_id, display_index, description],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_feature(&self, id: FeatureId) -> RepoResult<Option<Feature>> {
        let feature = self
            .conn
            .query_row(
                "SELECT id, name, group_id, display_index, description
                 FROM features WHERE id = ?1;",
                [id],
                |row| {
                    Ok(Feature {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        group_id: row.get(2)?,
                        display_index: row.get(3)?,
                        description: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(feature)
    }

    fn update_feature(&self, feature: &Feature) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE features
             SET name = ?2,
                 group_id = ?3,
                 display_index = ?4,
                 description = ?5
             WHERE id = ?1;",
            params![
                feature.id,
                feature.name,
                feature.group_id,
                feature.display_index,
                feature.description,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::InvalidData(format!(
                "feature {} vanished during update",
                feature.id
            )));
        }
        Ok(())
    }

    fn delete_feature(&self, id: FeatureId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM features WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn list_feature_ids_in_groups(&self, group_ids: &[GroupId]) -> RepoResult<Vec<FeatureId>> {
        if group_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT id FROM features WHERE group_id IN ({}) ORDER BY id ASC;",
            placeholders(group_ids.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(group_ids.iter()), |row| row.get(0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn set_display_index(&self, id: FeatureId, display_index: i32) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE features SET display_index = ?2 WHERE id = ?1;",
            params![id, display_index],
        )?;
        Ok(changed > 0)
    }

    fn insert_tracker(
        &self,
        feature_id: FeatureId,
        request: &TrackerCreateRequest,
    ) -> RepoResult<TrackerId> {
        self.conn.execute(
            "INSERT INTO trackers (
                feature_id,
                data_type,
                has_default_value,
                default_value,
                default_label,
                timer_start_instant
            ) VALUES (?1, ?2, ?3, ?4, ?5, NULL);",
            params![
                feature_id,
                request.data_type.as_str(),
                request.has_default_value,
                request.default_value,
                request.default_label,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_tracker(&self, tracker: &Tracker) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE trackers
             SET data_type = ?2,
                 has_default_value = ?3,
                 default_value = ?4,
                 default_label = ?5,
                 timer_start_instant = ?6
             WHERE id = ?1;",
            params![
                tracker.id,
                tracker.data_type.as_str(),
                tracker.has_default_value,
                tracker.default_value,
                tracker.default_label,
                tracker.timer_start_instant,
            ],
        )?;
        Ok(())
    }

    fn get_tracker(&self, id: TrackerId) -> RepoResult<Option<Tracker>> {
        self.query_one_tracker("WHERE t.id = ?1", id)
    }

    fn get_tracker_by_feature_id(&self, feature_id: FeatureId) -> RepoResult<Option<Tracker>> {
        self.query_one_tracker("WHERE t.feature_id = ?1", feature_id)
    }

    fn list_display_trackers_for_group(
        &self,
        group_id: GroupId,
    ) -> RepoResult<Vec<DisplayTracker>> {
        self.query_display_trackers("WHERE f.group_id = ?1", [group_id])
    }

    fn list_all_trackers(&self) -> RepoResult<Vec<Tracker>> {
        Ok(self
            .query_display_trackers("", [])?
            .into_iter()
            .map(|display| display.tracker)
            .collect())
    }

    fn list_active_timer_trackers(&self) -> RepoResult<Vec<DisplayTracker>> {
        self.query_display_trackers("WHERE t.timer_start_instant IS NOT NULL", [])
    }

    fn set_timer_start(&self, id: TrackerId, started_at: Option<i64>) -> RepoResult<()> {
        self.conn.execute(
            "UPDATE trackers SET timer_start_instant = ?2 WHERE id = ?1;",
            params![id, started_at],
        )?;
        Ok(())
    }
}

fn parse_tracker_row(row: &Row<'_>) -> RepoResult<Tracker> {
    let data_type_raw: String = row.get("data_type")?;
    let data_type = DataType::parse(&data_type_raw)
        .ok_or_else(|| RepoError::InvalidData(format!("unknown data type `{data_type_raw}`")))?;
    Ok(Tracker {
        id: row.get("id")?,
        feature_id: row.get("feature_id")?,
        name: row.get("name")?,
        group_id: row.get("group_id")?,
        display_index: row.get("display_index")?,
        description: row.get("description")?,
        data_type,
        has_default_value: row.get("has_default_value")?,
        default_value: row.get("default_value")?,
        default_label: row.get("default_label")?,
        timer_start_instant: row.get("timer_start_instant")?,
    })
}
