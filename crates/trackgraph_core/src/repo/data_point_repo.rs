//! Data point repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `(feature_id, timestamp)` is unique; inserting an existing key replaces
//!   the stored point.
//! - Listings are newest first.

use super::RepoResult;
use crate::model::data_point::{DataPoint, DataPointEdit};
use crate::model::FeatureId;
use rusqlite::{params, Connection, OptionalExtension, Row};

const DATA_POINT_SELECT_SQL: &str = "SELECT
    timestamp,
    feature_id,
    value,
    label,
    note
FROM data_points";

/// Repository interface for data points.
pub trait DataPointRepository {
    fn upsert_data_point(&self, point: &DataPoint) -> RepoResult<()>;
    fn get_data_point(&self, feature_id: FeatureId, timestamp: i64)
        -> RepoResult<Option<DataPoint>>;
    fn list_data_points(&self, feature_id: FeatureId) -> RepoResult<Vec<DataPoint>>;
    fn delete_data_point(&self, feature_id: FeatureId, timestamp: i64) -> RepoResult<bool>;
    /// Applies `edit` to matching points and returns how many changed.
    fn edit_data_points(&self, feature_id: FeatureId, edit: &DataPointEdit) -> RepoResult<usize>;
    fn clear_note(&self, feature_id: FeatureId, timestamp: i64) -> RepoResult<bool>;
    /// Multiplies every stored value of `feature_id` by `factor`.
    fn scale_values(&self, feature_id: FeatureId, factor: f64) -> RepoResult<usize>;
}

/// SQLite-backed data point repository.
pub struct SqliteDataPointRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDataPointRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl DataPointRepository for SqliteDataPointRepository<'_> {
    fn upsert_data_point(&self, point: &DataPoint) -> RepoResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO data_points (feature_id, timestamp, value, label, note)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                point.feature_id,
                point.timestamp,
                point.value,
                point.label,
                point.note,
            ],
        )?;
        Ok(())
    }

    fn get_data_point(
        &self,
        feature_id: FeatureId,
        timestamp: i64,
    ) -> RepoResult<Option<DataPoint>> {
        let sql = format!("{DATA_POINT_SELECT_SQL} WHERE feature_id = ?1 AND timestamp = ?2;");
        let point = self
            .conn
            .query_row(&sql, params![feature_id, timestamp], parse_data_point_row)
            .optional()?;
        Ok(point)
    }

    fn list_data_points(&self, feature_id: FeatureId) -> RepoResult<Vec<DataPoint>> {
        let sql = format!("{DATA_POINT_SELECT_SQL} WHERE feature_id = ?1 ORDER BY timestamp DESC;");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([feature_id], parse_data_point_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn delete_data_point(&self, feature_id: FeatureId, timestamp: i64) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM data_points WHERE feature_id = ?1 AND timestamp = ?2;",
            params![feature_id, timestamp],
        )?;
        Ok(changed > 0)
    }

    fn edit_data_points(&self, feature_id: FeatureId, edit: &DataPointEdit) -> RepoResult<usize> {
        if edit.to_value.is_none() && edit.to_label.is_none() {
            return Ok(0);
        }
        // NULL parameters leave the filter or the column untouched.
        let changed = self.conn.execute(
            "UPDATE data_points
             SET value = COALESCE(?4, value),
                 label = COALESCE(?5, label)
             WHERE feature_id = ?1
               AND (?2 IS NULL OR value = ?2)
               AND (?3 IS NULL OR label = ?3);",
            params![
                feature_id,
                edit.where_value,
                edit.where_label,
                edit.to_value,
                edit.to_label,
            ],
        )?;
        Ok(changed)
    }

    fn clear_note(&self, feature_id: FeatureId, timestamp: i64) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE data_points SET note = '' WHERE feature_id = ?1 AND timestamp = ?2;",
            params![feature_id, timestamp],
        )?;
        Ok(changed > 0)
    }

    fn scale_values(&self, feature_id: FeatureId, factor: f64) -> RepoResult<usize> {
        let changed = self.conn.execute(
            "UPDATE data_points SET value = value * ?2 WHERE feature_id = ?1;",
            params![feature_id, factor],
        )?;
        Ok(changed)
    }
}

fn parse_data_point_row(row: &Row<'_>) -> rusqlite::Result<DataPoint> {
    Ok(DataPoint {
        timestamp: row.get("timestamp")?,
        feature_id: row.get("feature_id")?,
        value: row.get("value")?,
        label: row.get("label")?,
        note: row.get("note")?,
    })
}
