//! Data point mutations and queries.
//!
//! # Invariants
//! - Data points belong to tracker features only.
//! - Every change announces `DataPoint` per touched feature, then one
//!   `GraphUpdated` per graph reading any of them.

use super::cascade::announce_data_change;
use super::DataService;
use crate::analysis::{DependencyAnalyser, FeatureKind};
use crate::error::{CoreError, CoreResult, EntityRef};
use crate::model::data_point::{DataPoint, DataPointEdit};
use crate::model::{FeatureId, TrackerId};
use crate::repo::data_point_repo::DataPointRepository;
use std::collections::BTreeSet;

impl DataService {
    /// Inserts or replaces one data point.
    pub fn insert_data_point(&self, point: &DataPoint) -> CoreResult<()> {
        self.insert_data_points(std::slice::from_ref(point))?;
        Ok(())
    }

    /// Inserts or replaces many data points in one transaction.
    ///
    /// Used by bulk imports. Returns the number of points written.
    pub fn insert_data_points(&self, points: &[DataPoint]) -> CoreResult<usize> {
        self.write("insert_data_points", |scope| {
            let analyser = scope.analyser()?;
            let touched: BTreeSet<FeatureId> = points.iter().map(|p| p.feature_id).collect();
            for feature_id in &touched {
                require_tracker_feature(&analyser, *feature_id)?;
            }
            let repo = scope.data_points();
            for point in points {
                repo.upsert_data_point(point)?;
            }
            announce_data_change(scope, &touched)?;
            Ok(points.len())
        })
    }

    pub fn delete_data_point(&self, feature_id: FeatureId, timestamp: i64) -> CoreResult<()> {
        self.write("delete_data_point", |scope| {
            if !scope.data_points().delete_data_point(feature_id, timestamp)? {
                return Err(missing_point(feature_id, timestamp));
            }
            announce_data_change(scope, &BTreeSet::from([feature_id]))
        })
    }

    /// Rewrites matching points of one tracker. Returns how many changed.
    pub fn edit_data_points(&self, tracker_id: TrackerId, edit: &DataPointEdit) -> CoreResult<usize> {
        self.write("edit_data_points", |scope| {
            let tracker = scope.require_tracker(tracker_id)?;
            let changed = scope
                .data_points()
                .edit_data_points(tracker.feature_id, edit)?;
            if changed > 0 {
                announce_data_change(scope, &BTreeSet::from([tracker.feature_id]))?;
            }
            Ok(changed)
        })
    }

    /// Clears the note of one data point.
    pub fn remove_note(&self, feature_id: FeatureId, timestamp: i64) -> CoreResult<()> {
        self.write("remove_note", |scope| {
            if !scope.data_points().clear_note(feature_id, timestamp)? {
                return Err(missing_point(feature_id, timestamp));
            }
            announce_data_change(scope, &BTreeSet::from([feature_id]))
        })
    }

    pub fn get_data_point(&self, feature_id: FeatureId, timestamp: i64) -> CoreResult<DataPoint> {
        self.read(|scope| {
            scope
                .data_points()
                .get_data_point(feature_id, timestamp)?
                .ok_or_else(|| missing_point(feature_id, timestamp))
        })
    }

    /// Points of one feature, newest first.
    pub fn list_data_points(&self, feature_id: FeatureId) -> CoreResult<Vec<DataPoint>> {
        self.read(|scope| Ok(scope.data_points().list_data_points(feature_id)?))
    }
}

fn require_tracker_feature(analyser: &DependencyAnalyser, feature_id: FeatureId) -> CoreResult<()> {
    match analyser.feature_kind(feature_id) {
        Some(FeatureKind::Tracker) => Ok(()),
        Some(FeatureKind::Function) => Err(CoreError::InvalidArgument(format!(
            "feature {feature_id} is a function; data points belong to trackers"
        ))),
        None => Err(CoreError::NotFound(EntityRef::Feature(feature_id))),
    }
}

fn missing_point(feature_id: FeatureId, timestamp: i64) -> CoreError {
    CoreError::NotFound(EntityRef::DataPoint {
        feature_id,
        timestamp,
    })
}
