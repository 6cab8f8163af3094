//! Tracker mutations, timers and queries.
//!
//! # Invariants
//! - Switching between continuous and duration values rescales every stored
//!   data point of the tracker inside the same transaction.
//! - Timer instants are Unix epoch milliseconds.

use super::cascade::{announce_data_change, delete_features};
use super::ordering::shift_for_insert;
use super::scope::normalize_name;
use super::DataService;
use crate::error::{CoreError, CoreResult, EntityRef};
use crate::events::ChangeEvent;
use crate::model::feature::{
    DataType, DisplayTracker, DurationConversionMode, Tracker, TrackerCreateRequest,
    TrackerUpdateRequest,
};
use crate::model::{FeatureId, GroupId, TrackerId};
use crate::repo::data_point_repo::DataPointRepository;
use crate::repo::feature_repo::FeatureRepository;
use std::collections::BTreeSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

impl DataService {
    /// Creates a tracker at display index 0 of its group.
    pub fn create_tracker(&self, request: &TrackerCreateRequest) -> CoreResult<Tracker> {
        let name = normalize_name(&request.name)?;
        self.write("create_tracker", |scope| {
            scope.require_group(request.group_id)?;
            shift_for_insert(scope, request.group_id)?;
            let features = scope.features();
            let feature_id =
                features.insert_feature(&name, request.group_id, 0, &request.description)?;
            let tracker_id = features.insert_tracker(feature_id, request)?;
            let tracker = scope.require_tracker(tracker_id)?;
            scope.record(ChangeEvent::TrackerCreated(feature_id));
            Ok(tracker)
        })
    }

    /// Applies the `Some` fields of `request`.
    ///
    /// # Errors
    /// - `InvalidArgument` when switching between continuous and duration
    ///   without a conversion mode, or when the new name is blank.
    pub fn update_tracker(&self, request: &TrackerUpdateRequest) -> CoreResult<Tracker> {
        let name = request.name.as_deref().map(normalize_name).transpose()?;
        self.write("update_tracker", |scope| {
            let mut tracker = scope.require_tracker(request.id)?;
            let conversion = match request.data_type {
                Some(to) => value_conversion(tracker.data_type, to, request.duration_conversion)?,
                None => None,
            };

            if let Some(name) = name {
                tracker.name = name;
            }
            if let Some(description) = &request.description {
                tracker.description.clone_from(description);
            }
            if let Some(data_type) = request.data_type {
                tracker.data_type = data_type;
            }
            if let Some(has_default_value) = request.has_default_value {
                tracker.has_default_value = has_default_value;
            }
            if let Some(default_value) = request.default_value {
                tracker.default_value = default_value;
            }
            if let Some(default_label) = &request.default_label {
                tracker.default_label.clone_from(default_label);
            }

            let features = scope.features();
            features.update_feature(&tracker.feature())?;
            features.update_tracker(&tracker)?;
            scope.record(ChangeEvent::TrackerUpdated(tracker.feature_id));

            if let Some(factor) = conversion {
                let converted = scope.data_points().scale_values(tracker.feature_id, factor)?;
                if converted > 0 {
                    announce_data_change(scope, &BTreeSet::from([tracker.feature_id]))?;
                }
            }
            scope.require_tracker(tracker.id)
        })
    }

    /// Deletes the tracker, its data points and the graphs left without input.
    ///
    /// Returns the ids of graphs deleted as a consequence.
    pub fn delete_tracker(&self, id: TrackerId) -> CoreResult<Vec<crate::model::GraphId>> {
        self.write("delete_tracker", |scope| {
            let tracker = scope.require_tracker(id)?;
            delete_features(scope, &[tracker.feature_id])
        })
    }

    pub fn get_tracker(&self, id: TrackerId) -> CoreResult<Tracker> {
        self.read(|scope| scope.require_tracker(id))
    }

    pub fn get_tracker_by_feature_id(&self, feature_id: FeatureId) -> CoreResult<Tracker> {
        self.read(|scope| {
            scope
                .features()
                .get_tracker_by_feature_id(feature_id)?
                .ok_or(CoreError::NotFound(EntityRef::Feature(feature_id)))
        })
    }

    /// Trackers of `group_id` with their newest data point timestamp.
    pub fn list_display_trackers_for_group(
        &self,
        group_id: GroupId,
    ) -> CoreResult<Vec<DisplayTracker>> {
        self.read(|scope| Ok(scope.features().list_display_trackers_for_group(group_id)?))
    }

    pub fn list_all_trackers(&self) -> CoreResult<Vec<Tracker>> {
        self.read(|scope| Ok(scope.features().list_all_trackers()?))
    }

    /// Trackers whose timer is running.
    pub fn list_active_timer_trackers(&self) -> CoreResult<Vec<DisplayTracker>> {
        self.read(|scope| Ok(scope.features().list_active_timer_trackers()?))
    }

    /// Starts the tracker's timer now, restarting it if already running.
    pub fn play_timer(&self, id: TrackerId) -> CoreResult<()> {
        self.play_timer_at(id, now_millis())
    }

    pub fn play_timer_at(&self, id: TrackerId, started_at_ms: i64) -> CoreResult<()> {
        self.write("play_timer", |scope| {
            let tracker = scope.require_tracker(id)?;
            scope.features().set_timer_start(id, Some(started_at_ms))?;
            scope.record(ChangeEvent::TrackerUpdated(tracker.feature_id));
            Ok(())
        })
    }

    /// Stops the timer and returns how long it ran, or `None` when it was
    /// not running.
    pub fn stop_timer(&self, id: TrackerId) -> CoreResult<Option<Duration>> {
        self.stop_timer_at(id, now_millis())
    }

    pub fn stop_timer_at(&self, id: TrackerId, stopped_at_ms: i64) -> CoreResult<Option<Duration>> {
        self.write("stop_timer", |scope| {
            let tracker = scope.require_tracker(id)?;
            scope.features().set_timer_start(id, None)?;
            scope.record(ChangeEvent::TrackerUpdated(tracker.feature_id));
            Ok(tracker.timer_start_instant.map(|started_at| {
                let elapsed = stopped_at_ms.saturating_sub(started_at).max(0);
                Duration::from_millis(elapsed.unsigned_abs())
            }))
        })
    }
}

/// Factor applied to stored values when the data type changes, if any.
fn value_conversion(
    from: DataType,
    to: DataType,
    mode: Option<DurationConversionMode>,
) -> CoreResult<Option<f64>> {
    let needs_mode = matches!(
        (from, to),
        (DataType::Continuous, DataType::Duration) | (DataType::Duration, DataType::Continuous)
    );
    if !needs_mode {
        return Ok(None);
    }
    let Some(mode) = mode else {
        return Err(CoreError::InvalidArgument(format!(
            "changing {} to {} requires a duration conversion mode",
            from.as_str(),
            to.as_str()
        )));
    };
    let seconds = mode.seconds_per_unit();
    Ok(Some(if to == DataType::Duration {
        seconds
    } else {
        1.0 / seconds
    }))
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::value_conversion;
    use crate::error::CoreError;
    use crate::model::feature::{DataType, DurationConversionMode};

    #[test]
    fn conversion_factor_follows_direction() {
        assert_eq!(
            value_conversion(
                DataType::Continuous,
                DataType::Duration,
                Some(DurationConversionMode::Minutes)
            )
            .unwrap(),
            Some(60.0)
        );
        assert_eq!(
            value_conversion(
                DataType::Duration,
                DataType::Continuous,
                Some(DurationConversionMode::Hours)
            )
            .unwrap(),
            Some(1.0 / 3600.0)
        );
    }

    #[test]
    fn other_changes_need_no_mode() {
        assert_eq!(
            value_conversion(DataType::Discrete, DataType::Continuous, None).unwrap(),
            None
        );
        assert_eq!(
            value_conversion(DataType::Duration, DataType::Duration, None).unwrap(),
            None
        );
    }

    #[test]
    fn missing_mode_is_rejected() {
        assert!(matches!(
            value_conversion(DataType::Continuous, DataType::Duration, None),
            Err(CoreError::InvalidArgument(_))
        ));
    }
}
