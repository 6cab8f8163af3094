//! Feature and tracker domain model.
//!
//! # Responsibility
//! - Define the feature identity shared by trackers and functions.
//! - Define tracker value types and the tracker create/update requests.
//!
//! # Invariants
//! - A tracker owns exactly one feature row; `Tracker::feature_id` never
//!   changes after creation.
//! - `Option` fields in update requests mean "leave unchanged".

use super::{FeatureId, GroupId, TrackerId};
use serde::{Deserialize, Serialize};

/// Identity and placement fields common to trackers and functions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub name: String,
    pub group_id: GroupId,
    pub display_index: i32,
    pub description: String,
}

/// Value kind stored by a tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Any real number.
    Continuous,
    /// Whole-number counts or choices.
    Discrete,
    /// Elapsed seconds.
    Duration,
    /// Presence-only events; the value is ignored.
    Timestamp,
}

impl DataType {
    /// Storage tag used in the `trackers.data_type` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Continuous => "continuous",
            Self::Discrete => "discrete",
            Self::Duration => "duration",
            Self::Timestamp => "timestamp",
        }
    }

    /// Parses a storage tag written by [`DataType::as_str`].
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "continuous" => Some(Self::Continuous),
            "discrete" => Some(Self::Discrete),
            "duration" => Some(Self::Duration),
            "timestamp" => Some(Self::Timestamp),
            _ => None,
        }
    }
}

/// Unit in which plain numbers are read when converting to or from durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationConversionMode {
    Hours,
    Minutes,
    Seconds,
}

impl DurationConversionMode {
    /// Number of stored duration seconds that equal one plain unit.
    pub fn seconds_per_unit(self) -> f64 {
        match self {
            Self::Hours => 3600.0,
            Self::Minutes => 60.0,
            Self::Seconds => 1.0,
        }
    }
}

/// Tracker read model, joined with its feature row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracker {
    pub id: TrackerId,
    pub feature_id: FeatureId,
    pub name: String,
    pub group_id: GroupId,
    pub display_index: i32,
    pub description: String,
    pub data_type: DataType,
    pub has_default_value: bool,
    pub default_value: f64,
    pub default_label: String,
    /// Unix epoch milliseconds of the running timer, if any.
    pub timer_start_instant: Option<i64>,
}

impl Tracker {
    /// Feature projection of this tracker.
    pub fn feature(&self) -> Feature {
        Feature {
            id: self.feature_id,
            name: self.name.clone(),
            group_id: self.group_id,
            display_index: self.display_index,
            description: self.description.clone(),
        }
    }
}

/// Tracker row as shown inside a group listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayTracker {
    pub tracker: Tracker,
    /// Timestamp of the newest data point, if the tracker has any.
    pub last_data_point_timestamp: Option<i64>,
}

/// Request to create one tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerCreateRequest {
    pub name: String,
    pub group_id: GroupId,
    #[serde(default)]
    pub description: String,
    pub data_type: DataType,
    #[serde(default)]
    pub has_default_value: bool,
    #[serde(default = "default_tracker_value")]
    pub default_value: f64,
    #[serde(default)]
    pub default_label: String,
}

fn default_tracker_value() -> f64 {
    1.0
}

impl TrackerCreateRequest {
    /// Creates a request with default value settings.
    pub fn new(name: impl Into<String>, group_id: GroupId, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            group_id,
            description: String::new(),
            data_type,
            has_default_value: false,
            default_value: default_tracker_value(),
            default_label: String::new(),
        }
    }
}

/// Partial tracker update; `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackerUpdateRequest {
    pub id: TrackerId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub data_type: Option<DataType>,
    /// Required when `data_type` switches between continuous and duration.
    pub duration_conversion: Option<DurationConversionMode>,
    pub has_default_value: Option<bool>,
    pub default_value: Option<f64>,
    pub default_label: Option<String>,
}

impl TrackerUpdateRequest {
    /// Creates an update that changes nothing yet.
    pub fn new(id: TrackerId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}
