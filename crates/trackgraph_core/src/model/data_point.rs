//! Data point domain model.

use super::FeatureId;
use serde::{Deserialize, Serialize};

/// One recorded value; `(feature_id, timestamp)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Unix epoch milliseconds.
    pub timestamp: i64,
    pub feature_id: FeatureId,
    pub value: f64,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub note: String,
}

impl DataPoint {
    pub fn new(feature_id: FeatureId, timestamp: i64, value: f64) -> Self {
        Self {
            timestamp,
            feature_id,
            value,
            label: String::new(),
            note: String::new(),
        }
    }
}

/// Bulk edit of a tracker's data points.
///
/// Points matching every `where_*` filter that is set get the `to_*` values
/// that are set. With no filter every point matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataPointEdit {
    pub where_value: Option<f64>,
    pub where_label: Option<String>,
    pub to_value: Option<f64>,
    pub to_label: Option<String>,
}
