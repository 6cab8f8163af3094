//! Graph/stat domain model.
//!
//! # Responsibility
//! - Represent every graph kind as one variant of [`GraphConfig`].
//! - Report the feature ids each configuration reads.
//!
//! # Invariants
//! - `GraphOrStat::config` kind never changes after creation.
//! - Single-feature kinds always reference exactly one feature id.

use super::{FeatureId, GraphId, GroupId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Discriminant of [`GraphConfig`], stored in `graphs_stats.kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphKind {
    LineGraph,
    PieChart,
    BarChart,
    Histogram,
    LastValue,
    AverageTimeBetween,
    LuaScript,
}

impl GraphKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LineGraph => "line_graph",
            Self::PieChart => "pie_chart",
            Self::BarChart => "bar_chart",
            Self::Histogram => "histogram",
            Self::LastValue => "last_value",
            Self::AverageTimeBetween => "average_time_between",
            Self::LuaScript => "lua_script",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "line_graph" => Some(Self::LineGraph),
            "pie_chart" => Some(Self::PieChart),
            "bar_chart" => Some(Self::BarChart),
            "histogram" => Some(Self::Histogram),
            "last_value" => Some(Self::LastValue),
            "average_time_between" => Some(Self::AverageTimeBetween),
            "lua_script" => Some(Self::LuaScript),
            _ => None,
        }
    }
}

/// One plotted series of a line graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineGraphFeature {
    pub feature_id: FeatureId,
    pub name: String,
    #[serde(default)]
    pub color_index: i32,
    #[serde(default)]
    pub offset: f64,
    #[serde(default = "unit_scale")]
    pub scale: f64,
}

fn unit_scale() -> f64 {
    1.0
}

impl LineGraphFeature {
    pub fn new(feature_id: FeatureId, name: impl Into<String>) -> Self {
        Self {
            feature_id,
            name: name.into(),
            color_index: 0,
            offset: 0.0,
            scale: unit_scale(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineGraphConfig {
    pub features: Vec<LineGraphFeature>,
    /// Trailing window to plot; `None` plots everything.
    pub sample_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieChartConfig {
    pub feature_id: FeatureId,
    pub sample_days: Option<u32>,
    #[serde(default)]
    pub sum_by_count: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarChartConfig {
    pub feature_id: FeatureId,
    pub bar_period_days: u32,
    pub sample_days: Option<u32>,
    #[serde(default)]
    pub sum_by_count: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistogramWindow {
    Hour,
    Day,
    Week,
    Month,
    ThreeMonths,
    SixMonths,
    Year,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramConfig {
    pub feature_id: FeatureId,
    pub window: HistogramWindow,
    pub sample_days: Option<u32>,
    #[serde(default)]
    pub sum_by_count: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastValueConfig {
    pub feature_id: FeatureId,
    /// Only points carrying one of these labels count; empty means all.
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageTimeBetweenConfig {
    pub feature_id: FeatureId,
    pub from_value: Option<f64>,
    pub to_value: Option<f64>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub sample_days: Option<u32>,
}

/// Named feature input bound to a graph script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LuaGraphFeature {
    pub name: String,
    pub feature_id: FeatureId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LuaGraphConfig {
    pub script: String,
    pub features: Vec<LuaGraphFeature>,
}

/// Kind-specific graph configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphConfig {
    Line(LineGraphConfig),
    Pie(PieChartConfig),
    Bar(BarChartConfig),
    Histogram(HistogramConfig),
    LastValue(LastValueConfig),
    AverageTimeBetween(AverageTimeBetweenConfig),
    Script(LuaGraphConfig),
}

impl GraphConfig {
    pub fn kind(&self) -> GraphKind {
        match self {
            Self::Line(_) => GraphKind::LineGraph,
            Self::Pie(_) => GraphKind::PieChart,
            Self::Bar(_) => GraphKind::BarChart,
            Self::Histogram(_) => GraphKind::Histogram,
            Self::LastValue(_) => GraphKind::LastValue,
            Self::AverageTimeBetween(_) => GraphKind::AverageTimeBetween,
            Self::Script(_) => GraphKind::LuaScript,
        }
    }

    /// Feature ids this configuration reads.
    pub fn referenced_feature_ids(&self) -> BTreeSet<FeatureId> {
        match self {
            Self::Line(config) => config.features.iter().map(|f| f.feature_id).collect(),
            Self::Script(config) => config.features.iter().map(|f| f.feature_id).collect(),
            Self::Pie(PieChartConfig { feature_id, .. })
            | Self::Bar(BarChartConfig { feature_id, .. })
            | Self::Histogram(HistogramConfig { feature_id, .. })
            | Self::LastValue(LastValueConfig { feature_id, .. })
            | Self::AverageTimeBetween(AverageTimeBetweenConfig { feature_id, .. }) => {
                BTreeSet::from([*feature_id])
            }
        }
    }

    /// Drops references to features not in `existing` from multi-feature
    /// kinds. Returns whether anything was removed.
    ///
    /// Single-feature kinds are left untouched; losing their only feature
    /// orphans the graph instead.
    pub fn prune_missing(&mut self, existing: &HashSet<FeatureId>) -> bool {
        match self {
            Self::Line(config) => {
                let before = config.features.len();
                config.features.retain(|f| existing.contains(&f.feature_id));
                config.features.len() != before
            }
            Self::Script(config) => {
                let before = config.features.len();
                config.features.retain(|f| existing.contains(&f.feature_id));
                config.features.len() != before
            }
            Self::Pie(_)
            | Self::Bar(_)
            | Self::Histogram(_)
            | Self::LastValue(_)
            | Self::AverageTimeBetween(_) => false,
        }
    }

    /// Serializes only the variant payload; the kind is stored separately.
    pub fn payload_json(&self) -> Result<String, serde_json::Error> {
        match self {
            Self::Line(config) => serde_json::to_string(config),
            Self::Pie(config) => serde_json::to_string(config),
            Self::Bar(config) => serde_json::to_string(config),
            Self::Histogram(config) => serde_json::to_string(config),
            Self::LastValue(config) => serde_json::to_string(config),
            Self::AverageTimeBetween(config) => serde_json::to_string(config),
            Self::Script(config) => serde_json::to_string(config),
        }
    }

    /// Inverse of [`GraphConfig::payload_json`].
    pub fn from_payload_json(kind: GraphKind, payload: &str) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            GraphKind::LineGraph => Self::Line(serde_json::from_str(payload)?),
            GraphKind::PieChart => Self::Pie(serde_json::from_str(payload)?),
            GraphKind::BarChart => Self::Bar(serde_json::from_str(payload)?),
            GraphKind::Histogram => Self::Histogram(serde_json::from_str(payload)?),
            GraphKind::LastValue => Self::LastValue(serde_json::from_str(payload)?),
            GraphKind::AverageTimeBetween => {
                Self::AverageTimeBetween(serde_json::from_str(payload)?)
            }
            GraphKind::LuaScript => Self::Script(serde_json::from_str(payload)?),
        })
    }

    /// Single-feature last-value stat, the simplest graph kind.
    pub fn last_value(feature_id: FeatureId) -> Self {
        Self::LastValue(LastValueConfig {
            feature_id,
            labels: Vec::new(),
        })
    }

    /// Line graph plotting each feature with default styling.
    pub fn line(feature_ids: &[FeatureId]) -> Self {
        Self::Line(LineGraphConfig {
            features: feature_ids
                .iter()
                .map(|id| LineGraphFeature::new(*id, format!("feature {id}")))
                .collect(),
            sample_days: None,
        })
    }
}

/// Persisted graph/stat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphOrStat {
    pub id: GraphId,
    pub group_id: GroupId,
    pub name: String,
    pub display_index: i32,
    pub config: GraphConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphCreateRequest {
    pub group_id: GroupId,
    pub name: String,
    pub config: GraphConfig,
}

impl GraphCreateRequest {
    pub fn new(group_id: GroupId, name: impl Into<String>, config: GraphConfig) -> Self {
        Self {
            group_id,
            name: name.into(),
            config,
        }
    }
}

/// Partial graph update. A new `config` must keep the stored kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphUpdateRequest {
    pub id: GraphId,
    pub name: Option<String>,
    pub config: Option<GraphConfig>,
}

impl GraphUpdateRequest {
    pub fn new(id: GraphId) -> Self {
        Self {
            id,
            name: None,
            config: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_feature_kinds_reference_one_id() {
        let config = GraphConfig::Histogram(HistogramConfig {
            feature_id: 4,
            window: HistogramWindow::Week,
            sample_days: None,
            sum_by_count: false,
        });
        assert_eq!(config.referenced_feature_ids(), BTreeSet::from([4]));
        assert_eq!(config.kind(), GraphKind::Histogram);
    }

    #[test]
    fn pruning_keeps_existing_line_features() {
        let mut config = GraphConfig::line(&[1, 2, 3]);
        let existing = HashSet::from([1, 3]);
        assert!(config.prune_missing(&existing));
        assert_eq!(config.referenced_feature_ids(), BTreeSet::from([1, 3]));
        assert!(!config.prune_missing(&existing));
    }

    #[test]
    fn pruning_ignores_single_feature_kinds() {
        let mut config = GraphConfig::last_value(9);
        assert!(!config.prune_missing(&HashSet::new()));
        assert_eq!(config.referenced_feature_ids(), BTreeSet::from([9]));
    }

    #[test]
    fn payload_json_reads_back_with_kind() {
        let config = GraphConfig::Script(LuaGraphConfig {
            script: "return nil".to_string(),
            features: vec![LuaGraphFeature {
                name: "sleep".to_string(),
                feature_id: 12,
            }],
        });
        let payload = config.payload_json().unwrap();
        let kind = GraphKind::parse(config.kind().as_str()).unwrap();
        assert_eq!(GraphConfig::from_payload_json(kind, &payload).unwrap(), config);
    }
}
