//! Dependency and consistency engine for personal tracking data.
//! All structural writes go through [`DataService`], which keeps trackers,
//! functions, groups and graphs consistent and announces every committed
//! change on a [`ChangeBus`].

pub mod analysis;
pub mod config;
pub mod db;
pub mod display;
pub mod error;
pub mod events;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use analysis::{DependencyAnalyser, DependencySnapshot, FeatureKind};
pub use config::{ConfigError, EngineConfig};
pub use display::{GroupChild, GroupView, RefreshPlan};
pub use error::{CoreError, CoreResult, EntityRef};
pub use events::{ChangeBus, ChangeEvent, ChangeSubscription};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::data_point::{DataPoint, DataPointEdit};
pub use model::feature::{
    DataType, DisplayTracker, DurationConversionMode, Tracker, TrackerCreateRequest,
    TrackerUpdateRequest,
};
pub use model::function::{Function, FunctionCreateRequest, FunctionUpdateRequest};
pub use model::function_graph::FunctionGraph;
pub use model::graph::{GraphConfig, GraphCreateRequest, GraphOrStat, GraphUpdateRequest};
pub use model::group::{DeletedGroupInfo, Group, GroupCreateRequest, GroupTree, GroupUpdateRequest};
pub use model::validity::{InvalidConfiguration, Validity};
pub use model::{FeatureId, FunctionId, GraphId, GroupId, TrackerId, ROOT_GROUP_ID};
pub use service::{ComponentRef, DataService};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
