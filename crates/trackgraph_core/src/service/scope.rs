//! Transaction scope handed to every mutation step.
//!
//! # Invariants
//! - Events recorded here are published only after the enclosing
//!   transaction commits; a rolled back scope publishes nothing.

use crate::analysis::DependencyAnalyser;
use crate::error::{CoreError, CoreResult, EntityRef};
use crate::events::ChangeEvent;
use crate::model::feature::Tracker;
use crate::model::function::Function;
use crate::model::graph::GraphOrStat;
use crate::model::group::Group;
use crate::model::{FunctionId, GraphId, GroupId, TrackerId};
use crate::repo::data_point_repo::SqliteDataPointRepository;
use crate::repo::feature_repo::{FeatureRepository, SqliteFeatureRepository};
use crate::repo::function_repo::{FunctionRepository, SqliteFunctionRepository};
use crate::repo::graph_repo::{GraphRepository, SqliteGraphRepository};
use crate::repo::group_repo::{GroupRepository, SqliteGroupRepository};
use rusqlite::Connection;

/// Open transaction plus the change events it will announce.
pub struct TxScope<'tx> {
    conn: &'tx Connection,
    pending: Vec<ChangeEvent>,
}

impl<'tx> TxScope<'tx> {
    pub(crate) fn new(conn: &'tx Connection) -> Self {
        Self {
            conn,
            pending: Vec::new(),
        }
    }

    /// Queues `event` for publication after commit.
    pub fn record(&mut self, event: ChangeEvent) {
        self.pending.push(event);
    }

    pub(crate) fn into_events(self) -> Vec<ChangeEvent> {
        self.pending
    }

    pub fn groups(&self) -> SqliteGroupRepository<'tx> {
        SqliteGroupRepository::new(self.conn)
    }

    pub fn features(&self) -> SqliteFeatureRepository<'tx> {
        SqliteFeatureRepository::new(self.conn)
    }

    pub fn functions(&self) -> SqliteFunctionRepository<'tx> {
        SqliteFunctionRepository::new(self.conn)
    }

    pub fn data_points(&self) -> SqliteDataPointRepository<'tx> {
        SqliteDataPointRepository::new(self.conn)
    }

    pub fn graphs(&self) -> SqliteGraphRepository<'tx> {
        SqliteGraphRepository::new(self.conn)
    }

    /// Analyser over the state as seen inside this transaction.
    pub fn analyser(&self) -> CoreResult<DependencyAnalyser> {
        Ok(DependencyAnalyser::load(self.conn)?)
    }

    pub(crate) fn require_group(&self, id: GroupId) -> CoreResult<Group> {
        self.groups()
            .get_group(id)?
            .ok_or(CoreError::NotFound(EntityRef::Group(id)))
    }

    pub(crate) fn require_tracker(&self, id: TrackerId) -> CoreResult<Tracker> {
        self.features()
            .get_tracker(id)?
            .ok_or(CoreError::NotFound(EntityRef::Tracker(id)))
    }

    pub(crate) fn require_function(&self, id: FunctionId) -> CoreResult<Function> {
        self.functions()
            .get_function(id)?
            .ok_or(CoreError::NotFound(EntityRef::Function(id)))
    }

    pub(crate) fn require_graph(&self, id: GraphId) -> CoreResult<GraphOrStat> {
        self.graphs()
            .get_graph(id)?
            .ok_or(CoreError::NotFound(EntityRef::Graph(id)))
    }
}

/// Trims `value` and rejects blank names.
pub(crate) fn normalize_name(value: &str) -> CoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidArgument("name must not be blank".to_string()));
    }
    Ok(trimmed.to_string())
}
