//! Cascading effects of feature deletion and data changes.
//!
//! # Invariants
//! - Dependent graphs are computed before the delete, orphans after it.
//! - A graph is announced either as deleted or as updated, never both.
//! - Surviving multi-feature graphs lose their dangling references.

use super::scope::TxScope;
use crate::analysis::FeatureKind;
use crate::error::CoreResult;
use crate::events::ChangeEvent;
use crate::model::{FeatureId, GraphId};
use crate::repo::feature_repo::FeatureRepository;
use crate::repo::graph_repo::GraphRepository;
use log::debug;
use std::collections::{BTreeSet, HashSet};

/// Deletes `feature_ids` (with their data points and function rows) and
/// cleans up the graphs that read them.
///
/// Records a deletion event per feature, `FunctionUpdated` for surviving
/// functions that listed a deleted feature as input, then the graph events.
/// Returns the ids of graphs deleted as orphans.
pub(crate) fn delete_features(
    scope: &mut TxScope<'_>,
    feature_ids: &[FeatureId],
) -> CoreResult<Vec<GraphId>> {
    let before = scope.analyser()?;
    let deleted: BTreeSet<FeatureId> = feature_ids.iter().copied().collect();
    let dependent_graphs = before.dependent_graphs_of_all(deleted.iter().copied());
    let broken_functions: BTreeSet<FeatureId> = deleted
        .iter()
        .flat_map(|id| before.direct_dependents_of(*id))
        .filter(|id| !deleted.contains(id))
        .collect();

    let features = scope.features();
    let mut events = Vec::with_capacity(deleted.len() + broken_functions.len());
    for feature_id in &deleted {
        let event = match before.feature_kind(*feature_id) {
            Some(FeatureKind::Tracker) => ChangeEvent::TrackerDeleted(*feature_id),
            Some(FeatureKind::Function) => ChangeEvent::FunctionDeleted(*feature_id),
            None => continue,
        };
        features.delete_feature(*feature_id)?;
        events.push(event);
    }
    events.extend(broken_functions.into_iter().map(ChangeEvent::FunctionUpdated));
    for event in events {
        scope.record(event);
    }

    clean_up_graphs(scope, &dependent_graphs)
}

/// Deletes orphaned graphs and marks the rest of `dependent_graphs` for
/// recompute, pruning references to features that no longer exist.
pub(crate) fn clean_up_graphs(
    scope: &mut TxScope<'_>,
    dependent_graphs: &BTreeSet<GraphId>,
) -> CoreResult<Vec<GraphId>> {
    let after = scope.analyser()?;
    let orphaned = after.orphaned_graphs();
    let existing: HashSet<FeatureId> = after.snapshot().features.keys().copied().collect();
    let graphs = scope.graphs();

    let mut events = Vec::new();
    for graph_id in &orphaned {
        if graphs.delete_graph(*graph_id)? {
            events.push(ChangeEvent::GraphDeleted(*graph_id));
        }
    }

    let mut pruned = 0usize;
    for graph_id in dependent_graphs.difference(&orphaned) {
        let Some(mut graph) = graphs.get_graph(*graph_id)? else {
            continue;
        };
        if graph.config.prune_missing(&existing) {
            graphs.update_graph(&graph)?;
            pruned += 1;
        }
        events.push(ChangeEvent::GraphUpdated(*graph_id));
    }

    debug!(
        "event=graph_cleanup module=service status=ok orphaned={} pruned={pruned}",
        orphaned.len()
    );
    for event in events {
        scope.record(event);
    }
    Ok(orphaned.into_iter().collect())
}

/// Records `DataPoint` for each changed feature followed by one
/// `GraphUpdated` per graph depending on any of them.
pub(crate) fn announce_data_change(
    scope: &mut TxScope<'_>,
    feature_ids: &BTreeSet<FeatureId>,
) -> CoreResult<()> {
    if feature_ids.is_empty() {
        return Ok(());
    }
    let analyser = scope.analyser()?;
    let graphs = analyser.dependent_graphs_of_all(feature_ids.iter().copied());
    for feature_id in feature_ids {
        scope.record(ChangeEvent::DataPoint(*feature_id));
    }
    for graph_id in graphs {
        scope.record(ChangeEvent::GraphUpdated(graph_id));
    }
    Ok(())
}
