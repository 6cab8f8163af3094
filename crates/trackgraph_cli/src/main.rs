//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `trackgraph_core` linkage with one create, insert, delete cascade
//!   against an in-memory store.
//! - Keep output deterministic for quick local sanity checks.

use std::process::ExitCode;
use trackgraph_core::{
    CoreResult, DataPoint, DataService, DataType, FunctionCreateRequest, GraphConfig,
    GraphCreateRequest, TrackerCreateRequest, ROOT_GROUP_ID,
};

fn main() -> ExitCode {
    println!("trackgraph_core ping={}", trackgraph_core::ping());
    println!("trackgraph_core version={}", trackgraph_core::core_version());
    match run_cascade_probe() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("probe failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_cascade_probe() -> CoreResult<()> {
    let service = DataService::open_in_memory()?;
    let mut events = service.subscribe();

    let tracker = service.create_tracker(&TrackerCreateRequest::new(
        "probe",
        ROOT_GROUP_ID,
        DataType::Continuous,
    ))?;
    service.insert_data_point(&DataPoint::new(tracker.feature_id, 0, 1.0))?;
    let function = service.create_function(&FunctionCreateRequest::passthrough(
        "probe fn",
        ROOT_GROUP_ID,
        vec![tracker.feature_id],
    ))?;
    service.create_graph(&GraphCreateRequest::new(
        ROOT_GROUP_ID,
        "probe graph",
        GraphConfig::last_value(function.feature_id),
    ))?;
    let deleted_graphs = service.delete_tracker(tracker.id)?;

    for event in events.drain() {
        println!("event={}", event.name());
    }
    println!("deleted_graphs={}", deleted_graphs.len());
    Ok(())
}
