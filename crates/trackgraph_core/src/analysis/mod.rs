//! Dependency analysis over a loaded snapshot of the entity store.
//!
//! # Responsibility
//! - Answer reachability questions between features (ancestors and
//!   descendants through function inputs).
//! - Derive graph effects of a change: dependent graphs, orphaned graphs,
//!   evaluation validity.
//! - Check group moves for parent-link cycles.
//!
//! # Invariants
//! - Every query is total over any persisted state, including dangling
//!   inputs and corrupt cycles; traversals track visited ids and stop.
//! - Walks are pure in-memory computation once the snapshot is loaded.

pub mod dependency;
pub mod group_ancestry;
pub mod reachability;

pub use dependency::{DependencyAnalyser, DependencySnapshot, FeatureKind};
pub use group_ancestry::would_create_group_cycle;
