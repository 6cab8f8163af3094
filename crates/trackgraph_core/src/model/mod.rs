//! Domain model for trackers, functions, groups, graphs and data points.
//!
//! # Responsibility
//! - Define the value types exchanged between store, analyser and service.
//! - Keep identifiers as plain integer keys assigned by the entity store.
//!
//! # Invariants
//! - A `FeatureId` identifies exactly one tracker or one function.
//! - Group `ROOT_GROUP_ID` always exists and has no parent.

pub mod data_point;
pub mod feature;
pub mod function;
pub mod function_graph;
pub mod graph;
pub mod group;
pub mod validity;

/// Identity shared by trackers and functions; the unit of dependency.
pub type FeatureId = i64;
/// Tracker row id (distinct from its feature id).
pub type TrackerId = i64;
/// Function row id (distinct from its feature id).
pub type FunctionId = i64;
/// Group id.
pub type GroupId = i64;
/// Graph/stat id.
pub type GraphId = i64;

/// The root group created by the first migration.
pub const ROOT_GROUP_ID: GroupId = 0;
