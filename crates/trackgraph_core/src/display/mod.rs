//! Display composition for group screens.
//!
//! # Responsibility
//! - Merge child groups, features and graphs of one group into a single
//!   ordered list.
//! - Map change events to the slices that need reloading.
//!
//! # Invariants
//! - Ordering is `display_index ASC, id DESC`; a `(kind, id)` pair appears
//!   at most once.
//! - Display code reads through `DataService` and never writes.

mod composer;
mod group_child;
mod group_view;
mod refresh;

pub use composer::ChildComposer;
pub use group_child::{
    sort_group_children, DisplayFunction, DisplayGraph, GroupChild, GroupChildKind,
};
pub use group_view::GroupView;
pub use refresh::RefreshPlan;
