//! Parent-link cycle check for group moves.

use crate::model::GroupId;
use std::collections::HashSet;

/// Returns whether making `destination` the parent of `moved` would close a
/// loop in the group tree.
///
/// Walks parent pointers from `destination` toward the root. The walk stops
/// at the root (`parent_of` returns `None`), when `moved` is met, or when a
/// group repeats; the last two mean a cycle.
pub fn would_create_group_cycle<E>(
    moved: GroupId,
    destination: GroupId,
    mut parent_of: impl FnMut(GroupId) -> Result<Option<GroupId>, E>,
) -> Result<bool, E> {
    let mut visited = HashSet::new();
    let mut cursor = Some(destination);
    while let Some(current) = cursor {
        if current == moved {
            return Ok(true);
        }
        if !visited.insert(current) {
            return Ok(true);
        }
        cursor = parent_of(current)?;
    }
    Ok(false)
}
