//! Breadth-first reachability with an explicit visited set.

use std::collections::{BTreeSet, VecDeque};

/// Result of one reachability walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reach<T: Ord> {
    /// Every node reached, including the start node.
    pub visited: BTreeSet<T>,
    /// Some edge led back to the start node.
    pub returned_to_start: bool,
}

/// Walks `next` edges from `start` until no unvisited node remains.
pub fn reachable_from<T, I>(start: T, mut next: impl FnMut(T) -> I) -> Reach<T>
where
    T: Ord + Copy,
    I: IntoIterator<Item = T>,
{
    let mut visited = BTreeSet::from([start]);
    let mut returned_to_start = false;
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        for neighbour in next(current) {
            if neighbour == start {
                returned_to_start = true;
            }
            if visited.insert(neighbour) {
                queue.push_back(neighbour);
            }
        }
    }
    Reach {
        visited,
        returned_to_start,
    }
}

#[cfg(test)]
mod tests {
    use super::reachable_from;
    use std::collections::{BTreeSet, HashMap};

    #[test]
    fn walks_chain_and_flags_loop() {
        let edges: HashMap<i64, Vec<i64>> = HashMap::from([(1, vec![2]), (2, vec![3]), (3, vec![1])]);
        let reach = reachable_from(1, |node| edges.get(&node).cloned().unwrap_or_default());
        assert_eq!(reach.visited, BTreeSet::from([1, 2, 3]));
        assert!(reach.returned_to_start);
    }

    #[test]
    fn isolated_node_reaches_itself() {
        let reach = reachable_from(5, |_| Vec::new());
        assert_eq!(reach.visited, BTreeSet::from([5]));
        assert!(!reach.returned_to_start);
    }
}
