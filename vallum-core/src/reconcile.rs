//! Reconcile - Minimal add/remove delta between two collections
//!
//! For attach/detach style collections (subnet mappings, endpoint
//! associations), compute the elements to add and remove so the current
//! collection becomes the desired one.

use std::collections::HashSet;
use std::hash::Hash;

/// Disjoint add/remove sets transforming `current` into `desired`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delta<K: Eq + Hash> {
    pub to_add: HashSet<K>,
    pub to_remove: HashSet<K>,
}

impl<K: Eq + Hash> Delta<K> {
    /// True when nothing needs to change.
    pub fn is_noop(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Compute `to_add = desired − current` and `to_remove = current − desired`.
///
/// Ordering is the caller's concern: when the remote system forbids an empty
/// collection mid-transition, apply `to_add` before `to_remove`. When
/// `current` is empty there is nothing to remove and the removal phase can
/// be skipped entirely.
pub fn reconcile<K>(current: &HashSet<K>, desired: &HashSet<K>) -> Delta<K>
where
    K: Eq + Hash + Clone,
{
    Delta {
        to_add: desired.difference(current).cloned().collect(),
        to_remove: current.difference(desired).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn disjoint_add_and_remove() {
        let current = set(&["a", "b"]);
        let desired = set(&["b", "c"]);
        let delta = reconcile(&current, &desired);
        assert_eq!(delta.to_add, set(&["c"]));
        assert_eq!(delta.to_remove, set(&["a"]));
        assert!(delta.to_add.is_disjoint(&delta.to_remove));
    }

    #[test]
    fn equal_sets_are_a_noop() {
        let current = set(&["a", "b"]);
        let delta = reconcile(&current, &current.clone());
        assert!(delta.is_noop());
    }

    #[test]
    fn empty_current_only_adds() {
        let delta = reconcile(&set(&[]), &set(&["a"]));
        assert_eq!(delta.to_add, set(&["a"]));
        assert!(delta.to_remove.is_empty());
    }

    #[test]
    fn empty_desired_only_removes() {
        let delta = reconcile(&set(&["a", "b"]), &set(&[]));
        assert!(delta.to_add.is_empty());
        assert_eq!(delta.to_remove, set(&["a", "b"]));
    }

    /// Applying the delta to `current` must always yield `desired`, for
    /// every subset pair over a small universe.
    #[test]
    fn applying_delta_yields_desired_over_all_subset_pairs() {
        let universe = ["a", "b", "c"];
        let subsets: Vec<HashSet<String>> = (0u32..8)
            .map(|bits| {
                universe
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| bits & (1 << i) != 0)
                    .map(|(_, s)| s.to_string())
                    .collect()
            })
            .collect();

        for current in &subsets {
            for desired in &subsets {
                let delta = reconcile(current, desired);
                assert!(delta.to_add.is_disjoint(&delta.to_remove));

                let mut applied: HashSet<String> =
                    current.union(&delta.to_add).cloned().collect();
                applied.retain(|k| !delta.to_remove.contains(k));
                assert_eq!(&applied, desired, "current={current:?} desired={desired:?}");
            }
        }
    }
}
