use crate::identifier::ClientSet;
use log::debug;
use serde::{Deserialize, Serialize};

/// Classification of one reconciliation run. Computed once and never
/// mutated: every client of `base ∪ current` sits in exactly one of
/// `stayed`, `entered` or `left`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Reconciliation {
    /// In both rosters
    pub stayed: ClientSet,
    /// In the current roster only
    pub entered: ClientSet,
    /// In the base roster only
    pub left: ClientSet,
    /// New clients already attributed through the inclusions extract
    pub attributed_entries: ClientSet,
}

impl Reconciliation {
    pub fn universe(&self) -> ClientSet {
        self.stayed
            .iter()
            .chain(self.entered.iter())
            .chain(self.left.iter())
            .cloned()
            .collect()
    }

    /// New clients with no attribution in the inclusions extract.
    pub fn untracked_entries(&self) -> ClientSet {
        self.entered
            .difference(&self.attributed_entries)
            .cloned()
            .collect()
    }

    /// True when the three classes are pairwise disjoint and cover exactly
    /// `base ∪ current`.
    pub fn is_partition_of(&self, base: &ClientSet, current: &ClientSet) -> bool {
        let disjoint = self.stayed.is_disjoint(&self.entered)
            && self.stayed.is_disjoint(&self.left)
            && self.entered.is_disjoint(&self.left);

        let union: ClientSet = base.union(current).cloned().collect();

        disjoint && self.universe() == union
    }
}

pub struct SetReconciler;

impl SetReconciler {
    pub fn reconcile(base: &ClientSet, current: &ClientSet, aux: &ClientSet) -> Reconciliation {
        let stayed: ClientSet = base.intersection(current).cloned().collect();
        let entered: ClientSet = current.difference(base).cloned().collect();
        let left: ClientSet = base.difference(current).cloned().collect();
        let attributed_entries: ClientSet = aux.intersection(&entered).cloned().collect();

        debug!(
            "Reconciled {} base / {} current / {} auxiliary clients: {} stayed, {} entered, {} left, {} attributed",
            base.len(),
            current.len(),
            aux.len(),
            stayed.len(),
            entered.len(),
            left.len(),
            attributed_entries.len()
        );

        Reconciliation {
            stayed,
            entered,
            left,
            attributed_entries,
        }
    }
}

pub fn reconcile(base: &ClientSet, current: &ClientSet, aux: &ClientSet) -> Reconciliation {
    SetReconciler::reconcile(base, current, aux)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::normalize_key;

    fn set(keys: &[&str]) -> ClientSet {
        keys.iter().filter_map(|k| normalize_key(k)).collect()
    }

    #[test]
    fn test_basic_reconciliation() {
        let base = set(&["A", "B", "C"]);
        let current = set(&["B", "C", "D"]);
        let aux = set(&["D", "B", "Z"]);

        let result = reconcile(&base, &current, &aux);

        assert_eq!(result.stayed, set(&["B", "C"]));
        assert_eq!(result.entered, set(&["D"]));
        assert_eq!(result.left, set(&["A"]));
        assert_eq!(result.attributed_entries, set(&["D"]));
        assert!(result.untracked_entries().is_empty());
        assert!(result.is_partition_of(&base, &current));
    }

    #[test]
    fn test_empty_inputs_degrade_gracefully() {
        let empty = ClientSet::new();
        let result = reconcile(&empty, &empty, &empty);

        assert_eq!(result, Reconciliation::default());
        assert!(result.is_partition_of(&empty, &empty));
    }

    #[test]
    fn test_partition_over_many_shapes() {
        let cases: Vec<(Vec<&str>, Vec<&str>)> = vec![
            (vec![], vec!["x"]),
            (vec!["x"], vec![]),
            (vec!["1", "2", "3"], vec!["1", "2", "3"]),
            (vec!["1", "2"], vec!["3", "4"]),
            (vec!["a", "b", "c", "d"], vec!["c", "d", "e"]),
        ];

        for (b, c) in cases {
            let base = set(&b);
            let current = set(&c);
            let result = reconcile(&base, &current, &ClientSet::new());
            assert!(
                result.is_partition_of(&base, &current),
                "not a partition for base={:?} current={:?}",
                b,
                c
            );
        }
    }

    #[test]
    fn test_untracked_entries_excludes_attributed() {
        let result = reconcile(&set(&["A"]), &set(&["A", "N1", "N2"]), &set(&["N2"]));
        assert_eq!(result.untracked_entries(), set(&["N1"]));
    }
}
