//! End-position index of samples already claimed by wide variants.

use std::collections::BTreeMap;

use super::target::TargetVariant;
use crate::count::AlleleCountPosition;
use crate::region::{SampleId, VariantKind};

/// `end position → sample → cumulative allele count` of registered
/// indels and MNVs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlapIndex {
    ends: BTreeMap<i64, BTreeMap<SampleId, i32>>,
}

impl OverlapIndex {
    /// Empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the alternate carriers of `target` under its end position.
    ///
    /// SNVs never cover a neighbouring position and are skipped.
    pub fn register(&mut self, target: &TargetVariant, counts: &AlleleCountPosition) {
        if target.kind == VariantKind::Snv {
            return;
        }
        let samples = self.ends.entry(target.end).or_default();
        for (&count, ids) in &counts.alternate {
            for &id in ids {
                *samples.entry(id).or_insert(0) += count;
            }
        }
    }

    /// Add a single entry directly.
    pub fn insert(&mut self, end: i64, sample: SampleId, count: i32) {
        *self.ends.entry(end).or_default().entry(sample).or_insert(0) += count;
    }

    /// Drop every end position below `position`.
    pub fn prune_before(&mut self, position: i64) {
        self.ends = self.ends.split_off(&position);
    }

    /// Forget everything, e.g. on a chromosome change.
    pub fn clear(&mut self) {
        self.ends.clear();
    }

    /// Sample → summed count over the end positions covering `target`.
    ///
    /// Insertions are covered by entries ending right before the marker;
    /// everything else by entries ending at or after its own end.
    pub fn fully_covered(&self, target: &TargetVariant) -> BTreeMap<SampleId, i32> {
        let mut covered = BTreeMap::new();
        let ends = if target.start > target.end {
            self.ends.range(target.end..target.start)
        } else {
            self.ends.range(target.end.max(target.start)..)
        };
        for samples in ends.map(|(_, samples)| samples) {
            for (&id, &count) in samples {
                *covered.entry(id).or_insert(0) += count;
            }
        }
        covered
    }

    /// Number of end positions tracked.
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    /// Whether nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RefAlt;

    fn target(start: i64, reference: &str, alternate: &str) -> TargetVariant {
        TargetVariant::from_ref_alt("1", start, RefAlt::new(reference, alternate))
    }

    fn carriers(pairs: &[(i32, &[SampleId])]) -> AlleleCountPosition {
        let mut counts = AlleleCountPosition::new();
        for (count, ids) in pairs {
            counts.alternate.insert(*count, ids.to_vec());
        }
        counts
    }

    #[test]
    fn snvs_are_not_registered() {
        let mut index = OverlapIndex::new();
        index.register(&target(10, "A", "G"), &carriers(&[(1, &[1])]));
        assert!(index.is_empty());
    }

    #[test]
    fn deletion_covers_positions_up_to_its_end() {
        let mut index = OverlapIndex::new();
        index.register(&target(10, "ACGT", ""), &carriers(&[(1, &[1]), (2, &[2])]));
        assert_eq!(index.fully_covered(&target(12, "G", "T")), BTreeMap::from([(1, 1), (2, 2)]));
        assert_eq!(index.fully_covered(&target(13, "T", "A")), BTreeMap::from([(1, 1), (2, 2)]));
        assert!(index.fully_covered(&target(14, "C", "A")).is_empty());
        // a longer deletion starting inside is not covered
        assert!(index.fully_covered(&target(12, "GTA", "")).is_empty());
    }

    #[test]
    fn insertion_is_covered_by_entries_ending_before_the_marker() {
        let mut index = OverlapIndex::new();
        index.insert(11, 5, 1);
        index.insert(12, 6, 1);
        assert_eq!(index.fully_covered(&target(12, "", "AT")), BTreeMap::from([(5, 1)]));
    }

    #[test]
    fn pruning_drops_older_ends() {
        let mut index = OverlapIndex::new();
        index.insert(9, 1, 1);
        index.insert(11, 1, 1);
        index.prune_before(10);
        assert_eq!(index.len(), 1);
        index.clear();
        assert!(index.is_empty());
    }
}
