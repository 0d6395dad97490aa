//! Ordered per-window driver: variant map → combined per-allele rows.

use std::cmp::Reverse;
use std::collections::BTreeSet;

use tracing::{debug, info};

use super::combiner::{AlleleCombiner, CombineError};
use super::overlap::OverlapIndex;
use super::target::TargetVariant;
use crate::count::{AlleleCalculator, AlleleCountPosition, RegionCalculator};
use crate::region::{Interval, SampleId};

/// A target allele with its combined counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedAllele {
    /// The allele.
    pub target: TargetVariant,
    /// Counts as if only this allele existed.
    pub counts: AlleleCountPosition,
}

/// Streams positions in ascending order, keeping an overlap index across
/// them so wide variants are not counted again as reference downstream.
#[derive(Debug, Clone)]
pub struct AlleleTransfer {
    chromosome: String,
    combiner: AlleleCombiner,
    overlaps: OverlapIndex,
}

impl AlleleTransfer {
    /// Transfer for `chromosome` over the indexed samples.
    pub fn new(chromosome: impl Into<String>, indexed: BTreeSet<SampleId>) -> Self {
        Self {
            chromosome: chromosome.into(),
            combiner: AlleleCombiner::new(indexed),
            overlaps: OverlapIndex::new(),
        }
    }

    /// Current chromosome.
    pub fn chromosome(&self) -> &str {
        &self.chromosome
    }

    /// Switch chromosome; the overlap index starts empty.
    pub fn reset(&mut self, chromosome: impl Into<String>) {
        self.chromosome = chromosome.into();
        self.overlaps.clear();
    }

    /// Overlap index as accumulated so far.
    pub fn overlaps(&self) -> &OverlapIndex {
        &self.overlaps
    }

    /// Combine every target at one position against its sparse pileup row.
    ///
    /// Targets are ordered by width, then end, then longest allele first.
    /// Insertions are registered and combined before everything else.
    pub fn process_position(
        &mut self,
        pileup: &AlleleCountPosition,
        mut targets: Vec<(TargetVariant, AlleleCountPosition)>,
    ) -> Result<Vec<CombinedAllele>, CombineError> {
        targets.sort_by_key(|(target, _)| (target.width(), target.end, Reverse(target.length())));
        let (insertions, others): (Vec<_>, Vec<_>) =
            targets.into_iter().partition(|(target, _)| target.is_insertion());

        let mut combined = Vec::with_capacity(insertions.len() + others.len());
        for group in [insertions, others] {
            for (target, counts) in &group {
                self.overlaps.register(target, counts);
            }
            for (target, counts) in group {
                let counts = self.combiner.combine(&target, pileup, &counts, &self.overlaps)?;
                debug!(target = %target, "combined allele");
                combined.push(CombinedAllele { target, counts });
            }
        }
        Ok(combined)
    }

    /// Combine every allele starting inside `window`.
    pub fn transfer_window(
        &mut self,
        calculator: &RegionCalculator,
        window: &Interval<()>,
    ) -> Result<Vec<CombinedAllele>, CombineError> {
        let variants = calculator.build_variant_map(window)?;
        let pileup = calculator.build_pileup_map(window)?;

        let mut combined = Vec::new();
        for (position, alleles) in variants {
            if !window.contains_position(position) {
                continue;
            }
            // insertions at `position` look at ends up to `position - 1`
            self.overlaps.prune_before(position - 1);
            let row = pileup
                .get(&position)
                .cloned()
                .unwrap_or_default()
                .without_hom_ref();
            let targets = alleles
                .into_iter()
                .map(|(ref_alt, counts)| {
                    let target =
                        TargetVariant::from_ref_alt(self.chromosome.as_str(), position, ref_alt);
                    (target, counts)
                })
                .collect();
            combined.extend(self.process_position(&row, targets)?);
        }
        info!(
            chromosome = %self.chromosome,
            start = window.start,
            end = window.end,
            alleles = combined.len(),
            "transferred window"
        );
        Ok(combined)
    }
}
