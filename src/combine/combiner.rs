use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use super::overlap::OverlapIndex;
use super::target::TargetVariant;
use crate::count::{
    buckets_from_counts, sample_counts, AlleleCountPosition, AltKey, CountBuckets,
    CalculatorError, HOM_REF,
};
use crate::region::{SampleId, VariantKind, NO_CALL};

/// Errors raised while projecting a pileup onto one allele.
#[derive(Debug, Error)]
pub enum CombineError {
    /// The target allele has no carriers at all.
    #[error("target allele {target} has no alternate calls")]
    NoAlternate {
        /// Offending target, `chrom:pos:ref:alt`.
        target: String,
    },

    /// Pileup key the target kind has no rule for.
    #[error("cannot combine pileup key `{key}` into {target}")]
    UnexpectedAltKey {
        /// Pileup key.
        key: String,
        /// Target, `chrom:pos:ref:alt`.
        target: String,
    },

    /// A sample's insertion-relative reference count was not moved over
    /// before the reference merge.
    #[error("insertion reference of sample {sample} was not transferred for {target}")]
    InsertionReferenceNotTransferred {
        /// Sample id.
        sample: SampleId,
        /// Target, `chrom:pos:ref:alt`.
        target: String,
    },

    /// Target of a kind that cannot carry alternates.
    #[error("{target} is not an alternate allele")]
    NotAnAlternate {
        /// Target, `chrom:pos:ref:alt`.
        target: String,
    },

    /// Building the aggregate views failed.
    #[error(transparent)]
    Calculator(#[from] CalculatorError),
}

/// Re-projects a multi-allelic pileup row onto a single target allele.
#[derive(Debug, Clone)]
pub struct AlleleCombiner {
    indexed: BTreeSet<SampleId>,
}

impl AlleleCombiner {
    /// Combiner limited to the given indexed samples.
    pub fn new(indexed: BTreeSet<SampleId>) -> Self {
        Self { indexed }
    }

    /// Indexed sample ids.
    pub fn indexed(&self) -> &BTreeSet<SampleId> {
        &self.indexed
    }

    /// Combine the sparse pileup row `from` with the target's own counts.
    ///
    /// `variant` holds the target's alternate buckets; the returned row is
    /// a copy of it with reference, other alleles and not-pass filled in.
    pub fn combine(
        &self,
        target: &TargetVariant,
        from: &AlleleCountPosition,
        variant: &AlleleCountPosition,
        overlaps: &OverlapIndex,
    ) -> Result<AlleleCountPosition, CombineError> {
        if variant.alternate.values().all(Vec::is_empty) {
            return Err(CombineError::NoAlternate {
                target: target.to_string(),
            });
        }
        let mut to = variant.clone();
        to.not_pass
            .extend(from.not_pass.iter().filter(|&&id| self.indexed.contains(&id)));
        to.not_pass.sort_unstable();
        to.not_pass.dedup();

        let mut covered = overlaps.fully_covered(target);
        match target.kind {
            VariantKind::Snv => {
                for (key, buckets) in &from.alt_map {
                    copy_snv(key, buckets, target, &mut to)?;
                }
                copy_reference(from, &mut to);
            }
            VariantKind::Insertion => {
                for (key, buckets) in preferred_first(&from.alt_map, &AltKey::InsertionSpan) {
                    copy_insertion(key, buckets, target, from, &mut to, &mut covered)?;
                }
                copy_insertion_reference(target, from, &mut to)?;
            }
            VariantKind::Deletion => {
                for (key, buckets) in preferred_first(&from.alt_map, &AltKey::DeletionSpan) {
                    copy_deletion(key, buckets, target, from, &mut to, &mut covered)?;
                }
                copy_reference(from, &mut to);
            }
            VariantKind::Mnv => {
                for (key, buckets) in &from.alt_map {
                    copy_deletion(key, buckets, target, from, &mut to, &mut covered)?;
                }
                copy_reference(from, &mut to);
            }
            VariantKind::Reference | VariantKind::NoCall => {
                return Err(CombineError::NotAnAlternate {
                    target: target.to_string(),
                })
            }
        }
        Ok(to)
    }
}

fn preferred_first<'a>(
    alt_map: &'a BTreeMap<AltKey, CountBuckets>,
    first: &'a AltKey,
) -> impl Iterator<Item = (&'a AltKey, &'a CountBuckets)> + 'a {
    alt_map
        .get_key_value(first)
        .into_iter()
        .chain(alt_map.iter().filter(move |(key, _)| *key != first))
}

fn unexpected(key: &AltKey, target: &TargetVariant) -> CombineError {
    CombineError::UnexpectedAltKey {
        key: key.to_string(),
        target: target.to_string(),
    }
}

/// Append every bucket of `from` to `to`.
fn merge_buckets(from: &CountBuckets, to: &mut CountBuckets) {
    for (&count, ids) in from {
        if !ids.is_empty() {
            to.entry(count).or_default().extend(ids.iter().copied());
        }
    }
}

fn transfer(key: &AltKey, from: &CountBuckets, to: &mut AlleleCountPosition) {
    if from.values().all(Vec::is_empty) {
        return;
    }
    merge_buckets(from, to.alt_map.entry(key.clone()).or_default());
}

/// Subtract the target's own calls from the covered counts.
fn remove_current_calls(covered: &mut BTreeMap<SampleId, i32>, alternate: &CountBuckets) {
    for (&count, ids) in alternate {
        for id in ids {
            if let Some(total) = covered.get_mut(id) {
                if *total > 0 {
                    *total -= count;
                    if *total <= 0 {
                        covered.remove(id);
                    }
                }
            }
        }
    }
}

fn copy_snv(
    key: &AltKey,
    buckets: &CountBuckets,
    target: &TargetVariant,
    to: &mut AlleleCountPosition,
) -> Result<(), CombineError> {
    match key {
        AltKey::Snv(pair) if pair.alternate == target.ref_alt.alternate => Ok(()),
        AltKey::InsertionSpan | AltKey::DeletionSpan => {
            transfer(key, buckets, to);
            Ok(())
        }
        AltKey::Snv(_) if key.base().is_some() => {
            transfer(key, buckets, to);
            Ok(())
        }
        AltKey::Snv(_) => Err(unexpected(key, target)),
    }
}

fn copy_deletion(
    key: &AltKey,
    buckets: &CountBuckets,
    target: &TargetVariant,
    from: &AlleleCountPosition,
    to: &mut AlleleCountPosition,
    covered: &mut BTreeMap<SampleId, i32>,
) -> Result<(), CombineError> {
    match key {
        AltKey::DeletionSpan => {
            let mut smaller = sample_counts(buckets);
            smaller.retain(|id, _| !covered.contains_key(id));
            remove_current_calls(covered, &to.alternate);
            transfer(key, &buckets_from_counts(covered), to);
            for (id, count) in smaller {
                to.reference.entry(count).or_default().push(id);
            }
        }
        AltKey::Snv(_) if key.base().is_some() => merge_buckets(buckets, &mut to.reference),
        AltKey::Snv(_) => return Err(unexpected(key, target)),
        AltKey::InsertionSpan => {
            let alternate = sample_counts(&to.alternate);
            let other_deletions = from
                .alt_map
                .get(&AltKey::DeletionSpan)
                .map(sample_counts)
                .unwrap_or_default();
            let positive: CountBuckets = from
                .reference
                .range(1..)
                .map(|(&count, ids)| (count, ids.clone()))
                .collect();
            let from_reference = sample_counts(&positive);
            let mut reference = sample_counts(&to.reference);
            let mut changed = false;
            for (id, count) in sample_counts(buckets) {
                if from_reference.contains_key(&id) {
                    continue;
                }
                if alternate.contains_key(&id) && !reference.contains_key(&id) {
                    reference.insert(id, count);
                    changed = true;
                } else if !alternate.contains_key(&id) && other_deletions.contains_key(&id) {
                    // insertion and deletion called together at one site
                    *reference.entry(id).or_insert(0) += count;
                    changed = true;
                }
            }
            if changed {
                to.reference = buckets_from_counts(&reference);
            }
        }
    }
    Ok(())
}

fn copy_insertion(
    key: &AltKey,
    buckets: &CountBuckets,
    target: &TargetVariant,
    from: &AlleleCountPosition,
    to: &mut AlleleCountPosition,
    covered: &mut BTreeMap<SampleId, i32>,
) -> Result<(), CombineError> {
    match key {
        AltKey::InsertionSpan => {
            remove_current_calls(covered, &to.alternate);
            transfer(key, &buckets_from_counts(covered), to);
            for (&count, ids) in from.reference.range(..NO_CALL) {
                to.reference
                    .entry(-(count - NO_CALL))
                    .or_default()
                    .extend(ids.iter().copied());
            }
        }
        AltKey::DeletionSpan => transfer(key, buckets, to),
        AltKey::Snv(_) if key.base().is_some() => {
            let alternate = sample_counts(&to.alternate);
            let reference = sample_counts(&to.reference);
            let other_insertions = from
                .alt_map
                .get(&AltKey::InsertionSpan)
                .map(sample_counts)
                .unwrap_or_default();
            for (&count, ids) in buckets {
                let folded: Vec<SampleId> = ids
                    .iter()
                    .copied()
                    .filter(|id| {
                        let claimed =
                            alternate.contains_key(id) || other_insertions.contains_key(id);
                        // an SNV secondary alternate leaves no reference for the indel
                        !claimed || !reference.contains_key(id)
                    })
                    .collect();
                if !folded.is_empty() {
                    to.reference.entry(count).or_default().extend(folded);
                }
            }
        }
        AltKey::Snv(_) => return Err(unexpected(key, target)),
    }
    Ok(())
}

/// Fold the pileup's reference buckets into the result.
fn copy_reference(from: &AlleleCountPosition, to: &mut AlleleCountPosition) {
    let mut counts = sample_counts(&to.reference);
    for (&count, ids) in from.reference.iter().rev() {
        let ids: BTreeSet<SampleId> = ids.iter().copied().collect();
        for id in ids {
            let current = counts.get(&id).copied().unwrap_or(0);
            if current == 0 && count == NO_CALL {
                counts.insert(id, NO_CALL);
            } else if count > NO_CALL {
                counts.insert(id, current + count);
            }
        }
    }
    to.reference = buckets_from_counts(&counts);
    to.reference.remove(&HOM_REF);
}

/// Merge the remaining reference buckets for an insertion target.
fn copy_insertion_reference(
    target: &TargetVariant,
    from: &AlleleCountPosition,
    to: &mut AlleleCountPosition,
) -> Result<(), CombineError> {
    let mut reference = sample_counts(&to.reference);
    let alternate = sample_counts(&to.alternate);
    let other_insertions: BTreeSet<SampleId> = to
        .alt_map
        .get(&AltKey::InsertionSpan)
        .map(|buckets| buckets.values().flatten().copied().collect())
        .unwrap_or_default();

    for (&count, ids) in &from.reference {
        if count < NO_CALL {
            for &id in ids {
                if reference.get(&id).map_or(true, |&value| value < 0) {
                    return Err(CombineError::InsertionReferenceNotTransferred {
                        sample: id,
                        target: target.to_string(),
                    });
                }
            }
            continue;
        }
        if count == NO_CALL {
            for &id in ids {
                reference.entry(id).or_insert(NO_CALL);
            }
            continue;
        }
        for &id in ids {
            match reference.get(&id).copied() {
                None => {
                    reference.insert(id, count);
                }
                Some(value) if !alternate.contains_key(&id) && !other_insertions.contains(&id) => {
                    let merged = if value == NO_CALL || (value < 0 && count > 0) {
                        count
                    } else if value > 0 && count < 0 {
                        value
                    } else {
                        value + count
                    };
                    reference.insert(id, merged);
                }
                Some(_) => {}
            }
        }
    }
    to.reference = buckets_from_counts(&reference);
    to.reference.remove(&HOM_REF);
    Ok(())
}
