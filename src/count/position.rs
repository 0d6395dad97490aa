use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use thiserror::Error;

use crate::region::{RefAlt, SampleId, VariantKind};

/// Allele count → samples carrying that many copies.
pub type CountBuckets = BTreeMap<i32, Vec<SampleId>>;

/// Reference bucket holding homozygous reference samples.
pub const HOM_REF: i32 = 2;

/// Display symbol of the deletion-spanning key (also used for MNVs).
pub const DEL_SYMBOL: &str = "*";

/// Display symbol of the insertion-spanning key.
pub const INS_SYMBOL: &str = "+";

const BASES: [&str; 4] = ["A", "T", "G", "C"];

/// Key of a competing allele within a pileup row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AltKey {
    /// Concrete single-nucleotide allele.
    Snv(RefAlt),
    /// Any deletion or MNV spanning the position.
    DeletionSpan,
    /// Any insertion anchored at the position.
    InsertionSpan,
}

impl AltKey {
    /// Key under which a variation interval is counted, if its kind has one.
    pub fn for_variation(kind: VariantKind, ref_alt: &RefAlt) -> Option<Self> {
        match kind {
            VariantKind::Snv => Some(AltKey::Snv(ref_alt.clone())),
            VariantKind::Deletion | VariantKind::Mnv => Some(AltKey::DeletionSpan),
            VariantKind::Insertion => Some(AltKey::InsertionSpan),
            VariantKind::Reference | VariantKind::NoCall => None,
        }
    }

    /// Alternate base of a single-base SNV key.
    pub fn base(&self) -> Option<&str> {
        match self {
            AltKey::Snv(pair) if BASES.contains(&pair.alternate.as_str()) => {
                Some(pair.alternate.as_str())
            }
            _ => None,
        }
    }
}

impl fmt::Display for AltKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AltKey::Snv(pair) => write!(f, "{pair}"),
            AltKey::DeletionSpan => f.write_str(DEL_SYMBOL),
            AltKey::InsertionSpan => f.write_str(INS_SYMBOL),
        }
    }
}

/// A sample filter with no samples in it.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("sample filter must not be empty")]
pub struct EmptySampleFilter;

/// Aggregated allele counts for one genomic position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlleleCountPosition {
    /// Samples with a failing filter at this position.
    pub not_pass: Vec<SampleId>,
    /// Samples with a passing filter at this position.
    pub pass: Vec<SampleId>,
    /// Reference counts, including the reserved no-call and insertion buckets.
    pub reference: CountBuckets,
    /// Counts of the allele this row is about.
    pub alternate: CountBuckets,
    /// Counts of every other allele observed here.
    pub alt_map: BTreeMap<AltKey, CountBuckets>,
}

impl AlleleCountPosition {
    /// Empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no sample is recorded anywhere.
    pub fn is_empty(&self) -> bool {
        self.not_pass.is_empty()
            && self.pass.is_empty()
            && buckets_empty(&self.reference)
            && buckets_empty(&self.alternate)
            && self.alt_map.values().all(buckets_empty)
    }

    /// Copy restricted to `samples`; empty buckets are dropped.
    pub fn filtered(&self, samples: &BTreeSet<SampleId>) -> Result<Self, EmptySampleFilter> {
        if samples.is_empty() {
            return Err(EmptySampleFilter);
        }
        let mut copy = self.clone();
        copy.retain_samples(samples);
        Ok(copy)
    }

    /// Keep only samples in `query`, deduplicating every list.
    pub fn retain_samples(&mut self, query: &BTreeSet<SampleId>) {
        retain_list(&mut self.not_pass, query);
        retain_list(&mut self.pass, query);
        retain_buckets(&mut self.reference, query);
        retain_buckets(&mut self.alternate, query);
        for buckets in self.alt_map.values_mut() {
            retain_buckets(buckets, query);
        }
        self.alt_map.retain(|_, buckets| !buckets.is_empty());
    }

    /// Drop the homozygous reference bucket.
    pub fn without_hom_ref(mut self) -> Self {
        self.reference.remove(&HOM_REF);
        self
    }

    /// Every sample id mentioned anywhere in the row.
    pub fn sample_ids(&self) -> BTreeSet<SampleId> {
        let mut ids: BTreeSet<SampleId> = self.not_pass.iter().chain(&self.pass).copied().collect();
        for buckets in std::iter::once(&self.reference)
            .chain(std::iter::once(&self.alternate))
            .chain(self.alt_map.values())
        {
            ids.extend(buckets.values().flatten().copied());
        }
        ids
    }
}

fn buckets_empty(buckets: &CountBuckets) -> bool {
    buckets.values().all(Vec::is_empty)
}

fn retain_list(ids: &mut Vec<SampleId>, query: &BTreeSet<SampleId>) {
    ids.retain(|id| query.contains(id));
    ids.sort_unstable();
    ids.dedup();
}

fn retain_buckets(buckets: &mut CountBuckets, query: &BTreeSet<SampleId>) {
    for ids in buckets.values_mut() {
        retain_list(ids, query);
    }
    buckets.retain(|_, ids| !ids.is_empty());
}

/// Append `ids` to bucket `count`.
pub fn add_to_bucket(
    buckets: &mut CountBuckets,
    count: i32,
    ids: impl IntoIterator<Item = SampleId>,
) {
    buckets.entry(count).or_default().extend(ids);
}

/// Sample → summed allele count over all buckets.
pub fn sample_counts(buckets: &CountBuckets) -> BTreeMap<SampleId, i32> {
    let mut counts = BTreeMap::new();
    for (&count, ids) in buckets {
        for &id in ids {
            *counts.entry(id).or_insert(0) += count;
        }
    }
    counts
}

/// Inverse of [`sample_counts`], with sorted sample lists.
pub fn buckets_from_counts(counts: &BTreeMap<SampleId, i32>) -> CountBuckets {
    let mut buckets = CountBuckets::new();
    for (&id, &count) in counts {
        buckets.entry(count).or_default().push(id);
    }
    buckets
}
