use std::cmp::{max, min};
use std::collections::{BTreeMap, BTreeSet};

use bitvec::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use super::genotype::{
    CallKind, Genotype, GenotypeCall, InvalidGenotype, SampleGenotype, NO_CALL_INDEX,
};
use super::position::{add_to_bucket, AlleleCountPosition, AltKey};
use super::redistribute::redistribute;
use crate::config::StoreConfig;
use crate::region::{
    AlleleIdentity, AlleleObservation, Category, Interval, ObservationInterval, RefAlt,
    RegionStore, SampleId, VariantKind, NO_CALL,
};

/// Pileup rows keyed by position.
pub type PileupMap = BTreeMap<i64, AlleleCountPosition>;

/// Per-allele rows keyed by position, then by allele.
pub type VariantMap = BTreeMap<i64, BTreeMap<RefAlt, AlleleCountPosition>>;

/// Errors raised while ingesting calls or building aggregate views.
#[derive(Debug, Error)]
pub enum CalculatorError {
    /// Sample name is not part of the index.
    #[error("sample `{0}` is not indexed")]
    UnknownSample(String),

    /// Genotype string could not be parsed.
    #[error("sample `{sample}`: {source}")]
    MalformedGenotype {
        /// Sample the genotype belongs to.
        sample: String,
        /// Parse failure.
        #[source]
        source: InvalidGenotype,
    },

    /// Genotype refers to a secondary alternate that was not declared.
    #[error("allele index {index} at position {position} exceeds {available} secondary alternates")]
    AlleleIndexOutOfRange {
        /// Site position.
        position: i64,
        /// Allele index from the genotype.
        index: i32,
        /// Number of declared secondary alternates.
        available: usize,
    },

    /// Allele depth list does not cover a called allele.
    #[error("sample `{sample}` has no allele depth for allele {index}")]
    MissingAlleleDepth {
        /// Sample name.
        sample: String,
        /// Allele index without a depth entry.
        index: i32,
    },

    /// Variant kind the region model cannot represent.
    #[error("unsupported variant kind {kind} at position {position}")]
    UnsupportedKind {
        /// Site position.
        position: i64,
        /// Offending kind.
        kind: CallKind,
    },

    /// Alternate allele called at a reference-only site.
    #[error("alternate allele called at reference-only site {position}")]
    AlternateAtReferenceSite {
        /// Site position.
        position: i64,
    },

    /// Variation interval of a kind without a pileup key.
    #[error("variation interval at {position} has unexpected kind {kind}")]
    UnexpectedVariationKind {
        /// Interval start.
        position: i64,
        /// Stored kind.
        kind: VariantKind,
    },

    /// Query window with `start > end`.
    #[error("inverted query window [{start}, {end}]")]
    InvertedWindow {
        /// Window start.
        start: i64,
        /// Window end.
        end: i64,
    },
}

/// Builds allele observations from genotype calls and aggregates them.
pub trait AlleleCalculator {
    /// Ingest one genotype call.
    fn add_call(&mut self, call: &GenotypeCall) -> Result<(), CalculatorError>;

    /// Per-position pileup over `window`.
    fn build_pileup_map(&self, window: &Interval<()>) -> Result<PileupMap, CalculatorError>;

    /// Per-position, per-allele breakdown over `window`.
    fn build_variant_map(&self, window: &Interval<()>) -> Result<VariantMap, CalculatorError>;

    /// Record no-calls for expected samples without any observation in
    /// `[start, next_start)`.
    fn fill_no_calls(&mut self, expected: &BTreeSet<SampleId>, start: i64, next_start: i64);

    /// Samples with a passing observation at `position`.
    fn pass(&self, position: i64) -> BTreeSet<SampleId>;

    /// Samples with a failing observation at `position`.
    fn not_pass(&self, position: i64) -> BTreeSet<SampleId>;
}

/// Coordinates, kind and identity of one genotype allele.
#[derive(Debug, Clone)]
struct AlleleSite {
    start: i64,
    end: i64,
    kind: VariantKind,
    identity: AlleleIdentity,
}

/// Region-store backed [`AlleleCalculator`] for one window.
#[derive(Debug, Clone)]
pub struct RegionCalculator {
    study: String,
    samples: BTreeMap<String, SampleId>,
    pass_token: String,
    store: RegionStore,
}

impl RegionCalculator {
    /// Calculator with an empty store over `window`.
    pub fn new(
        study: impl Into<String>,
        window: &Interval<()>,
        samples: BTreeMap<String, SampleId>,
        config: &StoreConfig,
    ) -> Self {
        Self::from_store(study, RegionStore::new(window.start, window.end), samples, config)
    }

    /// Calculator over an existing (typically decoded) store.
    pub fn from_store(
        study: impl Into<String>,
        store: RegionStore,
        samples: BTreeMap<String, SampleId>,
        config: &StoreConfig,
    ) -> Self {
        Self {
            study: study.into(),
            samples,
            pass_token: config.pass_token.clone(),
            store,
        }
    }

    /// Study identifier.
    pub fn study(&self) -> &str {
        &self.study
    }

    /// Indexed sample ids.
    pub fn sample_ids(&self) -> BTreeSet<SampleId> {
        self.samples.values().copied().collect()
    }

    /// Sample name → id mapping.
    pub fn samples(&self) -> &BTreeMap<String, SampleId> {
        &self.samples
    }

    /// Underlying store.
    pub fn store(&self) -> &RegionStore {
        &self.store
    }

    /// Give up the calculator, keeping the store.
    pub fn into_store(self) -> RegionStore {
        self.store
    }

    /// Pileup row at a single position (empty when nothing is recorded).
    pub fn build_position_count(
        &self,
        position: i64,
    ) -> Result<AlleleCountPosition, CalculatorError> {
        let mut rows = self.build_pileup_map(&Interval::point(position))?;
        Ok(rows.remove(&position).unwrap_or_default())
    }

    /// Variant-map entry for one allele at one position.
    pub fn build_variant_count(
        &self,
        position: i64,
        allele: &RefAlt,
    ) -> Result<AlleleCountPosition, CalculatorError> {
        let mut rows = self.build_variant_map(&Interval::point(position))?;
        Ok(rows
            .remove(&position)
            .and_then(|mut alleles| alleles.remove(allele))
            .unwrap_or_default())
    }

    fn sample_intervals(
        &self,
        call: &GenotypeCall,
        sample: &SampleGenotype,
        id: SampleId,
        pass: bool,
    ) -> Result<Vec<ObservationInterval>, CalculatorError> {
        let genotype =
            Genotype::parse(&sample.genotype).map_err(|source| CalculatorError::MalformedGenotype {
                sample: sample.sample.clone(),
                source,
            })?;
        let ploidy = genotype.ploidy();
        let copies = genotype.allele_copies();
        let reference_copies = copies.get(&0).copied().unwrap_or(0);
        let call_interval = Interval::window(call.start, call.end);

        let mut intervals = Vec::new();
        let mut primary_kind = None;
        for (&allele, &count) in &copies {
            let depth = allele_depth(sample, allele)?;
            let site = allele_site(call, allele)?;
            intervals.push(Interval::new(
                site.start,
                site.end,
                AlleleObservation::new(count, depth, pass, site.kind, site.identity.clone())
                    .with_sample(id),
            ));
            if allele == 1 {
                primary_kind = Some(site.kind);
            }
            if allele < 2 {
                continue;
            }

            let fill_count = reference_copies + (ploidy - count);
            let fill = |start: i64, end: i64, kind: VariantKind| {
                Interval::new(
                    start,
                    end,
                    AlleleObservation::new(fill_count, depth, pass, kind, AlleleIdentity::Reference)
                        .with_sample(id),
                )
            };
            let allele_interval = Interval::window(site.start, site.end);
            if !allele_interval.overlaps(&call_interval, true) {
                if let Some(kind) = primary_kind {
                    intervals.push(fill(call.start, call.end, kind));
                }
                intervals.push(fill(site.start, site.end, site.kind));
            } else {
                let (call_min, call_max) = (call.start, call_interval.max_position());
                let (allele_min, allele_max) = (site.start, allele_interval.max_position());
                if call_min != allele_min {
                    intervals.push(fill(
                        min(call_min, allele_min),
                        max(call_min, allele_min) - 1,
                        VariantKind::Deletion,
                    ));
                }
                if call_max != allele_max {
                    intervals.push(fill(
                        min(call_max, allele_max) + 1,
                        max(call_max, allele_max),
                        VariantKind::Deletion,
                    ));
                }
            }
        }
        Ok(intervals)
    }
}

impl AlleleCalculator for RegionCalculator {
    fn add_call(&mut self, call: &GenotypeCall) -> Result<(), CalculatorError> {
        let pass = call.passes(&self.pass_token);
        let mut added = 0usize;
        for sample in &call.samples {
            let id = *self
                .samples
                .get(&sample.sample)
                .ok_or_else(|| CalculatorError::UnknownSample(sample.sample.clone()))?;
            let intervals = self.sample_intervals(call, sample, id, pass)?;
            added += intervals.len();
            self.store.add_all(intervals);
        }
        debug!(
            chromosome = %call.chromosome,
            start = call.start,
            end = call.end,
            kind = %call.kind,
            intervals = added,
            "ingested genotype call"
        );
        Ok(())
    }

    fn build_pileup_map(&self, window: &Interval<()>) -> Result<PileupMap, CalculatorError> {
        ensure_ordered(window)?;
        let mut rows = PileupMap::new();
        let mut pass_sets: BTreeMap<i64, (BTreeSet<SampleId>, BTreeSet<SampleId>)> =
            BTreeMap::new();

        self.store.query_reference(window, |interval| {
            record_filters(&mut pass_sets, interval, Category::Reference, window);
            if !interval.overlaps(window, true) {
                return;
            }
            let observation = &interval.payload;
            let count = if observation.kind == VariantKind::Insertion {
                -observation.count + NO_CALL
            } else {
                observation.count
            };
            let start = max(window.start, interval.start);
            let end = min(window.end, interval.max_position());
            for position in start..=end {
                let row = rows.entry(position).or_default();
                add_to_bucket(&mut row.reference, count, observation.sample_ids.iter().copied());
            }
        });

        self.store.query_no_call(window, |interval| {
            record_filters(&mut pass_sets, interval, Category::NoCall, window);
            let start = max(window.start, interval.min_position());
            let end = min(window.end, interval.max_position());
            for position in start..=end {
                let row = rows.entry(position).or_default();
                let ids = interval.payload.sample_ids.iter().copied();
                add_to_bucket(&mut row.reference, NO_CALL, ids);
            }
        });

        let mut failure = None;
        self.store.query_variation(window, |interval| {
            if failure.is_some() {
                return;
            }
            record_filters(&mut pass_sets, interval, Category::Variation, window);
            let observation = &interval.payload;
            let key = observation
                .identity
                .ref_alt()
                .and_then(|pair| AltKey::for_variation(observation.kind, pair));
            let Some(key) = key else {
                failure = Some(CalculatorError::UnexpectedVariationKind {
                    position: interval.start,
                    kind: observation.kind,
                });
                return;
            };
            let start = max(window.start, interval.start);
            let end = min(window.end, interval.max_position());
            for position in start..=end {
                let row = rows.entry(position).or_default();
                let buckets = row.alt_map.entry(key.clone()).or_default();
                add_to_bucket(buckets, observation.count, observation.sample_ids.iter().copied());
            }
        });
        if let Some(error) = failure {
            return Err(error);
        }

        for row in rows.values_mut() {
            for buckets in row.alt_map.values_mut() {
                redistribute(buckets);
            }
            for ids in row.reference.values_mut() {
                ids.sort_unstable();
                ids.dedup();
            }
        }
        for (position, (pass, not_pass)) in pass_sets {
            let row = rows.entry(position).or_default();
            row.pass = pass.into_iter().collect();
            row.not_pass = not_pass.into_iter().collect();
        }
        Ok(rows)
    }

    fn build_variant_map(&self, window: &Interval<()>) -> Result<VariantMap, CalculatorError> {
        ensure_ordered(window)?;
        let mut rows = VariantMap::new();
        for interval in self.store.intervals(Category::Variation) {
            if interval.max_position() < window.start || interval.start > window.end {
                continue;
            }
            let Some(pair) = interval.payload.identity.ref_alt() else {
                continue;
            };
            let row = rows
                .entry(interval.start)
                .or_default()
                .entry(pair.clone())
                .or_default();
            add_to_bucket(
                &mut row.alternate,
                interval.payload.count,
                interval.payload.sample_ids.iter().copied(),
            );
        }
        for alleles in rows.values_mut() {
            for row in alleles.values_mut() {
                redistribute(&mut row.alternate);
            }
        }
        Ok(rows)
    }

    fn fill_no_calls(&mut self, expected: &BTreeSet<SampleId>, start: i64, next_start: i64) {
        if next_start <= start || expected.is_empty() {
            return;
        }
        let width = (next_start - start) as usize;
        let index: BTreeMap<SampleId, usize> =
            expected.iter().enumerate().map(|(i, &id)| (id, i)).collect();
        let mut missing = vec![bitvec![usize, Lsb0; 1; width]; expected.len()];

        let range = Interval::window(start, next_start - 1);
        for category in [Category::Variation, Category::NoCall, Category::Reference] {
            self.store.query(category, &range, |interval| {
                let (first, last) = category.visible_span(interval);
                let first = max(first, start);
                let last = min(last, next_start - 1);
                if first > last {
                    return;
                }
                for id in &interval.payload.sample_ids {
                    if let Some(&row) = index.get(id) {
                        let span = (first - start) as usize..=(last - start) as usize;
                        missing[row][span].fill(false);
                    }
                }
            });
        }

        let mut runs = Vec::new();
        for (&id, &row) in &index {
            let bits = &missing[row];
            let mut offset = 0usize;
            while offset < width {
                let Some(run_start) = bits[offset..].first_one().map(|o| o + offset) else {
                    break;
                };
                let run_len = bits[run_start..].first_zero().unwrap_or(width - run_start);
                let first = start + run_start as i64;
                runs.push(Interval::new(
                    first,
                    first + run_len as i64 - 1,
                    AlleleObservation::no_call(id),
                ));
                offset = run_start + run_len;
            }
        }
        info!(
            study = %self.study,
            start,
            next_start,
            intervals = runs.len(),
            "filled missing positions with no-calls"
        );
        self.store.add_all(runs);
    }

    fn pass(&self, position: i64) -> BTreeSet<SampleId> {
        let mut ids = BTreeSet::new();
        self.store.query_all(&Interval::point(position), |interval| {
            if interval.payload.pass {
                ids.extend(interval.payload.sample_ids.iter().copied());
            }
        });
        ids
    }

    fn not_pass(&self, position: i64) -> BTreeSet<SampleId> {
        let mut ids = BTreeSet::new();
        self.store.query_all(&Interval::point(position), |interval| {
            if interval.start > position {
                return;
            }
            if !interval.payload.pass {
                ids.extend(interval.payload.sample_ids.iter().copied());
            }
        });
        ids
    }
}

fn ensure_ordered(window: &Interval<()>) -> Result<(), CalculatorError> {
    if window.start > window.end {
        return Err(CalculatorError::InvertedWindow {
            start: window.start,
            end: window.end,
        });
    }
    Ok(())
}

/// Add the interval's samples to the pass / not-pass sets of every window
/// position a point query would return it for.
fn record_filters(
    sets: &mut BTreeMap<i64, (BTreeSet<SampleId>, BTreeSet<SampleId>)>,
    interval: &ObservationInterval,
    category: Category,
    window: &Interval<()>,
) {
    let (first, last) = category.visible_span(interval);
    let mut first = max(first, window.start);
    let last = min(last, window.end);
    if !interval.payload.pass {
        // not-pass ignores positions before the interval start
        first = max(first, interval.start);
    }
    for position in first..=last {
        let (pass, not_pass) = sets.entry(position).or_default();
        let target = if interval.payload.pass { pass } else { not_pass };
        target.extend(interval.payload.sample_ids.iter().copied());
    }
}

fn resolve_kind(kind: CallKind, start: i64, end: i64) -> Option<VariantKind> {
    match kind {
        CallKind::Snv => Some(VariantKind::Snv),
        CallKind::Mnv => Some(VariantKind::Mnv),
        CallKind::Insertion => Some(VariantKind::Insertion),
        CallKind::Deletion => Some(VariantKind::Deletion),
        CallKind::Indel if start > end => Some(VariantKind::Insertion),
        CallKind::Indel => Some(VariantKind::Deletion),
        CallKind::NoVariation => Some(VariantKind::Reference),
        CallKind::Mixed => None,
    }
}

fn allele_site(call: &GenotypeCall, allele: i32) -> Result<AlleleSite, CalculatorError> {
    let unsupported = |kind| CalculatorError::UnsupportedKind {
        position: call.start,
        kind,
    };
    match allele {
        NO_CALL_INDEX => Ok(AlleleSite {
            start: call.start,
            end: call.end,
            kind: VariantKind::NoCall,
            identity: AlleleIdentity::NoCall,
        }),
        0 => Ok(AlleleSite {
            start: call.start,
            end: call.end,
            kind: resolve_kind(call.kind, call.start, call.end).ok_or(unsupported(call.kind))?,
            identity: AlleleIdentity::Reference,
        }),
        1 => {
            let kind = resolve_kind(call.kind, call.start, call.end).ok_or(unsupported(call.kind))?;
            if kind == VariantKind::Reference {
                return Err(CalculatorError::AlternateAtReferenceSite {
                    position: call.start,
                });
            }
            Ok(AlleleSite {
                start: call.start,
                end: call.end,
                kind,
                identity: AlleleIdentity::Alt(RefAlt::new(&call.reference, &call.alternate)),
            })
        }
        index => {
            let secondary = usize::try_from(index - 2)
                .ok()
                .and_then(|i| call.secondary_alternates.get(i))
                .ok_or(CalculatorError::AlleleIndexOutOfRange {
                    position: call.start,
                    index,
                    available: call.secondary_alternates.len(),
                })?;
            let kind = resolve_kind(secondary.kind, secondary.start, secondary.end)
                .ok_or(unsupported(secondary.kind))?;
            if kind == VariantKind::Reference {
                return Err(CalculatorError::AlternateAtReferenceSite {
                    position: secondary.start,
                });
            }
            Ok(AlleleSite {
                start: secondary.start,
                end: secondary.end,
                kind,
                identity: AlleleIdentity::Alt(RefAlt::new(
                    &secondary.reference,
                    &secondary.alternate,
                )),
            })
        }
    }
}

fn allele_depth(sample: &SampleGenotype, allele: i32) -> Result<i32, CalculatorError> {
    if allele >= 0 && !sample.allele_depths.is_empty() {
        return sample
            .allele_depths
            .get(allele as usize)
            .copied()
            .ok_or_else(|| CalculatorError::MissingAlleleDepth {
                sample: sample.sample.clone(),
                index: allele,
            });
    }
    Ok(sample.depth.unwrap_or(-1))
}
