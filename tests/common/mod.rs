#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use allele_store::count::{CallKind, GenotypeCall, SampleGenotype, SecondaryAlternate};
use allele_store::region::{Category, ObservationInterval, RegionStore};
use allele_store::{
    AlleleCalculator, Interval, RefAlt, RegionCalculator, SampleId, StoreConfig, VariantKind,
};

pub const CHROM: &str = "1";

/// Flattened `(start, end, count, depth, pass, kind, allele, sample)` tuple.
pub type Observed = (i64, i64, i32, i32, bool, VariantKind, String, SampleId);

/// Samples `S1..=Sn` with ids `1..=n`.
pub fn samples(n: u32) -> BTreeMap<String, SampleId> {
    (1..=n).map(|id| (format!("S{id}"), id)).collect()
}

pub fn calculator(start: i64, end: i64, n: u32) -> RegionCalculator {
    let window = Interval::window(start, end);
    RegionCalculator::new("study", &window, samples(n), &StoreConfig::default())
}

pub fn snv(position: i64, reference: &str, alternate: &str) -> GenotypeCall {
    GenotypeCall::from_alleles(CHROM, position, reference, alternate).with_filter("PASS")
}

pub fn insertion(position: i64, alternate: &str) -> GenotypeCall {
    GenotypeCall::new(CHROM, position, position - 1, "", alternate, CallKind::Insertion)
        .with_filter("PASS")
}

pub fn deletion(position: i64, reference: &str) -> GenotypeCall {
    let end = position + reference.len() as i64 - 1;
    GenotypeCall::new(CHROM, position, end, reference, "", CallKind::Deletion).with_filter("PASS")
}

pub fn reference_block(start: i64, end: i64) -> GenotypeCall {
    GenotypeCall::reference_block(CHROM, start, end).with_filter("PASS")
}

pub fn secondary_snv(position: i64, reference: &str, alternate: &str) -> SecondaryAlternate {
    SecondaryAlternate::new(position, position, reference, alternate, CallKind::Snv)
}

/// Attach `genotype` for sample `S{id}`.
pub fn sample(call: GenotypeCall, id: SampleId, genotype: &str) -> GenotypeCall {
    call.with_sample(SampleGenotype::new(format!("S{id}"), genotype))
}

pub fn ingest(calculator: &mut RegionCalculator, calls: &[GenotypeCall]) {
    for call in calls {
        calculator.add_call(call).expect("call ingests");
    }
}

fn flatten(interval: &ObservationInterval, observed: &mut BTreeSet<Observed>) {
    let payload = &interval.payload;
    let allele = payload
        .identity
        .ref_alt()
        .map(RefAlt::to_string)
        .unwrap_or_default();
    for &id in &payload.sample_ids {
        observed.insert((
            interval.start,
            interval.end,
            payload.count,
            payload.depth,
            payload.pass,
            payload.kind,
            allele.clone(),
            id,
        ));
    }
}

/// What a query over the store's own window returns, per sample.
pub fn visible(store: &RegionStore, category: Category) -> BTreeSet<Observed> {
    let mut observed = BTreeSet::new();
    store.query(category, store.target(), |interval| flatten(interval, &mut observed));
    observed
}

/// Everything stored, per sample.
pub fn stored(store: &RegionStore, category: Category) -> BTreeSet<Observed> {
    let mut observed = BTreeSet::new();
    for interval in store.intervals(category) {
        flatten(interval, &mut observed);
    }
    observed
}
