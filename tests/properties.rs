mod common;

use std::collections::{BTreeMap, BTreeSet};

use allele_store::codec::WindowCodec;
use allele_store::count::{redistribute, AltKey, CountBuckets};
use allele_store::region::{AlleleIdentity, AlleleObservation, Category};
use allele_store::{
    AlleleCalculator, AlleleCountPosition, AlleleTransfer, Interval, RefAlt, RegionStore, SampleId,
    VariantKind,
};
use common::*;
use proptest::prelude::*;

const GENOTYPES: [&str; 6] = ["0/0", "0/1", "1/1", "0/2", "1/2", "2/2"];

/// One multi-allelic SNV site per position starting at 10, one genotype
/// index per sample.
fn snv_sites() -> impl Strategy<Value = Vec<Vec<usize>>> {
    (1usize..5).prop_flat_map(|samples| {
        proptest::collection::vec(proptest::collection::vec(0..GENOTYPES.len(), samples), 1..6)
    })
}

fn ingest_sites(sites: &[Vec<usize>]) -> allele_store::RegionCalculator {
    let samples = sites[0].len() as u32;
    let mut calculator = calculator(10, 10 + sites.len() as i64 - 1, samples);
    for (offset, genotypes) in sites.iter().enumerate() {
        let position = 10 + offset as i64;
        let mut call = snv(position, "A", "T").with_secondary(secondary_snv(position, "A", "G"));
        for (index, &genotype) in genotypes.iter().enumerate() {
            call = sample(call, index as SampleId + 1, GENOTYPES[genotype]);
        }
        calculator.add_call(&call).expect("call ingests");
    }
    calculator
}

/// Sample → summed positive counts over reference, alternate and alt_map,
/// failing when a sample shows up twice within one bucket map.
fn allele_totals(row: &AlleleCountPosition) -> Result<BTreeMap<SampleId, i32>, TestCaseError> {
    let mut totals = BTreeMap::new();
    let sections = std::iter::once(&row.reference)
        .chain(std::iter::once(&row.alternate))
        .chain(row.alt_map.values());
    for buckets in sections {
        let mut seen = BTreeSet::new();
        for (&count, ids) in buckets.range(1..) {
            for &id in ids {
                prop_assert!(seen.insert(id), "sample {} listed twice in one map", id);
                *totals.entry(id).or_insert(0) += count;
            }
        }
    }
    Ok(totals)
}

#[derive(Debug, Clone)]
struct Planned {
    category: u8,
    start: i64,
    length: i64,
    count: i32,
    depth: i32,
    pass: bool,
    sample: SampleId,
}

fn planned() -> impl Strategy<Value = Planned> {
    (0u8..3, 85i64..150, 0i64..9, 1i32..3, -1i32..40, any::<bool>(), 1u32..6).prop_map(
        |(category, start, length, count, depth, pass, sample)| Planned {
            category,
            start,
            length,
            count,
            depth,
            pass,
            sample,
        },
    )
}

fn build(plan: &Planned) -> Interval<AlleleObservation> {
    let (end, kind, identity) = match (plan.category, plan.length) {
        (0, 0) => (plan.start - 1, VariantKind::Insertion, AlleleIdentity::Reference),
        (0, length) => (plan.start + length - 1, VariantKind::Reference, AlleleIdentity::Reference),
        (1, length) => (plan.start + length, VariantKind::NoCall, AlleleIdentity::NoCall),
        (_, 0) => (
            plan.start - 1,
            VariantKind::Insertion,
            AlleleIdentity::Alt(RefAlt::new("", "AC")),
        ),
        (_, 1) => (plan.start, VariantKind::Snv, AlleleIdentity::Alt(RefAlt::new("A", "T"))),
        (_, length) => (
            plan.start + length - 1,
            VariantKind::Deletion,
            AlleleIdentity::Alt(RefAlt::new("A".repeat(length as usize), "")),
        ),
    };
    Interval::new(
        plan.start,
        end,
        AlleleObservation::new(plan.count, plan.depth, plan.pass, kind, identity)
            .with_sample(plan.sample),
    )
}

proptest! {
    #[test]
    fn every_sample_sums_to_its_ploidy(sites in snv_sites()) {
        let calculator = ingest_sites(&sites);
        let rows = calculator
            .build_pileup_map(&Interval::window(10, 10 + sites.len() as i64 - 1))
            .expect("pileup");

        for (offset, genotypes) in sites.iter().enumerate() {
            let row = &rows[&(10 + offset as i64)];
            let totals = allele_totals(row)?;
            for index in 0..genotypes.len() {
                let id = index as SampleId + 1;
                prop_assert_eq!(
                    totals.get(&id).copied(),
                    Some(2),
                    "sample {} at offset {}",
                    id,
                    offset
                );
            }
        }
    }

    #[test]
    fn combining_classifies_each_sample_once(sites in snv_sites()) {
        let calculator = ingest_sites(&sites);
        let window = Interval::window(10, 10 + sites.len() as i64 - 1);
        let rows = calculator.build_pileup_map(&window).expect("pileup");
        let mut transfer = AlleleTransfer::new(CHROM, calculator.sample_ids());
        let combined = transfer.transfer_window(&calculator, &window).expect("transfer");

        for allele in &combined {
            let sparse = rows[&allele.target.start].clone().without_hom_ref();
            let expected: BTreeSet<SampleId> = allele_totals(&sparse)?.into_keys().collect();
            let totals = allele_totals(&allele.counts)?;
            prop_assert_eq!(totals.keys().copied().collect::<BTreeSet<_>>(), expected);
            prop_assert!(
                totals.values().all(|&total| total == 2),
                "{}: {:?}",
                allele.target,
                totals
            );
        }
    }

    #[test]
    fn redistribution_is_idempotent(
        buckets in proptest::collection::btree_map(
            -2i32..5,
            proptest::collection::vec(1u32..6, 0..6),
            0..5,
        ),
    ) {
        let mut once: CountBuckets = buckets;
        redistribute(&mut once);
        let mut twice = once.clone();
        redistribute(&mut twice);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn decoded_windows_reproduce_the_store(
        plans in proptest::collection::vec(planned(), 0..40),
        target_start in 95i64..110,
        target_width in 0i64..30,
        window_size in 1u32..25,
    ) {
        let mut store = RegionStore::new(target_start, target_start + target_width);
        store.add_all(plans.iter().map(build));

        let codec = WindowCodec::new(window_size).expect("positive size");
        let windows = codec.encode_store(CHROM, &store).expect("encode");
        let decoded = codec.decode_store(store.target(), &windows).expect("decode");

        for category in [Category::Reference, Category::NoCall, Category::Variation] {
            prop_assert_eq!(stored(&decoded, category), visible(&store, category));
            prop_assert_eq!(visible(&decoded, category), visible(&store, category));
        }
    }

    #[test]
    fn stacked_indels_respect_overlap_order(
        deletion_lengths in proptest::sample::subsequence((2usize..=7).collect::<Vec<_>>(), 1..=4),
        insertion_lengths in proptest::sample::subsequence((1usize..=4).collect::<Vec<_>>(), 0..=3),
    ) {
        prop_assume!(deletion_lengths.len() + insertion_lengths.len() >= 3);
        let position = 50;
        let total = deletion_lengths.len() + insertion_lengths.len();
        let mut calculator = calculator(40, 60, total as u32 + 1);

        // sample ids: insertions first, then deletions, then one hom-ref
        let mut carriers = BTreeMap::new();
        let mut id: SampleId = 0;
        let mut calls = Vec::new();
        for &length in &insertion_lengths {
            id += 1;
            let alternate = "T".repeat(length);
            carriers.insert(format!("1:{position}:-:{alternate}"), id);
            calls.push(sample(insertion(position, &alternate), id, "0/1"));
        }
        let mut deletion_ends = BTreeMap::new();
        for &length in &deletion_lengths {
            id += 1;
            let reference = "A".repeat(length);
            carriers.insert(format!("1:{position}:{reference}:-"), id);
            deletion_ends.insert(id, position + length as i64 - 1);
            calls.push(sample(deletion(position, &reference), id, "0/1"));
        }
        calls.push(sample(reference_block(40, 60), id + 1, "0/0"));
        ingest(&mut calculator, &calls);

        let mut transfer = AlleleTransfer::new(CHROM, calculator.sample_ids());
        let combined = transfer
            .transfer_window(&calculator, &Interval::window(40, 60))
            .expect("transfer");
        prop_assert_eq!(combined.len(), total);

        let mut expected_order: Vec<String> = Vec::new();
        let mut by_length = insertion_lengths.clone();
        by_length.sort_unstable_by(|a, b| b.cmp(a));
        expected_order.extend(
            by_length.iter().map(|&l| format!("1:{position}:-:{}", "T".repeat(l))),
        );
        let mut deletions = deletion_lengths.clone();
        deletions.sort_unstable();
        expected_order.extend(
            deletions.iter().map(|&l| format!("1:{position}:{}:-", "A".repeat(l))),
        );
        let order: Vec<String> = combined.iter().map(|allele| allele.target.to_string()).collect();
        prop_assert_eq!(order, expected_order);

        let insertion_carriers: BTreeSet<SampleId> =
            (1..=insertion_lengths.len() as SampleId).collect();
        let ids_of = |row: &AlleleCountPosition, key: &AltKey| -> BTreeSet<SampleId> {
            row.alt_map
                .get(key)
                .map(|b| b.values().flatten().copied().collect())
                .unwrap_or_default()
        };
        for allele in &combined {
            let own = carriers[&allele.target.to_string()];
            prop_assert_eq!(allele.counts.alternate.get(&1), Some(&vec![own]));
            if allele.target.is_insertion() {
                let mut others = insertion_carriers.clone();
                others.remove(&own);
                prop_assert_eq!(ids_of(&allele.counts, &AltKey::InsertionSpan), others);
            } else {
                let own_end = deletion_ends[&own];
                let wider: BTreeSet<SampleId> = deletion_ends
                    .iter()
                    .filter(|&(_, &end)| end > own_end)
                    .map(|(&id, _)| id)
                    .collect();
                prop_assert_eq!(ids_of(&allele.counts, &AltKey::DeletionSpan), wider);
            }
        }
        let distinct_ends = deletion_lengths.len() + usize::from(!insertion_lengths.is_empty());
        prop_assert_eq!(transfer.overlaps().len(), distinct_ends);
    }
}
