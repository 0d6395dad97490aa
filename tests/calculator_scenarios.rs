mod common;

use std::collections::BTreeSet;

use allele_store::count::{redistribute, AltKey, CountBuckets, HOM_REF};
use allele_store::region::{Category, NO_CALL};
use allele_store::{AlleleCalculator, Interval};
use common::*;

#[test]
fn simple_insertion_between_reference_calls() {
    let mut calculator = calculator(98, 102, 1);
    ingest(
        &mut calculator,
        &[
            sample(reference_block(99, 99), 1, "0/0"),
            sample(insertion(100, "AT"), 1, "0/1"),
            sample(reference_block(101, 101), 1, "0/0"),
        ],
    );
    calculator.fill_no_calls(&BTreeSet::from([1]), 98, 103);

    let rows = calculator
        .build_pileup_map(&Interval::window(98, 102))
        .expect("pileup");
    assert_eq!(rows[&98].reference.get(&NO_CALL), Some(&vec![1]));
    assert_eq!(rows[&99].reference.get(&HOM_REF), Some(&vec![1]));
    assert_eq!(rows[&101].reference.get(&HOM_REF), Some(&vec![1]));
    assert_eq!(rows[&102].reference.get(&NO_CALL), Some(&vec![1]));

    let insertions = &rows[&100].alt_map[&AltKey::InsertionSpan];
    assert_eq!(insertions.get(&1), Some(&vec![1]));
    assert!(rows[&100].reference.get(&NO_CALL).is_none());
}

#[test]
fn fill_compresses_missing_positions_into_runs() {
    let mut calculator = calculator(100, 105, 1);
    ingest(&mut calculator, &[sample(reference_block(103, 104), 1, "0/0")]);
    calculator.fill_no_calls(&BTreeSet::from([1]), 100, 106);

    let mut runs: Vec<(i64, i64)> = calculator
        .store()
        .intervals(Category::NoCall)
        .iter()
        .map(|interval| (interval.start, interval.end))
        .collect();
    runs.sort_unstable();
    assert_eq!(runs, vec![(100, 102), (105, 105)]);
}

#[test]
fn fill_leaves_covered_samples_alone() {
    let mut calculator = calculator(10, 20, 2);
    ingest(
        &mut calculator,
        &[sample(sample(reference_block(10, 20), 1, "0/0"), 2, "0/0")],
    );
    calculator.fill_no_calls(&BTreeSet::from([1, 2]), 10, 21);
    assert!(calculator.store().intervals(Category::NoCall).is_empty());
}

#[test]
fn overlapping_sub_regions_redistribute() {
    let mut buckets: CountBuckets = [(1, vec![10, 10, 20])].into_iter().collect();
    redistribute(&mut buckets);
    let expected: CountBuckets = [(1, vec![20]), (2, vec![10])].into_iter().collect();
    assert_eq!(buckets, expected);
}

#[test]
fn snv_inside_reference_block_touches_three_intervals() {
    let mut calculator = calculator(10, 20, 2);
    ingest(
        &mut calculator,
        &[
            sample(snv(13, "A", "T"), 1, "0/1"),
            sample(reference_block(9, 21), 2, "0/0"),
        ],
    );

    let mut variation = 0;
    let mut reference = 0;
    let point = Interval::point(13);
    calculator.store().query_variation(&point, |_| variation += 1);
    calculator.store().query_reference(&point, |_| reference += 1);
    assert_eq!((variation, reference), (1, 2));

    let row = calculator.build_position_count(13).expect("row");
    assert_eq!(row.reference.get(&1), Some(&vec![1]));
    assert_eq!(row.reference.get(&HOM_REF), Some(&vec![2]));
    assert_eq!(row.pass, vec![1, 2]);
}

#[test]
fn variant_map_groups_alleles_by_anchor() {
    let mut calculator = calculator(10, 20, 3);
    let site = snv(15, "A", "T").with_secondary(secondary_snv(15, "A", "G"));
    ingest(
        &mut calculator,
        &[sample(sample(sample(site, 1, "0/1"), 2, "1/2"), 3, "2/2")],
    );

    let variants = calculator
        .build_variant_map(&Interval::window(10, 20))
        .expect("variant map");
    let alleles = &variants[&15];
    assert_eq!(alleles.len(), 2);
    let t = alleles.iter().find(|(pair, _)| pair.alternate == "T").map(|(_, row)| row);
    let g = alleles.iter().find(|(pair, _)| pair.alternate == "G").map(|(_, row)| row);
    assert_eq!(t.and_then(|row| row.alternate.get(&1)), Some(&vec![1, 2]));
    assert_eq!(g.and_then(|row| row.alternate.get(&1)), Some(&vec![2]));
    assert_eq!(g.and_then(|row| row.alternate.get(&2)), Some(&vec![3]));
}
