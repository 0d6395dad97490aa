mod common;

use std::collections::HashSet;

use allele_store::report::{render_genotypes, render_pileup};
use allele_store::{Interval, StoreConfig, WindowPipeline};
use blake3::hash;
use common::*;

fn calls() -> Vec<allele_store::GenotypeCall> {
    vec![
        sample(sample(reference_block(100, 104), 1, "0/0"), 2, "0/0"),
        sample(
            sample(snv(105, "A", "T").with_secondary(secondary_snv(105, "A", "G")), 1, "0/1"),
            3,
            "1/2",
        ),
        sample(sample(deletion(107, "ACG"), 2, "0/1"), 3, "1/1"),
        sample(insertion(112, "TT"), 1, "1/1"),
        sample(sample(reference_block(113, 130), 1, "0/0"), 3, "0/0"),
    ]
}

#[test]
fn encoded_windows_are_byte_identical_across_runs() {
    let window = Interval::window(100, 130);
    let mut fingerprints = HashSet::new();
    for _ in 0..5 {
        let config = StoreConfig::default().with_window_size(10);
        let pipeline =
            WindowPipeline::new("study", samples(3), config).expect("pipeline initialises");
        let encoded = pipeline.encode(CHROM, &window, &calls()).expect("encoding succeeds");

        let mut hasher = blake3::Hasher::new();
        for entry in &encoded {
            hasher.update(&entry.key.to_bytes());
            hasher.update(&entry.bytes);
        }
        fingerprints.insert(hasher.finalize());
    }

    assert_eq!(fingerprints.len(), 1, "encodings diverged across runs");
}

#[test]
fn decoded_reports_are_stable() {
    let window = Interval::window(100, 130);
    let config = StoreConfig::default().with_window_size(10);
    let pipeline =
        WindowPipeline::new("study", samples(3), config).expect("pipeline initialises");
    let encoded = pipeline.encode(CHROM, &window, &calls()).expect("encoding succeeds");

    let mut fingerprints = HashSet::new();
    for _ in 0..3 {
        let calculator = pipeline.load(CHROM, &window, &encoded).expect("decoding succeeds");
        let rows = pipeline.pileup(CHROM, &calculator).expect("pileup succeeds");
        let resolved = pipeline
            .genotypes(CHROM, &calculator, &Default::default())
            .expect("genotypes resolve");
        let report = render_pileup(CHROM, &rows).expect("rendering succeeds")
            + &render_genotypes(&resolved).expect("rendering succeeds");
        fingerprints.insert(hash(report.as_bytes()));
    }

    assert_eq!(fingerprints.len(), 1, "reports diverged across runs");
}
