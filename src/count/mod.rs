//! Genotype calls to allele observations, and observations back to
//! per-position counts.
//!
//! The [`RegionCalculator`] owns one [`RegionStore`](crate::region::RegionStore)
//! per window. Pileup and variant maps are rebuilt from the store on every
//! read and are never cached.

mod calculator;
mod genotype;
mod position;
mod redistribute;

pub use calculator::{AlleleCalculator, CalculatorError, PileupMap, RegionCalculator, VariantMap};
pub use genotype::{
    CallKind, Genotype, GenotypeCall, InvalidGenotype, SampleGenotype, SecondaryAlternate,
    UnknownCallKind, NO_CALL_INDEX,
};
pub use position::{
    add_to_bucket, buckets_from_counts, sample_counts, AlleleCountPosition, AltKey, CountBuckets,
    EmptySampleFilter, DEL_SYMBOL, HOM_REF, INS_SYMBOL,
};
pub use redistribute::redistribute;
