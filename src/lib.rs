//! # Region-based allele count storage
//!
//! Turns per-sample genotype calls into per-position counts of how many
//! samples carry which allele, and stores them as compact binary windows.
//!
//! ## Flow
//!
//! 1. **Ingest**: every call becomes observation intervals in a [`RegionStore`]
//! 2. **Fill**: positions without data become no-calls per expected sample
//! 3. **Aggregate**: pileup and per-allele maps are derived on read
//! 4. **Combine**: each allele is projected onto its own count row
//! 5. **Persist**: stores are cut into fixed-size windows and encoded
//!
//! ## Usage Example
//!
//! ```ignore
//! use allele_store::{Interval, StoreConfig, WindowPipeline};
//!
//! let pipeline = WindowPipeline::new("study", samples, StoreConfig::default())?;
//! let window = Interval::window(1, 100);
//! let encoded = pipeline.encode("1", &window, &calls)?;
//! let calculator = pipeline.load("1", &window, &encoded)?;
//! let rows = pipeline.pileup("1", &calculator)?;
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod region;   // Intervals, observations and the region store
pub mod count;    // Call ingestion and pileup aggregation
pub mod combine;  // Per-allele projection and genotype reconstruction
pub mod codec;    // Windowed binary encoding
pub mod config;   // Store settings
pub mod pipeline; // Window-scoped driver
pub mod report;   // Text reports

// Re-exports for convenience
pub use codec::{CodecError, EncodedWindow, WindowCodec, WindowKey};
pub use combine::{
    AlleleCombiner, AlleleTransfer, CombineError, GenotypeResolver, OverlapIndex, TargetVariant,
};
pub use config::{ConfigError, StoreConfig};
pub use count::{
    AlleleCalculator, AlleleCountPosition, AltKey, CalculatorError, GenotypeCall, RegionCalculator,
};
pub use pipeline::{ResolvedAllele, WindowError, WindowPipeline};
pub use region::{
    AlleleIdentity, AlleleObservation, Interval, RefAlt, RegionStore, SampleId, VariantKind,
};
