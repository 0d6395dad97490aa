//! Interval model, allele observations and the per-window region store.
//!
//! A [`RegionStore`] holds every observation interval produced for one
//! genomic window, partitioned into reference, no-call and variation lists.
//! Aggregate views are always re-derived from these lists on read.

mod interval;
mod observation;
mod store;

pub use interval::Interval;
pub use observation::{
    AlleleIdentity, AlleleObservation, ObservationKey, RefAlt, RefAltParseError, SampleId,
    VariantKind, NO_CALL,
};
pub use store::{Category, ObservationInterval, RegionStore};
