//! Projection of multi-allelic pileups onto single alleles.
//!
//! [`AlleleTransfer`] walks a window's variant map in position order, feeding
//! each target allele through the [`AlleleCombiner`] while an
//! [`OverlapIndex`] remembers which samples wider variants already claimed.
//! [`GenotypeResolver`] turns a combined row back into genotype strings.

mod combiner;
mod genotypes;
mod overlap;
mod target;
mod transfer;

pub use combiner::{AlleleCombiner, CombineError};
pub use genotypes::{
    GenotypeCollection, GenotypeError, GenotypeResolver, HET_REF_GT, HOM_REF_GT, HOM_VAR_GT,
    NO_CALL_GT,
};
pub use overlap::OverlapIndex;
pub use target::TargetVariant;
pub use transfer::{AlleleTransfer, CombinedAllele};
