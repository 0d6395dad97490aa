use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Numeric sample identifier assigned at indexing time.
pub type SampleId = u32;

/// Reserved count for no-call observations in reference buckets.
pub const NO_CALL: i32 = -1;

/// Kind of variation an observation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum VariantKind {
    /// Reference-only block.
    Reference,
    /// Single nucleotide variant.
    Snv,
    /// Multi nucleotide variant.
    Mnv,
    /// Insertion (`start = end + 1`).
    Insertion,
    /// Deletion.
    Deletion,
    /// Missing call.
    NoCall,
}

impl VariantKind {
    /// Stable wire code used by the window codec.
    pub fn code(self) -> u8 {
        match self {
            VariantKind::Reference => 0,
            VariantKind::Snv => 1,
            VariantKind::Mnv => 2,
            VariantKind::Insertion => 3,
            VariantKind::Deletion => 4,
            VariantKind::NoCall => 5,
        }
    }

    /// Inverse of [`VariantKind::code`].
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(VariantKind::Reference),
            1 => Some(VariantKind::Snv),
            2 => Some(VariantKind::Mnv),
            3 => Some(VariantKind::Insertion),
            4 => Some(VariantKind::Deletion),
            5 => Some(VariantKind::NoCall),
            _ => None,
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VariantKind::Reference => "REFERENCE",
            VariantKind::Snv => "SNV",
            VariantKind::Mnv => "MNV",
            VariantKind::Insertion => "INSERTION",
            VariantKind::Deletion => "DELETION",
            VariantKind::NoCall => "NO_CALL",
        };
        f.write_str(name)
    }
}

/// Concrete reference/alternate allele pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RefAlt {
    /// Reference sequence (empty for insertions).
    pub reference: String,
    /// Alternate sequence (empty for deletions).
    pub alternate: String,
}

/// Failure to parse a `ref_alt` identifier.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("variant id `{0}` is not of the form REF_ALT")]
pub struct RefAltParseError(pub String);

impl RefAlt {
    /// Build a pair from its two sequences.
    pub fn new(reference: impl Into<String>, alternate: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            alternate: alternate.into(),
        }
    }
}

impl fmt::Display for RefAlt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.reference, self.alternate)
    }
}

impl FromStr for RefAlt {
    type Err = RefAltParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_once('_')
            .map(|(reference, alternate)| RefAlt::new(reference, alternate))
            .ok_or_else(|| RefAltParseError(s.to_string()))
    }
}

/// Which allele an observation speaks for.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlleleIdentity {
    /// Reference allele.
    Reference,
    /// No usable call.
    NoCall,
    /// A concrete alternate allele.
    Alt(RefAlt),
}

impl AlleleIdentity {
    /// Length of the legacy identity array (0 reference, 1 no-call, 2 alt).
    pub fn identity_len(&self) -> usize {
        match self {
            AlleleIdentity::Reference => 0,
            AlleleIdentity::NoCall => 1,
            AlleleIdentity::Alt(_) => 2,
        }
    }

    /// The allele pair, if any.
    pub fn ref_alt(&self) -> Option<&RefAlt> {
        match self {
            AlleleIdentity::Alt(pair) => Some(pair),
            _ => None,
        }
    }
}

/// Per-sample allele observation shared by all samples listed in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlleleObservation {
    /// Copies of the allele (negative values are reserved bucket encodings).
    pub count: i32,
    /// Read depth supporting the allele (`-1` when unknown).
    pub depth: i32,
    /// Whether the originating call passed filters.
    pub pass: bool,
    /// Variation kind.
    pub kind: VariantKind,
    /// Allele identity.
    pub identity: AlleleIdentity,
    /// Samples sharing this exact observation.
    pub sample_ids: Vec<SampleId>,
}

impl AlleleObservation {
    /// Observation without samples attached yet.
    pub fn new(
        count: i32,
        depth: i32,
        pass: bool,
        kind: VariantKind,
        identity: AlleleIdentity,
    ) -> Self {
        Self {
            count,
            depth,
            pass,
            kind,
            identity,
            sample_ids: Vec::new(),
        }
    }

    /// Attach a single sample.
    pub fn with_sample(mut self, sample: SampleId) -> Self {
        self.sample_ids.push(sample);
        self
    }

    /// Attach several samples.
    pub fn with_samples(mut self, samples: impl IntoIterator<Item = SampleId>) -> Self {
        self.sample_ids.extend(samples);
        self
    }

    /// Placeholder observation for a sample missing at a position range.
    pub fn no_call(sample: SampleId) -> Self {
        Self::new(1, 0, false, VariantKind::NoCall, AlleleIdentity::NoCall).with_sample(sample)
    }

    /// Grouping key shared by mergeable observations.
    pub fn key(&self) -> ObservationKey {
        ObservationKey {
            count: self.count,
            depth: self.depth,
            pass: self.pass,
            kind: self.kind,
            identity: self.identity.clone(),
        }
    }
}

/// Fields that decide whether two observations can share an interval.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObservationKey {
    /// Allele copies.
    pub count: i32,
    /// Read depth.
    pub depth: i32,
    /// Filter status.
    pub pass: bool,
    /// Variation kind.
    pub kind: VariantKind,
    /// Allele identity.
    pub identity: AlleleIdentity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_alt_keeps_empty_sides() {
        let deletion: RefAlt = "ABC_".parse().expect("valid id");
        assert_eq!(deletion, RefAlt::new("ABC", ""));
        assert_eq!(deletion.to_string(), "ABC_");

        let insertion: RefAlt = "_AT".parse().expect("valid id");
        assert_eq!(insertion.reference, "");
        assert_eq!(insertion.alternate, "AT");
    }

    #[test]
    fn ref_alt_without_separator_is_rejected() {
        assert!("ACGT".parse::<RefAlt>().is_err());
    }

    #[test]
    fn kind_codes_are_stable() {
        for kind in [
            VariantKind::Reference,
            VariantKind::Snv,
            VariantKind::Mnv,
            VariantKind::Insertion,
            VariantKind::Deletion,
            VariantKind::NoCall,
        ] {
            assert_eq!(VariantKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(VariantKind::from_code(9), None);
    }

    #[test]
    fn identity_lengths_follow_category() {
        assert_eq!(AlleleIdentity::Reference.identity_len(), 0);
        assert_eq!(AlleleIdentity::NoCall.identity_len(), 1);
        assert_eq!(AlleleIdentity::Alt(RefAlt::new("A", "T")).identity_len(), 2);
    }
}
