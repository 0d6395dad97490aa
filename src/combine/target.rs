use std::fmt;

use crate::region::{RefAlt, VariantKind};

/// The single allele a combine step projects a pileup onto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetVariant {
    /// Chromosome name.
    pub chromosome: String,
    /// First position.
    pub start: i64,
    /// Last position (`start - 1` for insertions).
    pub end: i64,
    /// Reference and alternate sequence.
    pub ref_alt: RefAlt,
    /// Variant type derived from the sequences.
    pub kind: VariantKind,
}

impl TargetVariant {
    /// Target anchored at `start`; end and kind follow from the sequences.
    pub fn from_ref_alt(chromosome: impl Into<String>, start: i64, ref_alt: RefAlt) -> Self {
        let (ref_len, alt_len) = (ref_alt.reference.len(), ref_alt.alternate.len());
        let end = start + ref_len as i64 - 1;
        let kind = if ref_len == alt_len {
            if ref_len > 1 {
                VariantKind::Mnv
            } else {
                VariantKind::Snv
            }
        } else if start > end {
            VariantKind::Insertion
        } else {
            VariantKind::Deletion
        };
        Self {
            chromosome: chromosome.into(),
            start,
            end,
            ref_alt,
            kind,
        }
    }

    /// Whether the target is an insertion.
    pub fn is_insertion(&self) -> bool {
        self.kind == VariantKind::Insertion
    }

    /// Longer of the two allele sequences.
    pub fn length(&self) -> usize {
        self.ref_alt.reference.len().max(self.ref_alt.alternate.len())
    }

    /// Distance between start and end, the primary processing order.
    pub fn width(&self) -> i64 {
        (self.start - self.end).abs()
    }
}

impl fmt::Display for TargetVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.chromosome,
            self.start,
            or_dash(&self.ref_alt.reference),
            or_dash(&self.ref_alt.alternate)
        )
    }
}

fn or_dash(sequence: &str) -> &str {
    if sequence.is_empty() {
        "-"
    } else {
        sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("A", "G", 123, VariantKind::Snv; "snv")]
    #[test_case("AC", "GT", 124, VariantKind::Mnv; "mnv")]
    #[test_case("", "G", 122, VariantKind::Insertion; "insertion")]
    #[test_case("GT", "", 124, VariantKind::Deletion; "deletion")]
    #[test_case("GTT", "G", 125, VariantKind::Deletion; "anchored deletion")]
    fn kind_and_end_follow_sequences(
        reference: &str,
        alternate: &str,
        end: i64,
        kind: VariantKind,
    ) {
        let target = TargetVariant::from_ref_alt("10", 123, RefAlt::new(reference, alternate));
        assert_eq!(target.end, end);
        assert_eq!(target.kind, kind);
    }

    #[test]
    fn display_marks_empty_alleles() {
        let target = TargetVariant::from_ref_alt("1", 14, RefAlt::new("", "AGC"));
        assert_eq!(target.to_string(), "1:14:-:AGC");
        assert!(target.is_insertion());
        assert_eq!(target.width(), 1);
        assert_eq!(target.length(), 3);
    }
}
