use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Allele index used for an uncalled genotype slot (`.`).
pub const NO_CALL_INDEX: i32 = -1;

/// Variant type as reported by the call reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// Single nucleotide variant.
    Snv,
    /// Multi nucleotide variant.
    Mnv,
    /// Insertion or deletion, resolved from the coordinates.
    Indel,
    /// Insertion.
    Insertion,
    /// Deletion.
    Deletion,
    /// Reference-only block.
    NoVariation,
    /// Complex allele; not supported by the region model.
    Mixed,
}

/// Unrecognised call kind name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown variant kind `{0}`")]
pub struct UnknownCallKind(pub String);

impl FromStr for CallKind {
    type Err = UnknownCallKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SNV" | "SNP" => Ok(CallKind::Snv),
            "MNV" | "MNP" => Ok(CallKind::Mnv),
            "INDEL" => Ok(CallKind::Indel),
            "INSERTION" | "INS" => Ok(CallKind::Insertion),
            "DELETION" | "DEL" => Ok(CallKind::Deletion),
            "NO_VARIATION" | "REF" | "REFERENCE" => Ok(CallKind::NoVariation),
            "MIXED" => Ok(CallKind::Mixed),
            _ => Err(UnknownCallKind(s.to_string())),
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallKind::Snv => "SNV",
            CallKind::Mnv => "MNV",
            CallKind::Indel => "INDEL",
            CallKind::Insertion => "INSERTION",
            CallKind::Deletion => "DELETION",
            CallKind::NoVariation => "NO_VARIATION",
            CallKind::Mixed => "MIXED",
        };
        f.write_str(name)
    }
}

/// Additional alternate allele reported at a multi-allelic site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryAlternate {
    /// First position of the allele.
    pub start: i64,
    /// Last position of the allele (`start - 1` for insertions).
    pub end: i64,
    /// Reference sequence.
    pub reference: String,
    /// Alternate sequence.
    pub alternate: String,
    /// Variant type.
    pub kind: CallKind,
}

impl SecondaryAlternate {
    /// Secondary alternate over explicit coordinates.
    pub fn new(
        start: i64,
        end: i64,
        reference: impl Into<String>,
        alternate: impl Into<String>,
        kind: CallKind,
    ) -> Self {
        Self {
            start,
            end,
            reference: reference.into(),
            alternate: alternate.into(),
            kind,
        }
    }
}

/// Genotype and format fields of one sample at one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleGenotype {
    /// Sample name as indexed.
    pub sample: String,
    /// Genotype string such as `0/1`, `1|2` or `./.`.
    pub genotype: String,
    /// Total read depth (`DP`).
    pub depth: Option<i32>,
    /// Per-allele read depth (`AD`), indexed by allele.
    pub allele_depths: Vec<i32>,
}

impl SampleGenotype {
    /// Genotype without depth information.
    pub fn new(sample: impl Into<String>, genotype: impl Into<String>) -> Self {
        Self {
            sample: sample.into(),
            genotype: genotype.into(),
            depth: None,
            allele_depths: Vec::new(),
        }
    }

    /// Set the total read depth.
    pub fn with_depth(mut self, depth: i32) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Set the per-allele read depths.
    pub fn with_allele_depths(mut self, depths: Vec<i32>) -> Self {
        self.allele_depths = depths;
        self
    }
}

/// One genotype call record for a genomic site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenotypeCall {
    /// Chromosome name.
    pub chromosome: String,
    /// First position of the site.
    pub start: i64,
    /// Last position of the site.
    pub end: i64,
    /// Reference sequence.
    pub reference: String,
    /// Primary alternate sequence.
    pub alternate: String,
    /// Variant type of the primary alternate.
    pub kind: CallKind,
    /// Further alternates, genotype index 2 onwards.
    pub secondary_alternates: Vec<SecondaryAlternate>,
    /// Filter column value; `None` means not filtered (`.`).
    pub filter: Option<String>,
    /// Per-sample genotypes.
    pub samples: Vec<SampleGenotype>,
}

impl GenotypeCall {
    /// Call with explicit coordinates and kind.
    pub fn new(
        chromosome: impl Into<String>,
        start: i64,
        end: i64,
        reference: impl Into<String>,
        alternate: impl Into<String>,
        kind: CallKind,
    ) -> Self {
        Self {
            chromosome: chromosome.into(),
            start,
            end,
            reference: reference.into(),
            alternate: alternate.into(),
            kind,
            secondary_alternates: Vec::new(),
            filter: None,
            samples: Vec::new(),
        }
    }

    /// Call whose end and kind follow from the allele sequences.
    ///
    /// `end = start + len(ref) - 1`; equal lengths give an SNV (or MNV when
    /// longer than one base), anything else an indel.
    pub fn from_alleles(
        chromosome: impl Into<String>,
        start: i64,
        reference: impl Into<String>,
        alternate: impl Into<String>,
    ) -> Self {
        let reference = reference.into();
        let alternate = alternate.into();
        let end = start + reference.len() as i64 - 1;
        let kind = match (reference.len(), alternate.len()) {
            (r, a) if r == a && r > 1 => CallKind::Mnv,
            (r, a) if r == a => CallKind::Snv,
            _ => CallKind::Indel,
        };
        Self::new(chromosome, start, end, reference, alternate, kind)
    }

    /// Reference-only block over `[start, end]`.
    pub fn reference_block(chromosome: impl Into<String>, start: i64, end: i64) -> Self {
        Self::new(chromosome, start, end, "N", ".", CallKind::NoVariation)
    }

    /// Add a secondary alternate.
    pub fn with_secondary(mut self, secondary: SecondaryAlternate) -> Self {
        self.secondary_alternates.push(secondary);
        self
    }

    /// Set the filter value.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Add a sample genotype.
    pub fn with_sample(mut self, sample: SampleGenotype) -> Self {
        self.samples.push(sample);
        self
    }

    /// Whether the filter value equals `pass_token`.
    pub fn passes(&self, pass_token: &str) -> bool {
        self.filter.as_deref() == Some(pass_token)
    }
}

/// Genotype string that could not be parsed.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed genotype `{0}`")]
pub struct InvalidGenotype(pub String);

/// Parsed genotype: one allele index per chromosome copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genotype {
    alleles: Vec<i32>,
}

impl Genotype {
    /// Parse `/`- or `|`-separated allele indexes; `.` is a no-call slot.
    pub fn parse(genotype: &str) -> Result<Self, InvalidGenotype> {
        let trimmed = genotype.trim();
        if trimmed.is_empty() {
            return Err(InvalidGenotype(genotype.to_string()));
        }
        let alleles = trimmed
            .split(['/', '|'])
            .map(|token| match token {
                "." => Ok(NO_CALL_INDEX),
                _ => token
                    .parse::<u16>()
                    .map(i32::from)
                    .map_err(|_| InvalidGenotype(genotype.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { alleles })
    }

    /// Number of chromosome copies.
    pub fn ploidy(&self) -> i32 {
        self.alleles.len() as i32
    }

    /// Allele indexes in genotype order.
    pub fn alleles(&self) -> &[i32] {
        &self.alleles
    }

    /// Copies per allele index.
    ///
    /// A no-call slot next to called alleles is dropped; a genotype made only
    /// of no-call slots reports a single no-call copy.
    pub fn allele_copies(&self) -> BTreeMap<i32, i32> {
        let mut copies = BTreeMap::new();
        for &allele in &self.alleles {
            *copies.entry(allele).or_insert(0) += 1;
        }
        if copies.len() > 1 {
            copies.remove(&NO_CALL_INDEX);
        } else if let Some(count) = copies.get_mut(&NO_CALL_INDEX) {
            *count = 1;
        }
        copies
    }
}
