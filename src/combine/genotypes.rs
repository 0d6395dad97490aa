//! Genotype reconstruction from a combined per-allele count.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use super::target::TargetVariant;
use crate::count::{AlleleCountPosition, AltKey, CountBuckets, DEL_SYMBOL, HOM_REF};
use crate::region::{SampleId, NO_CALL};

/// Homozygous reference genotype.
pub const HOM_REF_GT: &str = "0/0";
/// Heterozygous genotype.
pub const HET_REF_GT: &str = "0/1";
/// Homozygous alternate genotype.
pub const HOM_VAR_GT: &str = "1/1";
/// Fully uncalled genotype.
pub const NO_CALL_GT: &str = "./.";

const NO_CALL_ALLELE: &str = ".";

/// Failures while reconstructing genotypes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenotypeError {
    /// Requested sample is not part of the index.
    #[error("sample {0} is not indexed")]
    UnindexedSample(SampleId),

    /// Alternate bucket with a count below one.
    #[error("allele `{allele}` has bucket {count}; alternate counts must be positive")]
    InvalidAlleleCount {
        /// Allele label.
        allele: String,
        /// Offending bucket.
        count: i32,
    },

    /// Pileup key without an allele index.
    #[error("no allele index for `{allele}` at {target}")]
    UnknownAllele {
        /// Allele label.
        allele: String,
        /// Target, `chrom:pos:ref:alt`.
        target: String,
    },
}

/// Allele list and genotype → samples for one target allele.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenotypeCollection {
    /// Allele labels; index 0 is the reference, 1 the target alternate.
    pub alleles: Vec<String>,
    /// Genotype string → samples carrying it.
    pub genotypes: BTreeMap<String, BTreeSet<SampleId>>,
}

impl GenotypeCollection {
    /// Samples with genotype `genotype`, if any.
    pub fn samples(&self, genotype: &str) -> Option<&BTreeSet<SampleId>> {
        self.genotypes.get(genotype)
    }

    /// Position of `allele` in the allele list.
    pub fn allele_index(&self, allele: &str) -> Option<usize> {
        self.alleles.iter().position(|label| label == allele)
    }

    /// Sample → genotype view.
    pub fn by_sample(&self) -> BTreeMap<SampleId, &str> {
        self.genotypes
            .iter()
            .flat_map(|(genotype, ids)| ids.iter().map(move |&id| (id, genotype.as_str())))
            .collect()
    }
}

/// Resolves combined counts into per-sample genotype strings.
#[derive(Debug, Clone)]
pub struct GenotypeResolver {
    indexed: BTreeSet<SampleId>,
}

impl GenotypeResolver {
    /// Resolver over the indexed samples.
    pub fn new(indexed: BTreeSet<SampleId>) -> Self {
        Self { indexed }
    }

    /// Genotypes of `samples` for `target` from its combined `counts`.
    pub fn resolve(
        &self,
        target: &TargetVariant,
        counts: &AlleleCountPosition,
        samples: &BTreeSet<SampleId>,
    ) -> Result<GenotypeCollection, GenotypeError> {
        if let Some(&missing) = samples.iter().find(|&&id| !self.indexed.contains(&id)) {
            return Err(GenotypeError::UnindexedSample(missing));
        }
        let mut current = counts.clone();
        current.retain_samples(samples);
        current.reference.retain(|&count, _| count == NO_CALL || count == 1);
        if !target.is_insertion() {
            current.alt_map.remove(&AltKey::InsertionSpan);
        }

        let mut remaining = samples.clone();
        let alternate_label = target.ref_alt.alternate.clone();
        claim(&mut remaining, &alternate_label, &current.alternate)?;
        for (key, buckets) in &current.alt_map {
            claim(&mut remaining, &allele_label(key), buckets)?;
        }
        let mut no_calls = BTreeSet::new();
        for id in current.reference.get(&NO_CALL).into_iter().flatten() {
            if remaining.remove(id) {
                no_calls.insert(*id);
            }
        }
        for id in current.reference.get(&1).into_iter().flatten() {
            remaining.remove(id);
        }

        let mut collection = GenotypeCollection {
            alleles: vec![target.ref_alt.reference.clone(), alternate_label],
            genotypes: BTreeMap::new(),
        };
        let mut unexplained = BTreeSet::new();
        for (key, buckets) in &current.alt_map {
            let label = allele_label(key);
            if collection.allele_index(&label).is_none() {
                collection.alleles.push(label);
            }
            unexplained.extend(buckets.values().flatten().copied());
        }

        let mut explained = BTreeSet::new();
        if !remaining.is_empty() {
            explained.extend(remaining.iter().copied());
            collection.genotypes.insert(HOM_REF_GT.to_string(), remaining);
        }
        if let Some(ids) = current.alternate.get(&2) {
            explained.extend(ids.iter().copied());
            collection
                .genotypes
                .insert(HOM_VAR_GT.to_string(), ids.iter().copied().collect());
        }

        let mut one_reference: BTreeSet<SampleId> =
            current.reference.get(&1).into_iter().flatten().copied().collect();
        let mut het = BTreeSet::new();
        for &id in current.alternate.get(&1).into_iter().flatten() {
            if one_reference.remove(&id) {
                het.insert(id);
            } else {
                unexplained.insert(id);
            }
        }
        if !het.is_empty() {
            explained.extend(het.iter().copied());
            collection.genotypes.insert(HET_REF_GT.to_string(), het);
        }
        unexplained.extend(one_reference);
        if !no_calls.is_empty() {
            explained.extend(no_calls.iter().copied());
            collection.genotypes.insert(NO_CALL_GT.to_string(), no_calls);
        }

        let unexplained: BTreeSet<SampleId> = unexplained.difference(&explained).copied().collect();
        for (id, genotype) in complex_genotypes(&unexplained, &current, &collection, target)? {
            collection.genotypes.entry(genotype).or_default().insert(id);
        }
        Ok(collection)
    }
}

/// Label of a pileup key in the allele list; insertions share the
/// deletion-span symbol.
fn allele_label(key: &AltKey) -> String {
    match key {
        AltKey::Snv(pair) => pair.alternate.clone(),
        AltKey::DeletionSpan | AltKey::InsertionSpan => DEL_SYMBOL.to_string(),
    }
}

/// Remove every listed sample from `remaining`, validating bucket keys.
fn claim(
    remaining: &mut BTreeSet<SampleId>,
    allele: &str,
    buckets: &CountBuckets,
) -> Result<(), GenotypeError> {
    for (&count, ids) in buckets {
        if count < 1 {
            return Err(GenotypeError::InvalidAlleleCount {
                allele: allele.to_string(),
                count,
            });
        }
        for id in ids {
            remaining.remove(id);
        }
    }
    Ok(())
}

fn repeated(index: &str, count: i32) -> String {
    vec![index; count.max(0) as usize].join("/")
}

/// Compose genotypes for samples that fit none of the simple patterns.
fn complex_genotypes(
    samples: &BTreeSet<SampleId>,
    current: &AlleleCountPosition,
    collection: &GenotypeCollection,
    target: &TargetVariant,
) -> Result<BTreeMap<SampleId, String>, GenotypeError> {
    let mut genotypes: BTreeMap<SampleId, String> = BTreeMap::new();
    if samples.is_empty() {
        return Ok(genotypes);
    }
    for (&count, ids) in &current.reference {
        let genotype = if count == NO_CALL {
            NO_CALL_ALLELE.to_string()
        } else if count != HOM_REF {
            repeated("0", count)
        } else {
            continue;
        };
        for &id in ids {
            genotypes.insert(id, genotype.clone());
        }
    }

    let mut add_allele = |label: &str, buckets: &CountBuckets| -> Result<(), GenotypeError> {
        if buckets.is_empty() {
            return Ok(());
        }
        let index = collection
            .allele_index(label)
            .ok_or_else(|| GenotypeError::UnknownAllele {
                allele: label.to_string(),
                target: target.to_string(),
            })?
            .to_string();
        for (&count, ids) in buckets {
            let part = repeated(&index, count);
            for &id in ids {
                let genotype = genotypes.entry(id).or_default();
                if genotype.is_empty() || genotype == NO_CALL_ALLELE {
                    *genotype = part.clone();
                } else {
                    genotype.push('/');
                    genotype.push_str(&part);
                }
            }
        }
        Ok(())
    };
    for (key, buckets) in &current.alt_map {
        add_allele(&allele_label(key), buckets)?;
    }
    add_allele(&target.ref_alt.alternate, &current.alternate)?;

    let mut resolved = BTreeMap::new();
    for &id in samples {
        let genotype = match genotypes.get(&id) {
            Some(genotype) if !genotype.trim().is_empty() => {
                let mut parts: Vec<&str> = genotype.split('/').collect();
                parts.sort_unstable();
                parts.join("/")
            }
            _ => HOM_REF_GT.to_string(),
        };
        resolved.insert(id, genotype);
    }
    Ok(resolved)
}
