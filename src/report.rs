//! Tab-separated renderings of pileups and genotypes.
//!
//! Writers take any `io::Write` and return `anyhow::Result`; the binary
//! points them at stdout.

use anyhow::{anyhow, Result};
use std::io::Write;

use crate::count::{CountBuckets, PileupMap};
use crate::pipeline::ResolvedAllele;
use crate::region::SampleId;

const PILEUP_HEADER: &str = "#CHROM\tPOS\tREF\tALT\tPASS\tNOT_PASS\n";
const GENOTYPE_HEADER: &str = "#CHROM\tPOS\tREF\tALT\tALLELES\tGENOTYPES\n";

fn ids(ids: &[SampleId]) -> String {
    if ids.is_empty() {
        return ".".to_string();
    }
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
}

fn buckets(buckets: &CountBuckets) -> String {
    let parts: Vec<String> = buckets
        .iter()
        .filter(|(_, samples)| !samples.is_empty())
        .map(|(count, samples)| format!("{count}:{}", ids(samples)))
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join(";")
    }
}

/// Write pileup rows, one line per position.
pub fn write_pileup<W: Write>(writer: &mut W, chromosome: &str, rows: &PileupMap) -> Result<()> {
    writer.write_all(PILEUP_HEADER.as_bytes())?;
    for (position, row) in rows {
        let alternates: Vec<String> = row
            .alt_map
            .iter()
            .map(|(key, counts)| format!("{key}={}", buckets(counts)))
            .collect();
        let alternates = if alternates.is_empty() {
            ".".to_string()
        } else {
            alternates.join("|")
        };
        writeln!(
            writer,
            "{chromosome}\t{position}\t{}\t{alternates}\t{}\t{}",
            buckets(&row.reference),
            ids(&row.pass),
            ids(&row.not_pass)
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write resolved genotypes, one line per combined allele.
pub fn write_genotypes<W: Write>(writer: &mut W, resolved: &[ResolvedAllele]) -> Result<()> {
    writer.write_all(GENOTYPE_HEADER.as_bytes())?;
    for entry in resolved {
        let target = &entry.allele.target;
        let alleles = entry
            .genotypes
            .alleles
            .iter()
            .map(|allele| if allele.is_empty() { "-" } else { allele.as_str() })
            .collect::<Vec<_>>()
            .join(",");
        let genotypes = entry
            .genotypes
            .genotypes
            .iter()
            .map(|(genotype, samples)| {
                let samples: Vec<SampleId> = samples.iter().copied().collect();
                format!("{genotype}={}", ids(&samples))
            })
            .collect::<Vec<_>>()
            .join(";");
        let allele = |sequence: &str| {
            if sequence.is_empty() {
                "-".to_string()
            } else {
                sequence.to_string()
            }
        };
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{alleles}\t{genotypes}",
            target.chromosome,
            target.start,
            allele(&target.ref_alt.reference),
            allele(&target.ref_alt.alternate),
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Render pileup rows into a string.
pub fn render_pileup(chromosome: &str, rows: &PileupMap) -> Result<String> {
    let mut buffer = Vec::new();
    write_pileup(&mut buffer, chromosome, rows)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered pileup is not valid UTF-8"))
}

/// Render resolved genotypes into a string.
pub fn render_genotypes(resolved: &[ResolvedAllele]) -> Result<String> {
    let mut buffer = Vec::new();
    write_genotypes(&mut buffer, resolved)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("rendered genotypes are not valid UTF-8"))
}
