use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use allele_store::codec::{EncodedWindow, WindowKey};
use allele_store::count::{CallKind, GenotypeCall, SampleGenotype, SecondaryAlternate};
use allele_store::report::{write_genotypes, write_pileup};
use allele_store::{Interval, SampleId, StoreConfig, WindowPipeline};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "allele-store", about = "Region-based allele count storage")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Region {
    /// Chromosome name.
    #[arg(long)]
    chrom: String,
    /// First position of the region (1-based, inclusive).
    #[arg(long)]
    start: i64,
    /// Last position of the region (inclusive).
    #[arg(long)]
    end: i64,
    /// Positions per encoded window.
    #[arg(long, default_value_t = allele_store::config::DEFAULT_WINDOW_SIZE)]
    window_size: u32,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest genotype calls and write one file per encoded window.
    Encode {
        /// Calls file (tab-separated, one site per line).
        #[arg(long)]
        calls: PathBuf,
        /// Sample index (`<name>\t<id>` per line).
        #[arg(long)]
        samples: PathBuf,
        #[command(flatten)]
        region: Region,
        /// Filter value treated as passing.
        #[arg(long, default_value = allele_store::config::DEFAULT_PASS_TOKEN)]
        pass_token: String,
        /// Study identifier.
        #[arg(long, default_value = "study")]
        study: String,
        /// Output directory.
        #[arg(long)]
        out: PathBuf,
    },
    /// Decode stored windows and print the pileup rows.
    Pileup {
        /// Directory of encoded windows.
        #[arg(long)]
        input: PathBuf,
        #[command(flatten)]
        region: Region,
    },
    /// Decode stored windows, combine every allele and print genotypes.
    Genotypes {
        /// Directory of encoded windows.
        #[arg(long)]
        input: PathBuf,
        /// Sample index (`<name>\t<id>` per line).
        #[arg(long)]
        samples: PathBuf,
        #[command(flatten)]
        region: Region,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Encode {
            calls,
            samples,
            region,
            pass_token,
            study,
            out,
        } => run_encode(&calls, &samples, &region, pass_token, study, &out)?,
        Commands::Pileup { input, region } => run_pileup(&input, &region)?,
        Commands::Genotypes {
            input,
            samples,
            region,
        } => run_genotypes(&input, &samples, &region)?,
    }

    Ok(())
}

fn window(region: &Region) -> Result<Interval<()>> {
    if region.start > region.end {
        bail!("region start {} is after end {}", region.start, region.end);
    }
    Ok(Interval::window(region.start, region.end))
}

fn run_encode(
    calls_path: &Path,
    samples_path: &Path,
    region: &Region,
    pass_token: String,
    study: String,
    out: &Path,
) -> Result<()> {
    let samples = read_samples(samples_path)?;
    let config = StoreConfig::default()
        .with_window_size(region.window_size)
        .with_pass_token(pass_token);
    let pipeline = WindowPipeline::new(study, samples, config).context("invalid configuration")?;
    let calls = read_calls(calls_path)?;
    let window = window(region)?;

    let encoded = pipeline.encode(&region.chrom, &window, &calls)?;
    fs::create_dir_all(out).with_context(|| format!("failed to create {}", out.display()))?;
    for entry in &encoded {
        let path = out.join(entry.key.file_name());
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        entry
            .append_to(&mut writer)
            .with_context(|| format!("failed to append to {}", path.display()))?;
        writer
            .flush()
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    info!(windows = encoded.len(), out = %out.display(), "wrote encoded windows");
    Ok(())
}

fn run_pileup(input: &Path, region: &Region) -> Result<()> {
    let config = StoreConfig::default().with_window_size(region.window_size);
    let pipeline =
        WindowPipeline::new("study", BTreeMap::new(), config).context("invalid configuration")?;
    let window = window(region)?;
    let encoded = read_windows(input, &pipeline, &region.chrom, &window)?;

    let calculator = pipeline.load(&region.chrom, &window, &encoded)?;
    let rows = pipeline.pileup(&region.chrom, &calculator)?;
    write_pileup(&mut io::stdout().lock(), &region.chrom, &rows)
}

fn run_genotypes(input: &Path, samples_path: &Path, region: &Region) -> Result<()> {
    let samples = read_samples(samples_path)?;
    let config = StoreConfig::default().with_window_size(region.window_size);
    let pipeline = WindowPipeline::new("study", samples, config).context("invalid configuration")?;
    let window = window(region)?;
    let encoded = read_windows(input, &pipeline, &region.chrom, &window)?;

    let calculator = pipeline.load(&region.chrom, &window, &encoded)?;
    let resolved = pipeline.genotypes(&region.chrom, &calculator, &BTreeSet::new())?;
    write_genotypes(&mut io::stdout().lock(), &resolved)
}

fn read_windows(
    input: &Path,
    pipeline: &WindowPipeline,
    chrom: &str,
    window: &Interval<()>,
) -> Result<Vec<EncodedWindow>> {
    let bases: BTreeSet<i64> = pipeline
        .codec()
        .windows(window)
        .iter()
        .map(|w| w.start)
        .collect();
    let entries =
        fs::read_dir(input).with_context(|| format!("failed to read {}", input.display()))?;

    let mut encoded = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        let key = match WindowKey::from_file_name(name) {
            Ok(key) => key,
            Err(error) => {
                warn!(file = name, %error, "skipping file");
                continue;
            }
        };
        if key.chromosome != chrom || !bases.contains(&key.base) {
            continue;
        }
        let contents =
            fs::read(&path).with_context(|| format!("failed to read {}", path.display()))?;
        encoded.extend(EncodedWindow::read_frames(&key, &contents)?);
    }
    // stable, so frames of one file keep their append order
    encoded.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(encoded)
}

fn read_samples(path: &Path) -> Result<BTreeMap<String, SampleId>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open sample index {}", path.display()))?;
    let mut samples = BTreeMap::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let (name, id) = line
            .split_once('\t')
            .ok_or_else(|| anyhow!("expected `<name>\\t<id>` on line {}", line_no + 1))?;
        let id: SampleId = id
            .trim()
            .parse()
            .with_context(|| format!("invalid sample id '{}' on line {}", id, line_no + 1))?;
        samples.insert(name.trim().to_string(), id);
    }
    Ok(samples)
}

fn read_calls(path: &Path) -> Result<Vec<GenotypeCall>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open calls file {}", path.display()))?;
    let mut calls = Vec::new();
    for (line_no, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let call =
            parse_call(&line).with_context(|| format!("invalid call on line {}", line_no + 1))?;
        calls.push(call);
    }
    Ok(calls)
}

fn allele(field: &str) -> &str {
    if field == "-" {
        ""
    } else {
        field
    }
}

fn parse_call(line: &str) -> Result<GenotypeCall> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 8 {
        bail!("expected at least 8 columns, found {}", fields.len());
    }
    let start: i64 = fields[1].parse().with_context(|| format!("invalid start '{}'", fields[1]))?;
    let end: i64 = fields[2].parse().with_context(|| format!("invalid end '{}'", fields[2]))?;
    let kind: CallKind = fields[5].parse()?;

    let (reference, alternate) = (allele(fields[3]), allele(fields[4]));
    let mut call = GenotypeCall::new(fields[0], start, end, reference, alternate, kind);
    if fields[6] != "." {
        call = call.with_filter(fields[6]);
    }
    if fields[7] != "." {
        for secondary in fields[7].split(',') {
            call = call.with_secondary(parse_secondary(secondary)?);
        }
    }
    for sample in &fields[8..] {
        call = call.with_sample(parse_sample(sample)?);
    }
    Ok(call)
}

fn parse_secondary(field: &str) -> Result<SecondaryAlternate> {
    let parts: Vec<&str> = field.split(':').collect();
    let [range, reference, alternate, kind] = parts.as_slice() else {
        bail!("secondary alternate '{field}' is not start-end:ref:alt:kind");
    };
    let (start, end) = range
        .split_once('-')
        .ok_or_else(|| anyhow!("secondary range '{range}' is not start-end"))?;
    Ok(SecondaryAlternate::new(
        start.parse().with_context(|| format!("invalid secondary start '{start}'"))?,
        end.parse().with_context(|| format!("invalid secondary end '{end}'"))?,
        allele(reference),
        allele(alternate),
        kind.parse()?,
    ))
}

fn parse_sample(field: &str) -> Result<SampleGenotype> {
    let (name, format) = field
        .split_once('=')
        .ok_or_else(|| anyhow!("sample '{field}' is not name=GT[:DP[:AD]]"))?;
    let mut parts = format.split(':');
    let genotype = parts.next().unwrap_or_default();
    let mut sample = SampleGenotype::new(name, genotype);
    if let Some(depth) = parts.next().filter(|depth| *depth != ".") {
        let depth = depth
            .parse()
            .with_context(|| format!("invalid depth '{depth}'"))?;
        sample = sample.with_depth(depth);
    }
    if let Some(depths) = parts.next().filter(|depths| *depths != ".") {
        let depths = depths
            .split(',')
            .map(|depth| depth.parse().with_context(|| format!("invalid allele depth '{depth}'")))
            .collect::<Result<Vec<i32>>>()?;
        sample = sample.with_allele_depths(depths);
    }
    Ok(sample)
}
