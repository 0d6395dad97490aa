//! Window-at-a-time driver tying the calculator, combiner and codec together.
//!
//! Every failure is reported as a [`WindowError`] naming the window it
//! happened in, so one bad window can be skipped or retried on its own.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::codec::{CodecError, EncodedWindow, WindowCodec};
use crate::combine::{
    AlleleTransfer, CombineError, CombinedAllele, GenotypeCollection, GenotypeError,
    GenotypeResolver,
};
use crate::config::StoreConfig;
use crate::count::{AlleleCalculator, CalculatorError, GenotypeCall, PileupMap, RegionCalculator};
use crate::region::{Interval, SampleId};

/// What went wrong inside a window.
#[derive(Debug, Error)]
pub enum WindowErrorKind {
    /// Ingestion or aggregation failed.
    #[error(transparent)]
    Calculator(#[from] CalculatorError),
    /// Allele projection failed.
    #[error(transparent)]
    Combine(#[from] CombineError),
    /// Encoding or decoding failed.
    #[error(transparent)]
    Codec(#[from] CodecError),
    /// Genotype reconstruction failed.
    #[error(transparent)]
    Genotype(#[from] GenotypeError),
}

/// A window that failed to process.
#[derive(Debug, Error)]
#[error("window {chromosome}:{start}-{end} failed to process")]
pub struct WindowError {
    /// Chromosome of the window.
    pub chromosome: String,
    /// First position of the window.
    pub start: i64,
    /// Last position of the window.
    pub end: i64,
    /// Underlying failure.
    #[source]
    pub kind: WindowErrorKind,
}

impl WindowError {
    fn at<'a, E>(chromosome: &'a str, window: &Interval<()>) -> impl FnOnce(E) -> Self + 'a
    where
        E: Into<WindowErrorKind>,
    {
        let (start, end) = (window.start, window.end);
        move |error| Self {
            chromosome: chromosome.to_string(),
            start,
            end,
            kind: error.into(),
        }
    }
}

/// A combined allele with its reconstructed genotypes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAllele {
    /// Combined counts of the allele.
    pub allele: CombinedAllele,
    /// Genotype → samples for the requested samples.
    pub genotypes: GenotypeCollection,
}

/// Processes one study window by window.
#[derive(Debug, Clone)]
pub struct WindowPipeline {
    study: String,
    config: StoreConfig,
    codec: WindowCodec,
    samples: BTreeMap<String, SampleId>,
}

impl WindowPipeline {
    /// Pipeline for `study` over the indexed `samples`.
    ///
    /// Invalid settings surface as [`CodecError::Config`].
    pub fn new(
        study: impl Into<String>,
        samples: BTreeMap<String, SampleId>,
        config: StoreConfig,
    ) -> Result<Self, CodecError> {
        let codec = WindowCodec::from_config(&config)?;
        Ok(Self {
            study: study.into(),
            config,
            codec,
            samples,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Window codec.
    pub fn codec(&self) -> &WindowCodec {
        &self.codec
    }

    /// Indexed sample ids.
    pub fn sample_ids(&self) -> BTreeSet<SampleId> {
        self.samples.values().copied().collect()
    }

    /// Ingest the calls of `chromosome` into a calculator over `window`,
    /// then mark every position without data as a no-call.
    pub fn ingest(
        &self,
        chromosome: &str,
        window: &Interval<()>,
        calls: &[GenotypeCall],
    ) -> Result<RegionCalculator, WindowError> {
        if window.start > window.end {
            return Err(WindowError::at(chromosome, window)(CalculatorError::InvertedWindow {
                start: window.start,
                end: window.end,
            }));
        }
        let mut calculator =
            RegionCalculator::new(self.study.as_str(), window, self.samples.clone(), &self.config);
        let mut skipped = 0usize;
        for call in calls {
            if call.chromosome != chromosome {
                skipped += 1;
                continue;
            }
            calculator
                .add_call(call)
                .map_err(WindowError::at(chromosome, window))?;
        }
        if skipped > 0 {
            debug!(chromosome, skipped, "skipped calls on other chromosomes");
        }
        if calculator.store().is_empty() {
            warn!(chromosome, start = window.start, end = window.end, "no calls in window");
        }
        calculator.fill_no_calls(&self.sample_ids(), window.start, window.end + 1);
        info!(
            chromosome,
            start = window.start,
            end = window.end,
            intervals = calculator.store().len(),
            "ingested window"
        );
        Ok(calculator)
    }

    /// Ingest and encode one window.
    pub fn encode(
        &self,
        chromosome: &str,
        window: &Interval<()>,
        calls: &[GenotypeCall],
    ) -> Result<Vec<EncodedWindow>, WindowError> {
        let calculator = self.ingest(chromosome, window, calls)?;
        self.codec
            .encode_store(chromosome, calculator.store())
            .map_err(WindowError::at(chromosome, window))
    }

    /// Calculator over `window` loaded from encoded windows.
    pub fn load(
        &self,
        chromosome: &str,
        window: &Interval<()>,
        encoded: &[EncodedWindow],
    ) -> Result<RegionCalculator, WindowError> {
        let store = self
            .codec
            .decode_store(window, encoded)
            .map_err(WindowError::at(chromosome, window))?;
        if store.is_empty() {
            warn!(chromosome, start = window.start, end = window.end, "no data decoded for window");
        }
        Ok(RegionCalculator::from_store(
            self.study.as_str(),
            store,
            self.samples.clone(),
            &self.config,
        ))
    }

    /// Pileup rows over the calculator's window.
    pub fn pileup(
        &self,
        chromosome: &str,
        calculator: &RegionCalculator,
    ) -> Result<PileupMap, WindowError> {
        let window = calculator.store().target().clone();
        calculator
            .build_pileup_map(&window)
            .map_err(WindowError::at(chromosome, &window))
    }

    /// Combine every allele starting in the calculator's window and
    /// reconstruct the genotypes of `samples` (all indexed samples when
    /// empty).
    pub fn genotypes(
        &self,
        chromosome: &str,
        calculator: &RegionCalculator,
        samples: &BTreeSet<SampleId>,
    ) -> Result<Vec<ResolvedAllele>, WindowError> {
        let window = calculator.store().target().clone();
        let indexed = self.sample_ids();
        let samples = if samples.is_empty() { indexed.clone() } else { samples.clone() };

        let mut transfer = AlleleTransfer::new(chromosome, indexed.clone());
        let combined = transfer
            .transfer_window(calculator, &window)
            .map_err(WindowError::at(chromosome, &window))?;
        let resolver = GenotypeResolver::new(indexed);
        let mut resolved = Vec::with_capacity(combined.len());
        for allele in combined {
            let genotypes = resolver
                .resolve(&allele.target, &allele.counts, &samples)
                .map_err(WindowError::at(chromosome, &window))?;
            resolved.push(ResolvedAllele { allele, genotypes });
        }
        info!(
            chromosome,
            start = window.start,
            end = window.end,
            alleles = resolved.len(),
            "resolved genotypes"
        );
        Ok(resolved)
    }
}
