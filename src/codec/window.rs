use std::collections::{BTreeMap, BTreeSet};

use bincode::Options;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::key::WindowKey;
use crate::config::{ConfigError, StoreConfig};
use crate::region::{
    AlleleIdentity, AlleleObservation, Category, Interval, ObservationInterval, RefAlt,
    RegionStore, SampleId, VariantKind,
};

/// Start offset → end offset → leaf.
type Offsets<L> = BTreeMap<i64, BTreeMap<i64, L>>;

/// pass → kind code → count → depth → offsets.
type Columns<L> = BTreeMap<bool, BTreeMap<u8, BTreeMap<i32, BTreeMap<i32, Offsets<L>>>>>;

type Samples = BTreeSet<SampleId>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct WindowColumns {
    /// First and last offset of the queried range.
    covered: (i64, i64),
    reference: Columns<Samples>,
    no_call: Columns<Samples>,
    variation: Columns<BTreeMap<RefAlt, Samples>>,
}

/// Errors of the window encoding.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Serialization failed.
    #[error("failed to encode window at {base}")]
    Encode {
        /// Window base.
        base: i64,
        /// Serializer error.
        #[source]
        source: bincode::Error,
    },

    /// Blob is not a valid window encoding.
    #[error("malformed window blob at {base}")]
    Decode {
        /// Window base.
        base: i64,
        /// Deserializer error.
        #[source]
        source: bincode::Error,
    },

    /// Kind code without a variant kind.
    #[error("unknown variant kind code {code} in window at {base}")]
    UnknownKind {
        /// Window base.
        base: i64,
        /// Stored code.
        code: u8,
    },

    /// Row key or file name that does not parse.
    #[error("malformed window key `{0}`")]
    MalformedKey(String),

    /// Window with `start > end`.
    #[error("inverted window [{start}, {end}]")]
    InvertedWindow {
        /// Window start.
        start: i64,
        /// Window end.
        end: i64,
    },

    /// Window file whose frames do not parse.
    #[error("malformed frame in window file {key}")]
    Frame {
        /// Key of the file.
        key: WindowKey,
        /// Deserializer error.
        #[source]
        source: bincode::Error,
    },

    /// Invalid codec settings.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub(super) fn options() -> impl Options {
    bincode::DefaultOptions::new()
}

fn leaf<'a, L: Default>(
    columns: &'a mut Columns<L>,
    base: i64,
    interval: &ObservationInterval,
) -> &'a mut L {
    let observation = &interval.payload;
    columns
        .entry(observation.pass)
        .or_default()
        .entry(observation.kind.code())
        .or_default()
        .entry(observation.count)
        .or_default()
        .entry(observation.depth)
        .or_default()
        .entry(interval.start - base)
        .or_default()
        .entry(interval.end - base)
        .or_default()
}

/// Part of `window` inside the store's target, if any.
fn clip(store: &RegionStore, window: &Interval<()>) -> Option<Interval<()>> {
    let target = store.target();
    let start = window.start.max(target.start);
    let end = window.end.min(target.end);
    (start <= end).then(|| Interval::window(start, end))
}

/// Encode every interval of `store` visible in `window`.
///
/// Offsets are relative to `window.start`; intervals reaching outside the
/// window keep their exact bounds. Only the part of the window inside the
/// store's target is queried, and that range is stored with the blob.
pub fn encode_window(store: &RegionStore, window: &Interval<()>) -> Result<Vec<u8>, CodecError> {
    if window.start > window.end {
        return Err(CodecError::InvertedWindow {
            start: window.start,
            end: window.end,
        });
    }
    let base = window.start;
    let mut columns = WindowColumns {
        covered: (0, window.end - base),
        ..WindowColumns::default()
    };
    if let Some(range) = clip(store, window) {
        columns.covered = (range.start - base, range.end - base);
        collect(store, &range, base, &mut columns);
    }
    options()
        .serialize(&columns)
        .map_err(|source| CodecError::Encode { base, source })
}

fn collect(store: &RegionStore, window: &Interval<()>, base: i64, columns: &mut WindowColumns) {
    store.query_reference(window, |interval| {
        leaf(&mut columns.reference, base, interval)
            .extend(interval.payload.sample_ids.iter().copied());
    });
    store.query_no_call(window, |interval| {
        leaf(&mut columns.no_call, base, interval)
            .extend(interval.payload.sample_ids.iter().copied());
    });
    store.query_variation(window, |interval| {
        if let Some(pair) = interval.payload.identity.ref_alt() {
            leaf(&mut columns.variation, base, interval)
                .entry(pair.clone())
                .or_default()
                .extend(interval.payload.sample_ids.iter().copied());
        }
    });
}

/// Decode one window blob into a fresh store over `window`.
pub fn decode_window(window: &Interval<()>, bytes: &[u8]) -> Result<RegionStore, CodecError> {
    let mut store = RegionStore::new(window.start, window.end);
    decode_window_into(&mut store, window.start, bytes)?;
    Ok(store)
}

/// Decode one window blob with base `base` into an existing store.
///
/// An interval is kept only when the first position at which the store's
/// target sees it lies in the range the blob was encoded from. Blobs of
/// neighbouring windows, or of neighbouring regions sharing a window,
/// therefore load a spanning interval once.
pub fn decode_window_into(
    store: &mut RegionStore,
    base: i64,
    bytes: &[u8],
) -> Result<usize, CodecError> {
    load_columns(store, base, read_columns(base, bytes)?)
}

fn read_columns(base: i64, bytes: &[u8]) -> Result<WindowColumns, CodecError> {
    options()
        .deserialize(bytes)
        .map_err(|source| CodecError::Decode { base, source })
}

fn load_columns(
    store: &mut RegionStore,
    base: i64,
    columns: WindowColumns,
) -> Result<usize, CodecError> {
    let (from, to) = (base + columns.covered.0, base + columns.covered.1);
    let target_start = store.target().start;
    let mut added = 0;
    let mut keep = |store: &mut RegionStore, category: Category, interval: ObservationInterval| {
        let first = category.visible_span(&interval).0.max(target_start);
        if first < from || first > to {
            return;
        }
        if store.add(interval) {
            added += 1;
        }
    };

    for (key, samples) in leaves(columns.reference, base)? {
        let interval = key.interval(AlleleIdentity::Reference, samples);
        keep(store, Category::Reference, interval);
    }
    for (key, samples) in leaves(columns.no_call, base)? {
        let interval = key.interval(AlleleIdentity::NoCall, samples);
        keep(store, Category::NoCall, interval);
    }
    for (key, alleles) in leaves(columns.variation, base)? {
        for (pair, samples) in alleles {
            let interval = key.interval(AlleleIdentity::Alt(pair), samples);
            keep(store, Category::Variation, interval);
        }
    }
    Ok(added)
}

#[derive(Debug, Clone, Copy)]
struct LeafKey {
    pass: bool,
    kind: VariantKind,
    count: i32,
    depth: i32,
    start: i64,
    end: i64,
}

impl LeafKey {
    fn interval(&self, identity: AlleleIdentity, samples: Samples) -> ObservationInterval {
        Interval::new(
            self.start,
            self.end,
            AlleleObservation::new(self.count, self.depth, self.pass, self.kind, identity)
                .with_samples(samples),
        )
    }
}

/// Flatten the nested columns back into absolute leaf keys.
fn leaves<L>(columns: Columns<L>, base: i64) -> Result<Vec<(LeafKey, L)>, CodecError> {
    let mut flat = Vec::new();
    for (pass, kinds) in columns {
        for (code, counts) in kinds {
            let kind = VariantKind::from_code(code).ok_or(CodecError::UnknownKind { base, code })?;
            for (count, depths) in counts {
                for (depth, starts) in depths {
                    for (start, ends) in starts {
                        for (end, leaf) in ends {
                            let key = LeafKey {
                                pass,
                                kind,
                                count,
                                depth,
                                start: base + start,
                                end: base + end,
                            };
                            flat.push((key, leaf));
                        }
                    }
                }
            }
        }
    }
    Ok(flat)
}

/// One persisted window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedWindow {
    /// Row key.
    pub key: WindowKey,
    /// Encoded intervals.
    pub bytes: Vec<u8>,
}

/// Splits stores into fixed-size windows and reassembles them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCodec {
    window_size: i64,
}

impl WindowCodec {
    /// Codec with `window_size` positions per window.
    pub fn new(window_size: u32) -> Result<Self, CodecError> {
        if window_size == 0 {
            return Err(ConfigError::ZeroWindowSize.into());
        }
        Ok(Self {
            window_size: i64::from(window_size),
        })
    }

    /// Codec for a validated configuration.
    pub fn from_config(config: &StoreConfig) -> Result<Self, CodecError> {
        config.validate()?;
        Self::new(config.window_size)
    }

    /// Positions per window.
    pub fn window_size(&self) -> i64 {
        self.window_size
    }

    /// Base of the window containing `position`.
    pub fn window_base(&self, position: i64) -> i64 {
        position.div_euclid(self.window_size) * self.window_size
    }

    /// Windows intersecting `target`, in ascending order.
    pub fn windows(&self, target: &Interval<()>) -> Vec<Interval<()>> {
        let mut windows = Vec::new();
        let mut base = self.window_base(target.min_position());
        while base <= target.max_position() {
            windows.push(Interval::window(base, base + self.window_size - 1));
            base += self.window_size;
        }
        windows
    }

    /// One blob per non-empty window intersecting the store's target.
    pub fn encode_store(
        &self,
        chromosome: &str,
        store: &RegionStore,
    ) -> Result<Vec<EncodedWindow>, CodecError> {
        let mut encoded = Vec::new();
        for window in self.windows(store.target()) {
            let mut visible = 0usize;
            if let Some(range) = clip(store, &window) {
                store.query_all(&range, |_| visible += 1);
            }
            if visible == 0 {
                continue;
            }
            let bytes = encode_window(store, &window)?;
            debug!(
                chromosome,
                base = window.start,
                intervals = visible,
                bytes = bytes.len(),
                "encoded window"
            );
            encoded.push(EncodedWindow {
                key: WindowKey::new(chromosome, window.start),
                bytes,
            });
        }
        info!(
            chromosome,
            start = store.target().start,
            end = store.target().end,
            windows = encoded.len(),
            "encoded store"
        );
        Ok(encoded)
    }

    /// Rebuild a store over `target` from its encoded windows.
    ///
    /// Several blobs may share a key when neighbouring regions were encoded
    /// into the same window. Their ranges are disjoint unless a region was
    /// encoded again, in which case the later blob wins.
    pub fn decode_store(
        &self,
        target: &Interval<()>,
        windows: &[EncodedWindow],
    ) -> Result<RegionStore, CodecError> {
        // base → blobs in arrival order; a later blob replaces earlier ones
        // of the same window whose ranges it overlaps
        let mut blobs: BTreeMap<i64, Vec<WindowColumns>> = BTreeMap::new();
        for window in windows {
            let base = window.key.base;
            let columns = read_columns(base, &window.bytes)?;
            let (from, to) = columns.covered;
            let slot = blobs.entry(base).or_default();
            let before = slot.len();
            slot.retain(|earlier| earlier.covered.1 < from || to < earlier.covered.0);
            if slot.len() < before {
                let replaced = before - slot.len();
                debug!(key = %window.key, replaced, "superseded window blobs");
            }
            slot.push(columns);
        }

        let mut store = RegionStore::new(target.start, target.end);
        for (base, slot) in blobs {
            for columns in slot {
                let added = load_columns(&mut store, base, columns)?;
                debug!(base, intervals = added, "decoded window");
            }
        }
        Ok(store)
    }
}
