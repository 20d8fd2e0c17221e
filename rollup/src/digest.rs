//! Quantile aggregators backed by a t-digest
//!
//! Exact quantiles would need every sample of a window kept in memory. Instead, samples are folded
//! into a [t-digest](https://github.com/tdunning/t-digest): a bounded set of weighted centroids
//! that estimates any quantile with small rank error, most precise near the tails.
//!
//! Two aggregators are built on it:
//!
//! - [`Quantile`] reports one configured quantile, labelled `q=<q>` (e.g. `q=0.9`).
//! - [`Diverse`] reports a digest of the window: `p50`, `p90`, `p99`, `avg`, `max`, `min` and `count`.
//!
//! Non-finite samples can't be ranked and never enter the digest. [`Diverse`] still counts them
//! towards `count`, `avg`, `min` and `max`.

use std::{fmt, sync::Mutex};

use tdigest::TDigest;

use crate::sync::lock;
use crate::traits::{Aggregator, Label, Values};

/// Number of centroids each digest keeps
const DIGEST_SIZE: usize = 100;

/// Samples buffered before they are merged into the centroids
const MERGE_BATCH: usize = 256;

/// Error returned by [`Quantile::new`] for a target outside `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidQuantile(pub f64);

impl fmt::Display for InvalidQuantile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "quantile must be a number within [0, 1], got {}", self.0)
    }
}

impl std::error::Error for InvalidQuantile {}

/// A t-digest with a small buffer of unmerged samples in front of it
///
/// `TDigest` merges are copy-on-write, so merging one sample at a time would rebuild the
/// centroids on every add.
#[derive(Debug)]
struct Digest {
    merged: TDigest,
    pending: Vec<f64>,
}

impl Digest {
    fn new() -> Self {
        Self {
            merged: TDigest::new_with_size(DIGEST_SIZE),
            pending: Vec::new(),
        }
    }

    fn add(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }
        self.pending.push(value);
        if self.pending.len() >= MERGE_BATCH {
            self.merge_pending();
        }
    }

    fn merge_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        self.merged = self.merged.merge_unsorted(pending);
    }

    /// Estimated value at quantile `q`; `0` for a digest without samples
    fn quantile(&mut self, q: f64) -> f64 {
        self.merge_pending();
        if self.merged.is_empty() {
            0.0
        } else {
            self.merged.estimate_quantile(q)
        }
    }
}

/// Reports a single quantile of the samples in a window
///
/// ```
/// use rollup::digest::Quantile;
/// use rollup::traits::Aggregator;
///
/// let p90 = Quantile::new(0.9).unwrap();
/// for v in 0..100 {
///     p90.add(v as f64);
/// }
/// let values = p90.values();
/// assert_eq!(values[0].0, "q=0.9");
/// assert!((values[0].1 - 89.5).abs() < 2.0);
/// ```
#[derive(Debug)]
pub struct Quantile {
    digest: Mutex<Digest>,
    q: f64,
    label: Label,
}

impl Quantile {
    /// Create an aggregator reporting quantile `q`
    ///
    /// Fails unless `q` is a finite number within `[0, 1]`.
    pub fn new(q: f64) -> Result<Self, InvalidQuantile> {
        if !(0.0..=1.0).contains(&q) {
            return Err(InvalidQuantile(q));
        }
        Ok(Self::with_valid(q))
    }

    /// Aggregator reporting the 90th percentile, labelled `q=0.9`
    pub fn p90() -> Self {
        Self::with_valid(0.9)
    }

    /// Aggregator reporting the 99th percentile, labelled `q=0.99`
    pub fn p99() -> Self {
        Self::with_valid(0.99)
    }

    /// The quantile this aggregator reports
    pub fn target(&self) -> f64 {
        self.q
    }

    fn with_valid(q: f64) -> Self {
        Self {
            digest: Mutex::new(Digest::new()),
            q,
            label: format!("q={q}").into(),
        }
    }
}

impl Aggregator for Quantile {
    fn add(&self, value: f64) {
        lock(&self.digest).add(value);
    }

    fn values(&self) -> Values {
        let estimate = lock(&self.digest).quantile(self.q);
        Values::from_iter([(self.label.clone(), estimate)])
    }
}

#[derive(Debug)]
struct DiverseState {
    digest: Digest,
    sum: f64,
    count: u64,
    min: f64,
    max: f64,
}

/// Reports a digest of the samples in a window
///
/// Emits, in order: `p50`, `p90`, `p99`, `avg`, `max`, `min`, `count`.
///
/// Non-finite samples count towards `avg`, `max`, `min` and `count` but are left out of the
/// quantiles, so a window holding only NaN reports `0` for `p50`, `p90` and `p99` next to a NaN
/// `avg`.
#[derive(Debug)]
pub struct Diverse {
    state: Mutex<DiverseState>,
}

impl Diverse {
    /// Create an empty digest aggregator
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DiverseState {
                digest: Digest::new(),
                sum: 0.0,
                count: 0,
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            }),
        }
    }
}

impl Default for Diverse {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator for Diverse {
    fn add(&self, value: f64) {
        let mut state = lock(&self.state);
        state.digest.add(value);
        state.sum += value;
        state.count += 1;
        if value > state.max {
            state.max = value;
        }
        if value < state.min {
            state.min = value;
        }
    }

    fn values(&self) -> Values {
        let mut state = lock(&self.state);
        let avg = state.sum / state.count.max(1) as f64;
        Values::from_iter([
            ("p50".into(), state.digest.quantile(0.5)),
            ("p90".into(), state.digest.quantile(0.9)),
            ("p99".into(), state.digest.quantile(0.99)),
            ("avg".into(), avg),
            ("max".into(), state.max),
            ("min".into(), state.min),
            ("count".into(), state.count as f64),
        ])
    }
}
