//! Lock-free aggregators for plain running totals

use std::sync::atomic::{AtomicU64, Ordering};

use crate::traits::{Aggregator, Values};

/// An `f64` stored as its bit pattern so it can be updated with compare-and-swap
///
/// The all-zero bit pattern is `0.0`, so `Default` starts at zero.
#[derive(Default, Debug)]
struct AtomicF64(AtomicU64);

impl AtomicF64 {
    fn add(&self, value: f64) {
        // the closure never returns `None`, so this can't fail
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
                Some((f64::from_bits(bits) + value).to_bits())
            });
    }

    fn load(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// Running total of a window, reported as `{"sum": total}`
///
/// Registered as `SUM`. Fits counters that are reported as deltas.
#[derive(Default, Debug)]
pub struct Sum {
    total: AtomicF64,
}

impl Aggregator for Sum {
    fn add(&self, value: f64) {
        self.total.add(value);
    }

    fn values(&self) -> Values {
        Values::from_iter([("sum".into(), self.total.load())])
    }
}

/// Averages values when aggregating
///
/// Reports `{"avg": total / count}`. An aggregator that never saw a sample reports `0`.
#[derive(Default, Debug)]
pub struct Avg {
    total: AtomicF64,
    count: AtomicU64,
}

impl Aggregator for Avg {
    fn add(&self, value: f64) {
        self.total.add(value);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    fn values(&self) -> Values {
        let count = self.count.load(Ordering::Relaxed).max(1);
        Values::from_iter([("avg".into(), self.total.load() / count as f64)])
    }
}
