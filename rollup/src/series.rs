//! One identity's time windows

use std::{
    collections::BTreeMap,
    sync::{
        Arc, RwLock,
        atomic::{AtomicI64, Ordering},
    },
};

use hashbrown::HashMap;

use crate::config::{FirstWindow, GroupConfig};
use crate::point::{AGGR_TAG, PointTemplate, RawPoint, ReducedPoint};
use crate::registry::Constructor;
use crate::sync::{read, write};
use crate::traits::{Aggregator, Label};

/// Start of the `step`-wide window containing `timestamp`
///
/// Rounds toward negative infinity, so windows stay `step` wide on both sides of the epoch.
/// Saturates at `i64::MIN` instead of overflowing.
///
/// ```
/// use rollup::align_timestamp;
///
/// assert_eq!(align_timestamp(1_234, 60), 1_200);
/// assert_eq!(align_timestamp(1_200, 60), 1_200);
/// assert_eq!(align_timestamp(-1, 60), -60);
/// ```
pub fn align_timestamp(timestamp: i64, step: i64) -> i64 {
    timestamp.saturating_sub(timestamp.rem_euclid(step))
}

/// What happened to a point handed to [`Series::put`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Ingest {
    /// Added to its window
    Accepted,
    /// Its window was already flushed, or precedes the series' first window
    Late,
    /// The series has no aggregator type
    Unaggregated,
    /// The series was evicted from its group; resolve the identity again
    Retired,
}

struct Windows {
    /// Open windows by aligned start
    open: BTreeMap<i64, Box<dyn Aggregator>>,
    /// Templates stamped with `aggr=<label>`, built on first use
    tagged: HashMap<Label, Arc<PointTemplate>>,
    retired: bool,
}

/// Aggregation state of one identity
///
/// `min_ts` is the start of the earliest window still accepting points. It only moves forward,
/// is read without the lock on the ingestion fast path, and is only written with the lock held
/// exclusively.
///
/// A declared step can be any positive `i64`, so arithmetic on window bounds saturates.
pub(crate) struct Series {
    template: Arc<PointTemplate>,
    constructor: Option<Constructor>,
    min_ts: AtomicI64,
    flush_lag: i64,
    quiet_period: i64,
    windows: RwLock<Windows>,
}

impl Series {
    /// Series for `point`'s identity, created at Unix time `now`
    pub(crate) fn new(
        point: &RawPoint,
        constructor: Option<Constructor>,
        config: &GroupConfig,
        now: i64,
    ) -> Self {
        let step = config.step_for(point.step);
        let flush_lag = step / config.flush_lag_divisor;
        let min_ts = match config.first_window {
            FirstWindow::NextFull => {
                let earliest = now.saturating_add(step).saturating_add(config.creation_slack);
                align_timestamp(earliest, step)
            }
            FirstWindow::Current => align_timestamp(now - flush_lag, step),
        };
        Self {
            template: Arc::new(PointTemplate::from_point(point, step)),
            constructor,
            min_ts: AtomicI64::new(min_ts),
            flush_lag,
            quiet_period: step.saturating_mul(config.obsolete_after_steps),
            windows: RwLock::new(Windows {
                open: BTreeMap::new(),
                tagged: HashMap::new(),
                retired: false,
            }),
        }
    }

    pub(crate) fn step(&self) -> i64 {
        self.template.step
    }

    pub(crate) fn min_ts(&self) -> i64 {
        self.min_ts.load(Ordering::Acquire)
    }

    /// Add `value` to the window containing `timestamp`
    pub(crate) fn put(&self, timestamp: i64, value: f64) -> Ingest {
        if timestamp < self.min_ts() {
            return Ingest::Late;
        }
        let Some(constructor) = &self.constructor else {
            return Ingest::Unaggregated;
        };
        let window = align_timestamp(timestamp, self.step());

        // adding under the shared lock keeps a concurrent collect from flushing the window
        // between lookup and add
        {
            let windows = read(&self.windows);
            if let Some(aggregator) = windows.open.get(&window) {
                aggregator.add(value);
                return Ingest::Accepted;
            }
        }

        let mut windows = write(&self.windows);
        if windows.retired {
            return Ingest::Retired;
        }
        // a collect may have advanced `min_ts` since the unlocked check
        if window < self.min_ts() {
            return Ingest::Late;
        }
        windows
            .open
            .entry(window)
            .or_insert_with(|| constructor())
            .add(value);
        Ingest::Accepted
    }

    /// Flush every window that is complete at Unix time `now`
    ///
    /// A window `[ts, ts + step)` is complete once `now - step / flush_lag_divisor` has passed its
    /// end. Complete windows are removed and `min_ts` moves past them, so no later point can
    /// reopen them.
    pub(crate) fn collect(&self, now: i64) -> Vec<ReducedPoint> {
        let step = self.step();
        let cur = align_timestamp(now - self.flush_lag, step);

        let mut windows = write(&self.windows);
        let windows = &mut *windows;
        let still_open = windows.open.split_off(&cur);
        let closed = std::mem::replace(&mut windows.open, still_open);

        let floor = self.min_ts();
        let mut min_ts = floor;
        let mut points = Vec::new();
        for (ts, aggregator) in closed {
            if ts < floor {
                // stale: never emitted
                continue;
            }
            let values = aggregator.values();
            if values.len() == 1 {
                points.push(ReducedPoint {
                    template: self.template.clone(),
                    value: values[0].1,
                    timestamp: ts,
                });
            } else {
                for (label, value) in values {
                    let template = windows
                        .tagged
                        .entry(label)
                        .or_insert_with_key(|label| {
                            Arc::new(self.template.with_tag(AGGR_TAG, label))
                        })
                        .clone();
                    points.push(ReducedPoint {
                        template,
                        value,
                        timestamp: ts,
                    });
                }
            }
            min_ts = min_ts.max(ts.saturating_add(step));
        }
        self.min_ts.store(min_ts, Ordering::Release);
        points
    }

    /// Mark the series retired if it is obsolete at `now`: it holds no window and has been quiet
    /// for long enough to be dropped
    ///
    /// Once retired, a point that still reaches this series is reported as [`Ingest::Retired`]
    /// instead of opening a window nobody will collect.
    pub(crate) fn retire_if_obsolete(&self, now: i64) -> bool {
        let mut windows = write(&self.windows);
        if windows.open.is_empty() && self.is_quiet(now) {
            windows.retired = true;
        }
        windows.retired
    }

    fn is_quiet(&self, now: i64) -> bool {
        self.min_ts().saturating_add(self.quiet_period) < now
    }

    #[cfg(test)]
    fn open_windows(&self) -> Vec<i64> {
        read(&self.windows).open.keys().copied().collect()
    }
}
