//! Utilities for testing code that produces or consumes collected points

use std::sync::{Arc, Mutex};

pub use rollup_timesource::fakes::{ManuallyAdvancedTimeSource, StaticTimeSource};
use rollup_timesource::TimeSource;

use crate::config::{ConfigError, GroupConfig};
use crate::group::Group;
use crate::point::ReducedPoint;
use crate::sink::PointSink;
use crate::sync::lock;

/// Returned by [`test_point_sink`]
pub struct TestPointSink {
    /// Reads what was appended to `sink`
    pub inspector: Inspector,
    /// Hand this to a [`CollectWorker`](crate::CollectWorker)
    pub sink: Arc<dyn PointSink>,
}

/// A sink that keeps every point in memory, plus an [`Inspector`] to read them back
///
/// ```
/// use rollup::test_util::test_point_sink;
/// use rollup::{Group, sink::PointSink};
///
/// let rollup::test_util::TestPointSink { inspector, sink } = test_point_sink();
/// sink.append_all(Group::new().collect());
/// assert!(inspector.points().is_empty());
/// ```
pub fn test_point_sink() -> TestPointSink {
    let inspector = Inspector::default();
    TestPointSink {
        sink: Arc::new(inspector.clone()),
        inspector,
    }
}

/// Shared handle to the points appended to a [`TestPointSink`]
#[derive(Default, Clone, Debug)]
pub struct Inspector {
    points: Arc<Mutex<Vec<ReducedPoint>>>,
}

impl Inspector {
    /// Every point appended so far
    ///
    /// Note: this does not drain the sink
    pub fn points(&self) -> Vec<ReducedPoint> {
        lock(&self.points).clone()
    }

    /// Drain the sink
    pub fn take(&self) -> Vec<ReducedPoint> {
        std::mem::take(&mut *lock(&self.points))
    }
}

impl PointSink for Inspector {
    fn append(&self, point: ReducedPoint) {
        lock(&self.points).push(point);
    }

    fn append_all(&self, points: Vec<ReducedPoint>) {
        lock(&self.points).extend(points);
    }
}

/// A group driven by a manual clock starting at `unix_seconds`, using the built-in aggregators
pub fn manual_group(
    unix_seconds: i64,
    config: GroupConfig,
) -> Result<(Group, ManuallyAdvancedTimeSource), ConfigError> {
    let clock = ManuallyAdvancedTimeSource::at_unix_seconds(unix_seconds);
    let group = Group::builder()
        .registry(Arc::new(crate::Registry::with_builtins()))
        .time_source(TimeSource::custom(clock.clone()))
        .config(config)
        .build()?;
    Ok((group, clock))
}
