//! Registry of live series

use std::sync::{
    Arc, RwLock,
    atomic::{AtomicI64, Ordering},
};

use hashbrown::HashMap;
use rollup_timesource::TimeSource;

use crate::config::{ConfigError, GroupConfig};
use crate::point::{RawPoint, ReducedPoint};
use crate::registry::Registry;
use crate::series::{Ingest, Series};
use crate::sync::{read, write};

/// All series of one aggregation pipeline
///
/// Ingestion threads call [`Group::put`]; a driver periodically calls [`Group::collect`] (every
/// [`Group::min_step`] seconds is a reasonable cadence, see [`CollectWorker`](crate::CollectWorker))
/// and ships the returned points.
///
/// ```
/// use rollup::{Group, GroupConfig, RawPoint, config::FirstWindow};
/// use rollup_timesource::{TimeSource, fakes::ManuallyAdvancedTimeSource};
/// use std::time::Duration;
///
/// let clock = ManuallyAdvancedTimeSource::at_unix_seconds(1_000_007);
/// let group = Group::builder()
///     .time_source(TimeSource::custom(clock.clone()))
///     .config(GroupConfig { first_window: FirstWindow::Current, ..Default::default() })
///     .build()
///     .unwrap();
///
/// let point = RawPoint::new("e1", "m1")
///     .with_value(54.0)
///     .with_timestamp(1_000_002)
///     .with_step(10)
///     .with_aggregation("SUM");
/// group.put(&point);
/// assert!(group.collect().is_empty());
///
/// clock.advance(Duration::from_secs(10));
/// let points = group.collect();
/// assert_eq!(points.len(), 1);
/// assert_eq!(points[0].value, 54.0);
/// assert_eq!(points[0].timestamp, 1_000_000);
/// ```
pub struct Group {
    series: RwLock<HashMap<String, Arc<Series>>>,
    min_step: AtomicI64,
    registry: Arc<Registry>,
    time_source: TimeSource,
    config: GroupConfig,
}

impl std::fmt::Debug for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Group")
            .field("series", &self.len())
            .field("min_step", &self.min_step())
            .field("time_source", &self.time_source)
            .field("config", &self.config)
            .finish()
    }
}

impl Group {
    /// A group using the [global registry](Registry::global), the system clock and the default
    /// configuration
    pub fn new() -> Self {
        Self::from_parts(
            Registry::global().clone(),
            TimeSource::System,
            GroupConfig::default(),
        )
    }

    /// Builder for a group with a custom registry, clock or configuration
    pub fn builder() -> GroupBuilder {
        GroupBuilder::default()
    }

    fn from_parts(registry: Arc<Registry>, time_source: TimeSource, config: GroupConfig) -> Self {
        Self {
            series: RwLock::new(HashMap::new()),
            min_step: AtomicI64::new(config.default_step),
            registry,
            time_source,
            config,
        }
    }

    /// Ingest one point
    ///
    /// Never fails and never blocks on I/O. Points are dropped without notice when:
    ///
    /// - the metric name is empty;
    /// - the point is late: its window was already flushed, or precedes the first window of a
    ///   series created for it;
    /// - the point's series was created with an aggregation type missing from the registry. This
    ///   is logged once, when the series is created; every point for the identity is then dropped
    ///   until the series is evicted as obsolete. Check [`Registry::contains`] up front to reject
    ///   such points at the source instead.
    pub fn put(&self, point: &RawPoint) {
        if point.metric.is_empty() {
            return;
        }
        let key = point.key();
        let series = self.series_for(&key, point);
        self.put_resolved(&key, &series, point);
    }

    /// Put `point` into `series`, the series its identity `key` resolved to
    fn put_resolved(&self, key: &str, series: &Series, point: &RawPoint) {
        let mut outcome = series.put(point.timestamp, point.value);
        if outcome == Ingest::Retired {
            // evicted between lookup and put; the replacement is fresh and can't be retired yet
            outcome = self.series_for(key, point).put(point.timestamp, point.value);
        }
        if outcome == Ingest::Late {
            tracing::trace!(series = %key, timestamp = point.timestamp, "dropping late point");
        }
    }

    fn series_for(&self, key: &str, point: &RawPoint) -> Arc<Series> {
        if let Some(series) = read(&self.series).get(key) {
            return series.clone();
        }

        let mut all = write(&self.series);
        if let Some(series) = all.get(key) {
            return series.clone();
        }
        let constructor = self.registry.constructor(&point.aggregation);
        if constructor.is_none() {
            tracing::warn!(
                series = %key,
                aggregation = %point.aggregation,
                known = ?self.registry.names(),
                "unregistered aggregation type, points for this series will be dropped"
            );
        }
        let now = self.time_source.unix_seconds();
        let series = Arc::new(Series::new(point, constructor, &self.config, now));
        self.min_step.fetch_min(series.step(), Ordering::Relaxed);
        tracing::debug!(
            series = %key,
            step = series.step(),
            first_window = series.min_ts(),
            "created series"
        );
        all.insert(key.to_owned(), series.clone());
        series
    }

    /// Flush every complete window of every series and evict obsolete series
    ///
    /// Holds the group exclusively for the whole pass: puts for new identities wait, puts for
    /// existing series that already resolved them do not.
    pub fn collect(&self) -> Vec<ReducedPoint> {
        let now = self.time_source.unix_seconds();
        let mut all = write(&self.series);
        let mut points = Vec::new();
        let before = all.len();
        all.retain(|key, series| {
            points.extend(series.collect(now));
            let evict = series.retire_if_obsolete(now);
            if evict {
                tracing::debug!(series = %key, "evicted obsolete series");
            }
            !evict
        });
        tracing::debug!(
            points = points.len(),
            evicted = before - all.len(),
            live = all.len(),
            "collected"
        );
        points
    }

    /// Smallest step of any series created so far, or the default step if it is smaller
    pub fn min_step(&self) -> i64 {
        self.min_step.load(Ordering::Relaxed)
    }

    /// Number of live series
    pub fn len(&self) -> usize {
        read(&self.series).len()
    }

    /// Whether there are no live series
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configuration this group was built with
    pub fn config(&self) -> &GroupConfig {
        &self.config
    }

    /// Registry new series resolve their aggregation type from
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}

impl Default for Group {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`Group`]
#[derive(Debug, Default)]
pub struct GroupBuilder {
    registry: Option<Arc<Registry>>,
    time_source: TimeSource,
    config: GroupConfig,
}

impl GroupBuilder {
    /// Resolve aggregation types from `registry` instead of [`Registry::global`]
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Read the current time from `time_source`
    pub fn time_source(mut self, time_source: TimeSource) -> Self {
        self.time_source = time_source;
        self
    }

    /// Use `config` instead of [`GroupConfig::default`]
    pub fn config(mut self, config: GroupConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate the configuration and build the group
    pub fn build(self) -> Result<Group, ConfigError> {
        self.config.validate()?;
        let registry = self
            .registry
            .unwrap_or_else(|| Registry::global().clone());
        Ok(Group::from_parts(registry, self.time_source, self.config))
    }
}
