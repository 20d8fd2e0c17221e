//! Points going in and out of a [`Group`](crate::Group)

use std::{collections::HashMap, sync::Arc};

use crate::key::metric_key;

/// Tag set of a point
pub type Tags = HashMap<String, String>;

/// Tag added to output points of aggregators reporting several values
pub const AGGR_TAG: &str = "aggr";

/// A sample as it arrives from ingestion
///
/// ```
/// use rollup::RawPoint;
///
/// let point = RawPoint::new("host-1", "cpu.idle")
///     .with_tag("core", "0")
///     .with_value(97.5)
///     .with_timestamp(1_700_000_000)
///     .with_step(10)
///     .with_aggregation("AVG");
/// assert_eq!(point.key(), "endpoint=host-1;metric=cpu.idle;core=0");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RawPoint {
    /// Host or service that produced the sample
    pub endpoint: String,
    /// Metric name; points with an empty name are ignored
    pub metric: String,
    /// Tags, in no particular order
    pub tags: Tags,
    /// Sample value
    pub value: f64,
    /// Unix timestamp in seconds
    pub timestamp: i64,
    /// Window width in seconds; `<= 0` uses the group's default step
    pub step: i64,
    /// Name of the aggregator type in the [`Registry`](crate::Registry), e.g. `SUM`
    pub aggregation: String,
}

impl RawPoint {
    /// A point for `metric` on `endpoint`, with every other field empty
    pub fn new(endpoint: impl Into<String>, metric: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            metric: metric.into(),
            ..Default::default()
        }
    }

    /// Add (or replace) a tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Set the sample value
    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    /// Set the Unix timestamp, in seconds
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the window width, in seconds
    pub fn with_step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    /// Set the aggregator type name
    pub fn with_aggregation(mut self, aggregation: impl Into<String>) -> Self {
        self.aggregation = aggregation.into();
        self
    }

    /// Identity of the series this point belongs to, see [`metric_key`]
    pub fn key(&self) -> String {
        metric_key(&self.endpoint, &self.metric, &self.tags)
    }
}

/// Identity fields stamped on every output point of a series
///
/// Shared behind an [`Arc`]: every point a series emits for the same label points at the same
/// template.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PointTemplate {
    /// Host or service
    pub endpoint: String,
    /// Metric name
    pub metric: String,
    /// Tags, including `aggr=<label>` for multi-value aggregators
    pub tags: Tags,
    /// Window width in seconds
    pub step: i64,
}

impl PointTemplate {
    pub(crate) fn from_point(point: &RawPoint, step: i64) -> Self {
        Self {
            endpoint: point.endpoint.clone(),
            metric: point.metric.clone(),
            tags: point.tags.clone(),
            step,
        }
    }

    /// Copy of this template with one more tag
    pub(crate) fn with_tag(&self, key: &str, value: &str) -> Self {
        let mut tags = self.tags.clone();
        tags.insert(key.to_owned(), value.to_owned());
        Self {
            endpoint: self.endpoint.clone(),
            metric: self.metric.clone(),
            tags,
            step: self.step,
        }
    }
}

/// One value of one completed window
///
/// Output points are gauges: `value` is the aggregate of the window starting at `timestamp`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ReducedPoint {
    /// Identity of the point
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub template: Arc<PointTemplate>,
    /// Aggregated value
    pub value: f64,
    /// Start of the window, Unix seconds
    pub timestamp: i64,
}

impl ReducedPoint {
    /// Host or service
    pub fn endpoint(&self) -> &str {
        &self.template.endpoint
    }

    /// Metric name
    pub fn metric(&self) -> &str {
        &self.template.metric
    }

    /// Tags of the point
    pub fn tags(&self) -> &Tags {
        &self.template.tags
    }

    /// Value of tag `key`, if present
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.template.tags.get(key).map(String::as_str)
    }

    /// Window width in seconds
    pub fn step(&self) -> i64 {
        self.template.step
    }
}
