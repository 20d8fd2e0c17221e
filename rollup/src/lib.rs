#![deny(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod config;
pub mod digest;
pub mod key;
pub mod point;
pub mod registry;
pub mod sink;
pub mod traits;
pub mod value;

mod group;
mod series;
mod sync;
mod worker;

#[cfg(feature = "test-util")]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
pub mod test_util;

pub use config::{ConfigError, FirstWindow, GroupConfig};
pub use digest::{Diverse, InvalidQuantile, Quantile};
pub use group::{Group, GroupBuilder};
pub use point::{PointTemplate, RawPoint, ReducedPoint};
pub use registry::{Constructor, Registry, register_aggregator};
pub use series::align_timestamp;
pub use sink::PointSink;
pub use traits::Aggregator;
pub use value::{Avg, Sum};
pub use worker::CollectWorker;
