//! Traits for aggregation
//!
//! Every window of every series owns one [`Aggregator`]. Points landing in the window are fed to
//! [`Aggregator::add`]; once the window is complete, [`Aggregator::values`] is read exactly once and
//! each `(label, value)` pair it returns becomes one [`ReducedPoint`](crate::ReducedPoint).
//!
//! ## Labels
//!
//! An aggregator that reports a single value (like [`Sum`](crate::value::Sum)) produces one output
//! point stamped with the series' own tags. An aggregator that reports several values (like
//! [`Diverse`](crate::digest::Diverse)) produces one output point per label, each tagged with
//! `aggr=<label>` in addition to the series' tags.
//!
//! ## Concurrency
//!
//! Several ingestion threads may target the same open window at once, so both methods take `&self`
//! and implementations carry their own synchronization (atomics or a lock). Accumulation must be
//! commutative and associative: no order is guaranteed between concurrently ingested points.

use std::borrow::Cow;

use smallvec::SmallVec;

/// Name of one value reported by an [`Aggregator`]
pub type Label = Cow<'static, str>;

/// Values reported by an [`Aggregator`], in the order they should be emitted
///
/// Inline capacity covers every built-in aggregator without allocating.
pub type Values = SmallVec<[(Label, f64); 8]>;

/// Per-window accumulator
///
/// # Example
///
/// ```rust
/// use rollup::traits::{Aggregator, Values};
/// use std::sync::Mutex;
///
/// /// Reports the last value added
/// #[derive(Default)]
/// struct Last(Mutex<Option<f64>>);
///
/// impl Aggregator for Last {
///     fn add(&self, value: f64) {
///         *self.0.lock().unwrap() = Some(value);
///     }
///
///     fn values(&self) -> Values {
///         let last = self.0.lock().unwrap().unwrap_or_default();
///         Values::from_iter([("last".into(), last)])
///     }
/// }
///
/// let last = Last::default();
/// last.add(1.0);
/// last.add(2.0);
/// assert_eq!(last.values()[0].1, 2.0);
/// ```
///
/// Note that `Last` is not order independent; under concurrent ingestion it reports whichever
/// point happened to be added last.
pub trait Aggregator: Send + Sync {
    /// Fold a sample into the accumulated state
    fn add(&self, value: f64);

    /// Snapshot of the accumulated state
    ///
    /// Safe to call concurrently with [`Aggregator::add`], but only a best-effort view: fields
    /// read one after another may reflect different numbers of samples.
    fn values(&self) -> Values;
}

impl<A: Aggregator + ?Sized> Aggregator for Box<A> {
    fn add(&self, value: f64) {
        (**self).add(value)
    }

    fn values(&self) -> Values {
        (**self).values()
    }
}
