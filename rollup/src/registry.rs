//! Name → constructor mapping for aggregators
//!
//! Every raw point names the aggregation it wants (`SUM`, `P99`, ...). The first point of a new
//! series resolves that name once, here, and the series keeps the constructor to build one
//! aggregator per window.
//!
//! The process-wide instance, [`Registry::global`], starts with the built-in aggregators. Extend it
//! with [`register_aggregator`] during initialization, before any point names the new type. A
//! series created while its type is still unknown never aggregates anything, see
//! [`Group::put`](crate::Group::put).

use std::sync::{Arc, OnceLock, RwLock};

use hashbrown::HashMap;

use crate::digest::{Diverse, Quantile};
use crate::sync::{read, write};
use crate::traits::Aggregator;
use crate::value::{Avg, Sum};

/// Builds a fresh aggregator for one window
pub type Constructor = Arc<dyn Fn() -> Box<dyn Aggregator> + Send + Sync>;

/// Registry of aggregator constructors by name
pub struct Registry {
    constructors: RwLock<HashMap<String, Constructor>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("names", &self.names())
            .finish()
    }
}

impl Registry {
    /// A registry with nothing registered
    pub fn empty() -> Self {
        Self {
            constructors: RwLock::new(HashMap::new()),
        }
    }

    /// A registry with the built-in aggregators:
    ///
    /// | name      | aggregator             |
    /// |-----------|------------------------|
    /// | `SUM`     | [`Sum`]                |
    /// | `AVG`     | [`Avg`]                |
    /// | `P90`     | [`Quantile::p90`]      |
    /// | `P99`     | [`Quantile::p99`]      |
    /// | `DIVERSE` | [`Diverse`]            |
    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        registry.register("SUM", || Box::new(Sum::default()));
        registry.register("AVG", || Box::new(Avg::default()));
        registry.register("P90", || Box::new(Quantile::p90()));
        registry.register("P99", || Box::new(Quantile::p99()));
        registry.register("DIVERSE", || Box::new(Diverse::new()));
        registry
    }

    /// The process-wide registry, created with the built-ins on first use
    pub fn global() -> &'static Arc<Registry> {
        static GLOBAL: OnceLock<Arc<Registry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Registry::with_builtins()))
    }

    /// Register `constructor` under `name`, replacing any previous registration
    ///
    /// Series that already resolved `name` keep the constructor they resolved.
    ///
    /// ```
    /// use rollup::Registry;
    /// use rollup::digest::Quantile;
    ///
    /// let registry = Registry::with_builtins();
    /// registry.register("P50", || Box::new(Quantile::new(0.5).unwrap()));
    /// assert!(registry.contains("P50"));
    /// ```
    pub fn register<F>(&self, name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<dyn Aggregator> + Send + Sync + 'static,
    {
        write(&self.constructors).insert(name.into(), Arc::new(constructor));
    }

    /// The constructor registered under `name`, if any
    pub fn constructor(&self, name: &str) -> Option<Constructor> {
        read(&self.constructors).get(name).cloned()
    }

    /// A fresh aggregator of type `name`, if it is registered
    pub fn new_aggregator(&self, name: &str) -> Option<Box<dyn Aggregator>> {
        self.constructor(name).map(|constructor| constructor())
    }

    /// Whether `name` is a registered aggregator type
    pub fn contains(&self, name: &str) -> bool {
        read(&self.constructors).contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = read(&self.constructors).keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Register an aggregator type with the process-wide [`Registry::global`]
///
/// Call this during initialization, before any point names `name`.
pub fn register_aggregator<F>(name: impl Into<String>, constructor: F)
where
    F: Fn() -> Box<dyn Aggregator> + Send + Sync + 'static,
{
    Registry::global().register(name, constructor);
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::{Registry, register_aggregator};
    use crate::value::Sum;

    #[test]
    fn builtins_are_registered() {
        let registry = Registry::with_builtins();
        check!(registry.names() == ["AVG", "DIVERSE", "P90", "P99", "SUM"]);
    }

    #[test]
    fn builtin_constructors_report_their_labels() {
        let registry = Registry::with_builtins();
        for (name, first_label) in [
            ("SUM", "sum"),
            ("AVG", "avg"),
            ("P90", "q=0.9"),
            ("P99", "q=0.99"),
            ("DIVERSE", "p50"),
        ] {
            let_assert!(Some(aggregator) = registry.new_aggregator(name));
            check!(aggregator.values()[0].0 == first_label);
        }
    }

    #[test]
    fn unknown_names_have_no_aggregator() {
        let registry = Registry::with_builtins();
        check!(!registry.contains("MEDIAN"));
        check!(registry.constructor("MEDIAN").is_none());
        check!(registry.new_aggregator("sum").is_none());
    }

    #[test]
    fn register_replaces_previous_constructor() {
        let registry = Registry::empty();
        registry.register("TOTAL", || Box::new(Sum::default()));
        registry.register("TOTAL", || Box::new(crate::value::Avg::default()));
        let_assert!(Some(aggregator) = registry.new_aggregator("TOTAL"));
        check!(aggregator.values()[0].0 == "avg");
    }

    #[test]
    fn register_aggregator_extends_the_global_registry() {
        register_aggregator("REGISTRY_TEST_TOTAL", || Box::new(Sum::default()));
        check!(Registry::global().contains("REGISTRY_TEST_TOTAL"));
        check!(Registry::global().contains("DIVERSE"));
    }
}
