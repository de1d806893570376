//! Named configurations and the instances built from them.
//!
//! A configuration is stored as given and only turned into an adapter,
//! strategies and filters on first use. Each instance is built at most once
//! per configuration name and reused until the name is reset or reconfigured.

use crate::domain::model::{ConfigSpec, Phase};
use crate::domain::ports::{Adapter, Filter, Strategy};
use crate::utils::error::{FileSystemError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info};

pub type AdapterFactory =
    Arc<dyn Fn(&str, &Map<String, Value>) -> Result<Arc<dyn Adapter>> + Send + Sync>;
pub type StrategyFactory =
    Arc<dyn Fn(&str, &Map<String, Value>) -> Result<Arc<dyn Strategy>> + Send + Sync>;
pub type FilterFactory = Arc<dyn Fn(&str) -> Result<Arc<dyn Filter>> + Send + Sync>;

/// Deserializes a component's options, reporting failures against the
/// configuration they came from.
pub fn parse_options<T: DeserializeOwned>(
    config: &str,
    component: &str,
    options: &Map<String, Value>,
) -> Result<T> {
    serde_json::from_value(Value::Object(options.clone())).map_err(|e| {
        FileSystemError::InvalidOptions {
            config: config.to_string(),
            component: component.to_string(),
            message: e.to_string(),
        }
    })
}

struct Entry {
    spec: ConfigSpec,
    adapter: Mutex<Option<Arc<dyn Adapter>>>,
    strategies: Mutex<HashMap<String, Arc<dyn Strategy>>>,
    filters: Mutex<Option<Vec<Arc<dyn Filter>>>>,
}

impl Entry {
    fn new(spec: ConfigSpec) -> Self {
        Self {
            spec,
            adapter: Mutex::new(None),
            strategies: Mutex::new(HashMap::new()),
            filters: Mutex::new(None),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Process-wide table of named configurations plus the factories that turn
/// adapter, strategy and filter identifiers into instances.
///
/// Shared state is guarded internally, so one `Registry` can serve many
/// threads. Construct it once at startup and pass it (usually inside a
/// [`FileSystem`](crate::core::filesystem::FileSystem)) to the code that needs it.
pub struct Registry {
    entries: RwLock<BTreeMap<String, Arc<Entry>>>,
    adapter_factories: RwLock<HashMap<String, AdapterFactory>>,
    strategy_factories: RwLock<HashMap<String, StrategyFactory>>,
    filter_factories: RwLock<HashMap<String, FilterFactory>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// A registry that knows the built-in adapters, strategies and filters.
    pub fn new() -> Self {
        let registry = Self::empty();
        crate::adapters::register_builtins(&registry);
        registry
    }

    /// A registry with no factories at all.
    pub fn empty() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            adapter_factories: RwLock::new(HashMap::new()),
            strategy_factories: RwLock::new(HashMap::new()),
            filter_factories: RwLock::new(HashMap::new()),
        }
    }

    pub fn register_adapter<F>(&self, name: &str, factory: F)
    where
        F: Fn(&str, &Map<String, Value>) -> Result<Arc<dyn Adapter>> + Send + Sync + 'static,
    {
        write(&self.adapter_factories).insert(name.to_string(), Arc::new(factory));
    }

    pub fn register_strategy<F>(&self, name: &str, factory: F)
    where
        F: Fn(&str, &Map<String, Value>) -> Result<Arc<dyn Strategy>> + Send + Sync + 'static,
    {
        write(&self.strategy_factories).insert(name.to_string(), Arc::new(factory));
    }

    pub fn register_filter<F>(&self, name: &str, factory: F)
    where
        F: Fn(&str) -> Result<Arc<dyn Filter>> + Send + Sync + 'static,
    {
        write(&self.filter_factories).insert(name.to_string(), Arc::new(factory));
    }

    pub fn has_adapter(&self, name: &str) -> bool {
        read(&self.adapter_factories).contains_key(name)
    }

    pub fn has_strategy(&self, name: &str) -> bool {
        read(&self.strategy_factories).contains_key(name)
    }

    pub fn has_filter(&self, name: &str) -> bool {
        read(&self.filter_factories).contains_key(name)
    }

    /// Merges `spec` into the configuration stored under `name`.
    ///
    /// Identifiers are not checked here; an unknown adapter only surfaces on
    /// first use. Instances cached for `name` are dropped.
    pub fn configure(&self, name: &str, spec: ConfigSpec) {
        let mut entries = write(&self.entries);
        let spec = match entries.get(name) {
            Some(existing) => existing.spec.clone().merge(spec),
            None => spec,
        };
        info!(config = name, adapter = %spec.adapter, "Configured filesystem");
        entries.insert(name.to_string(), Arc::new(Entry::new(spec)));
    }

    pub fn configure_all(&self, configs: impl IntoIterator<Item = (String, ConfigSpec)>) {
        for (name, spec) in configs {
            self.configure(&name, spec);
        }
    }

    /// All stored configurations, or `None` when nothing is registered.
    pub fn configurations(&self) -> Option<BTreeMap<String, ConfigSpec>> {
        let entries = read(&self.entries);
        if entries.is_empty() {
            return None;
        }
        Some(
            entries
                .iter()
                .map(|(name, entry)| (name.clone(), entry.spec.clone()))
                .collect(),
        )
    }

    /// Drops one configuration with its cached instances, or every
    /// configuration when `name` is `None`.
    pub fn reset(&self, name: Option<&str>) {
        let mut entries = write(&self.entries);
        match name {
            Some(name) => {
                if entries.remove(name).is_some() {
                    debug!(config = name, "Reset filesystem configuration");
                }
            }
            None => {
                debug!(count = entries.len(), "Reset all filesystem configurations");
                entries.clear();
            }
        }
    }

    pub fn is_configured(&self, name: &str) -> bool {
        read(&self.entries).contains_key(name)
    }

    fn entry(&self, name: &str) -> Result<Arc<Entry>> {
        read(&self.entries)
            .get(name)
            .cloned()
            .ok_or_else(|| FileSystemError::UnknownConfiguration {
                name: name.to_string(),
            })
    }

    /// The stored configuration for `name`.
    pub fn spec(&self, name: &str) -> Result<ConfigSpec> {
        Ok(self.entry(name)?.spec.clone())
    }

    /// The adapter bound to `name`, built on first access.
    pub fn resolve_adapter(&self, name: &str) -> Result<Arc<dyn Adapter>> {
        let entry = self.entry(name)?;
        let mut slot = lock(&entry.adapter);
        if let Some(adapter) = slot.as_ref() {
            return Ok(Arc::clone(adapter));
        }

        let factory = read(&self.adapter_factories)
            .get(&entry.spec.adapter)
            .cloned()
            .ok_or_else(|| FileSystemError::UnknownAdapter {
                config: name.to_string(),
                adapter: entry.spec.adapter.clone(),
            })?;

        debug!(config = name, adapter = %entry.spec.adapter, "Constructing adapter");
        let adapter = factory(name, &entry.spec.options)?;
        *slot = Some(Arc::clone(&adapter));
        Ok(adapter)
    }

    /// The strategies of `name` taking part in `phase`, in configuration order.
    ///
    /// Instances are cached per strategy name within a configuration, so a
    /// name listed twice reuses the instance built from its first options.
    /// `AppConfig::validate` rejects such duplicates in configuration files.
    pub fn resolve_strategies(&self, name: &str, phase: Phase) -> Result<Vec<Arc<dyn Strategy>>> {
        let entry = self.entry(name)?;
        let Some(specs) = entry.spec.strategies.as_ref() else {
            return Ok(Vec::new());
        };

        let mut cache = lock(&entry.strategies);
        let mut resolved = Vec::with_capacity(specs.len());
        for spec in specs {
            let strategy = match cache.get(&spec.name) {
                Some(strategy) => Arc::clone(strategy),
                None => {
                    let factory = read(&self.strategy_factories)
                        .get(&spec.name)
                        .cloned()
                        .ok_or_else(|| FileSystemError::UnknownStrategy {
                            config: name.to_string(),
                            strategy: spec.name.clone(),
                        })?;
                    debug!(config = name, strategy = %spec.name, "Constructing strategy");
                    let strategy = factory(name, &spec.options)?;
                    cache.insert(spec.name.clone(), Arc::clone(&strategy));
                    strategy
                }
            };
            if strategy.applies_to(phase) {
                resolved.push(strategy);
            }
        }
        Ok(resolved)
    }

    /// The filters wrapped around every call made through `name`.
    pub fn resolve_filters(&self, name: &str) -> Result<Vec<Arc<dyn Filter>>> {
        let entry = self.entry(name)?;
        let mut slot = lock(&entry.filters);
        if let Some(filters) = slot.as_ref() {
            return Ok(filters.clone());
        }

        let mut filters = Vec::new();
        for filter_name in entry.spec.filters.iter().flatten() {
            let factory = read(&self.filter_factories)
                .get(filter_name)
                .cloned()
                .ok_or_else(|| FileSystemError::UnknownFilter {
                    config: name.to_string(),
                    filter: filter_name.clone(),
                })?;
            filters.push(factory(name)?);
        }
        *slot = Some(filters.clone());
        Ok(filters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::memory::Memory;
    use crate::domain::model::StrategySpec;
    use crate::domain::ports::{Rejection, StrategyContext};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Suffix(&'static str);

    impl Strategy for Suffix {
        fn name(&self) -> &str {
            self.0
        }

        fn applies_to(&self, phase: Phase) -> bool {
            phase.is_filename()
        }

        fn apply_to_filename(
            &self,
            _phase: Phase,
            filename: String,
            _context: &StrategyContext<'_>,
        ) -> std::result::Result<String, Rejection> {
            Ok(format!("{}{}", filename, self.0))
        }
    }

    fn counting_registry(counter: Arc<AtomicUsize>) -> Registry {
        let registry = Registry::empty();
        registry.register_adapter("Counted", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Memory::default()) as Arc<dyn Adapter>)
        });
        registry
    }

    #[test]
    fn test_configurations_none_until_configured() {
        let registry = Registry::new();
        assert!(registry.configurations().is_none());

        let spec = ConfigSpec::new("\\some\\adapter").filter("Filter1").filter("Filter2");
        registry.configure("default", spec.clone());

        let configs = registry.configurations().unwrap();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs["default"], spec);
    }

    #[test]
    fn test_reset_one_and_all() {
        let registry = Registry::new();
        registry.configure("a", ConfigSpec::new("Memory"));
        registry.configure("b", ConfigSpec::new("Memory"));

        registry.reset(Some("a"));
        let configs = registry.configurations().unwrap();
        assert!(!configs.contains_key("a"));
        assert!(configs.contains_key("b"));

        registry.reset(None);
        assert!(registry.configurations().is_none());
    }

    #[test]
    fn test_unknown_configuration() {
        let registry = Registry::new();
        let err = registry.resolve_adapter("missing").err().unwrap();
        assert!(matches!(err, FileSystemError::UnknownConfiguration { name } if name == "missing"));
        assert!(registry.resolve_strategies("missing", Phase::Write).is_err());
        assert!(registry.resolve_filters("missing").is_err());
    }

    #[test]
    fn test_unknown_adapter_surfaces_on_first_use() {
        let registry = Registry::new();
        registry.configure("default", ConfigSpec::new("\\some\\adapter"));
        let err = registry.resolve_adapter("default").err().unwrap();
        assert!(matches!(err, FileSystemError::UnknownAdapter { adapter, .. } if adapter == "\\some\\adapter"));
    }

    #[test]
    fn test_adapter_is_cached_until_reset() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(counter.clone());
        registry.configure("default", ConfigSpec::new("Counted"));

        let first = registry.resolve_adapter("default").unwrap();
        let second = registry.resolve_adapter("default").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        registry.reset(Some("default"));
        registry.configure("default", ConfigSpec::new("Counted"));
        registry.resolve_adapter("default").unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_first_use_constructs_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = Arc::new(counting_registry(counter.clone()));
        registry.configure("shared", ConfigSpec::new("Counted"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.resolve_adapter("shared").is_ok())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_strategies_resolved_in_order_for_phase() {
        let registry = Registry::new();
        registry.register_strategy("A", |_, _| Ok(Arc::new(Suffix("A")) as Arc<dyn Strategy>));
        registry.register_strategy("B", |_, _| Ok(Arc::new(Suffix("B")) as Arc<dyn Strategy>));
        registry.configure(
            "default",
            ConfigSpec::new("Memory")
                .strategy(StrategySpec::new("B"))
                .strategy(StrategySpec::new("A")),
        );

        let names: Vec<String> = registry
            .resolve_strategies("default", Phase::FilenameRead)
            .unwrap()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["B", "A"]);

        assert!(registry
            .resolve_strategies("default", Phase::Write)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_unknown_strategy_and_filter() {
        let registry = Registry::new();
        registry.configure(
            "default",
            ConfigSpec::new("Memory")
                .strategy(StrategySpec::new("Nope"))
                .filter("Missing"),
        );
        assert!(matches!(
            registry.resolve_strategies("default", Phase::Write),
            Err(FileSystemError::UnknownStrategy { .. })
        ));
        assert!(matches!(
            registry.resolve_filters("default"),
            Err(FileSystemError::UnknownFilter { .. })
        ));
    }

    #[test]
    fn test_reconfigure_merges_and_drops_cached_adapter() {
        let counter = Arc::new(AtomicUsize::new(0));
        let registry = counting_registry(counter.clone());
        registry.configure("default", ConfigSpec::new("Counted").option("path", "/a"));
        registry.resolve_adapter("default").unwrap();

        registry.configure("default", ConfigSpec::new("Counted").option("extra", true));
        let spec = registry.spec("default").unwrap();
        assert_eq!(spec.options["path"], "/a");
        assert_eq!(spec.options["extra"], true);

        registry.resolve_adapter("default").unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
