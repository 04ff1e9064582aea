//! Thread-safe catalog of diff engine factories
//!
//! The registry owns one [`EngineInfo`] per id plus the stored configuration
//! for that id. A single mutex guards both maps; it is released before any
//! factory or engine code runs, so engines may freely call back into the
//! registry.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::error::RegistryError;
use crate::diff::{
    DiffEngine, EngineCapabilities, EngineConfig, PreciseEngine, ScalableEngine,
    PRECISE_ENGINE_ID, SCALABLE_ENGINE_ID,
};

/// Produces a fresh engine instance, or `None` if it cannot
pub type EngineFactory = Arc<dyn Fn() -> Option<Box<dyn DiffEngine>> + Send + Sync>;

/// Catalog entry describing one registered engine
#[derive(Clone)]
pub struct EngineInfo {
    pub name: String,
    pub description: String,
    pub capabilities: EngineCapabilities,
    pub configuration_keys: Vec<String>,
    pub factory: Option<EngineFactory>,
}

impl EngineInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>, capabilities: EngineCapabilities) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            capabilities,
            configuration_keys: Vec::new(),
            factory: None,
        }
    }

    pub fn with_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Option<Box<dyn DiffEngine>> + Send + Sync + 'static,
    {
        self.factory = Some(Arc::new(factory));
        self
    }

    pub fn with_configuration_keys(mut self, keys: Vec<String>) -> Self {
        self.configuration_keys = keys;
        self
    }

    /// Describe `E` from a probe instance and use `E::default` as factory
    pub fn of<E>() -> Self
    where
        E: DiffEngine + Default + 'static,
    {
        let probe = E::default();
        Self::new(probe.name(), probe.description(), probe.capabilities())
            .with_configuration_keys(probe.configuration_keys())
            .with_factory(|| Some(Box::new(E::default()) as Box<dyn DiffEngine>))
    }
}

impl std::fmt::Debug for EngineInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineInfo")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("capabilities", &self.capabilities)
            .field("configuration_keys", &self.configuration_keys)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

/// Catalog change notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Registered(String),
    Unregistered(String),
    ConfigurationChanged(String),
    Cleared,
}

#[derive(Default)]
struct Catalog {
    engines: BTreeMap<String, EngineInfo>,
    configurations: BTreeMap<String, EngineConfig>,
}

/// Named engine factories plus their stored configuration
#[derive(Default)]
pub struct EngineRegistry {
    catalog: Mutex<Catalog>,
    listeners: Mutex<Vec<Sender<RegistryEvent>>>,
}

impl EngineRegistry {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog preloaded with the `dmp` and `dtl` engines
    pub fn with_builtin_engines() -> Self {
        let registry = Self::new();
        {
            let mut catalog = registry.catalog();
            for (id, info) in Self::builtin_entries() {
                catalog.engines.insert(id.to_string(), info);
            }
        }
        registry
    }

    fn builtin_entries() -> Vec<(&'static str, EngineInfo)> {
        vec![
            (PRECISE_ENGINE_ID, EngineInfo::of::<PreciseEngine>()),
            (SCALABLE_ENGINE_ID, EngineInfo::of::<ScalableEngine>()),
        ]
    }

    fn catalog(&self) -> MutexGuard<'_, Catalog> {
        self.catalog.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, event: RegistryEvent) {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Receive catalog change events from now on
    pub fn subscribe(&self) -> Receiver<RegistryEvent> {
        let (tx, rx) = mpsc::channel();
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    pub fn register(&self, id: &str, info: EngineInfo) -> Result<(), RegistryError> {
        if id.is_empty() {
            return Err(RegistryError::EmptyId);
        }
        if info.factory.is_none() {
            return Err(RegistryError::InvalidFactory(id.to_string()));
        }

        {
            let mut catalog = self.catalog();
            if catalog.engines.contains_key(id) {
                return Err(RegistryError::AlreadyRegistered(id.to_string()));
            }
            catalog.engines.insert(id.to_string(), info);
        }

        tracing::debug!(engine = id, "registered diff engine");
        self.notify(RegistryEvent::Registered(id.to_string()));
        Ok(())
    }

    /// Register `E` under `id`, using `E::default` as its factory
    pub fn register_engine<E>(&self, id: &str) -> Result<(), RegistryError>
    where
        E: DiffEngine + Default + 'static,
    {
        if id.is_empty() {
            return Err(RegistryError::EmptyId);
        }
        self.register(id, EngineInfo::of::<E>())
    }

    pub fn unregister(&self, id: &str) -> Result<(), RegistryError> {
        if id.is_empty() {
            return Err(RegistryError::EmptyId);
        }

        {
            let mut catalog = self.catalog();
            if catalog.engines.remove(id).is_none() {
                return Err(RegistryError::NotFound(id.to_string()));
            }
            catalog.configurations.remove(id);
        }

        tracing::debug!(engine = id, "unregistered diff engine");
        self.notify(RegistryEvent::Unregistered(id.to_string()));
        Ok(())
    }

    pub fn is_available(&self, id: &str) -> bool {
        self.catalog().engines.contains_key(id)
    }

    /// Registered ids in lexical order
    pub fn list_ids(&self) -> Vec<String> {
        self.catalog().engines.keys().cloned().collect()
    }

    pub fn info(&self, id: &str) -> Option<EngineInfo> {
        self.catalog().engines.get(id).cloned()
    }

    pub fn configuration_keys(&self, id: &str) -> Vec<String> {
        self.catalog()
            .engines
            .get(id)
            .map(|info| info.configuration_keys.clone())
            .unwrap_or_default()
    }

    /// Instantiate a fresh engine for `id` with its stored configuration applied
    pub fn create(&self, id: &str) -> Result<Box<dyn DiffEngine>, RegistryError> {
        let (factory, config) = {
            let catalog = self.catalog();
            let info = catalog
                .engines
                .get(id)
                .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
            let factory = info
                .factory
                .clone()
                .ok_or_else(|| RegistryError::InvalidFactory(id.to_string()))?;
            (factory, catalog.configurations.get(id).cloned())
        };

        let created = catch_unwind(AssertUnwindSafe(|| (*factory)())).unwrap_or_else(|_| {
            tracing::warn!(engine = id, "engine factory panicked");
            None
        });

        let mut engine = created.ok_or_else(|| {
            tracing::warn!(engine = id, "engine factory produced no instance");
            RegistryError::FactoryFailed(id.to_string())
        })?;

        if let Some(config) = config {
            engine.set_configuration(config);
        }

        tracing::debug!(engine = id, name = engine.name(), "created diff engine");
        Ok(engine)
    }

    /// Stored configuration for `id`, empty if none or unknown
    pub fn get_configuration(&self, id: &str) -> EngineConfig {
        self.catalog()
            .configurations
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Replace the stored configuration for `id`
    pub fn set_configuration(&self, id: &str, config: EngineConfig) -> Result<(), RegistryError> {
        if id.is_empty() {
            return Err(RegistryError::EmptyId);
        }

        {
            let mut catalog = self.catalog();
            if !catalog.engines.contains_key(id) {
                return Err(RegistryError::NotFound(id.to_string()));
            }
            catalog.configurations.insert(id.to_string(), config);
        }

        self.notify(RegistryEvent::ConfigurationChanged(id.to_string()));
        Ok(())
    }

    /// Drop every entry and stored configuration, keeping only the built-in engines
    pub fn clear(&self) {
        let builtins = Self::builtin_entries();
        {
            let mut catalog = self.catalog();
            catalog.engines.clear();
            catalog.configurations.clear();
            for (id, info) in builtins {
                catalog.engines.insert(id.to_string(), info);
            }
        }

        tracing::debug!("cleared engine registry");
        self.notify(RegistryEvent::Cleared);
    }
}
