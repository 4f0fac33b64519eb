//! Model registry: explicit mapping from model name to implementation
//!
//! The registry is a plain owned object rather than process-global state;
//! it is populated once by an explicit initialization step and read
//! thereafter.

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::model::Model;
use std::collections::BTreeMap;

/// Produces the config used when the caller supplies none
pub type DefaultConfigFn = fn() -> ModelConfig;

/// Constructs an implementation from a config
pub type BuildFn = fn(ModelConfig) -> Result<Box<dyn Model>>;

/// A registered model implementation
#[derive(Debug)]
pub struct RegistryEntry {
    pub name: String,
    pub default_config: DefaultConfigFn,
    pub build: BuildFn,
}

/// Mapping from model name to implementation
pub struct ModelRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl ModelRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Registry pre-populated with the builtin implementations
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::models::register_builtins(&mut registry);
        registry
    }

    /// Insert an entry under `name`
    ///
    /// Re-registering an existing name replaces the previous entry; the
    /// replacement is logged so accidental collisions stay visible.
    pub fn register(&mut self, name: &str, default_config: DefaultConfigFn, build: BuildFn) {
        if self.entries.contains_key(name) {
            tracing::warn!(name = %name, "re-registering model, previous entry is replaced");
        }
        self.entries.insert(
            name.to_string(),
            RegistryEntry {
                name: name.to_string(),
                default_config,
                build,
            },
        );
    }

    /// Look up an entry by name
    pub fn resolve(&self, name: &str) -> Result<&RegistryEntry> {
        self.entries.get(name).ok_or_else(|| Error::UnknownModel {
            name: name.to_string(),
            known: self.names(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
