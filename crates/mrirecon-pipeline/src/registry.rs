use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{PipelineError, PluginError, Result};
use crate::plugin::ReconPlugin;
use crate::plugins;

/// Constructor for one plugin module. Receives the instance alias.
pub type PluginFactory =
    Box<dyn Fn(&str) -> std::result::Result<Box<dyn ReconPlugin>, PluginError> + Send + Sync>;

/// Module-id keyed table of plugin constructors.
///
/// Built once at startup and shared read-only by every session.
#[derive(Default)]
pub struct PluginRegistry {
    factories: BTreeMap<String, PluginFactory>,
}

impl PluginRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in modules.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        plugins::register_builtins(&mut registry);
        registry
    }

    /// Register a constructor, replacing any previous one for `module_id`.
    pub fn register<F>(&mut self, module_id: impl Into<String>, factory: F)
    where
        F: Fn(&str) -> std::result::Result<Box<dyn ReconPlugin>, PluginError>
            + Send
            + Sync
            + 'static,
    {
        let module_id = module_id.into();
        debug!(module = %module_id, "registering plugin module");
        self.factories.insert(module_id, Box::new(factory));
    }

    /// Instantiate `module_id` under `alias`.
    pub fn create(&self, module_id: &str, alias: &str) -> Result<Box<dyn ReconPlugin>> {
        let factory = self
            .factories
            .get(module_id)
            .ok_or_else(|| PipelineError::UnknownModule(module_id.to_string()))?;
        factory(alias).map_err(|source| PipelineError::Create {
            module: module_id.to_string(),
            alias: alias.to_string(),
            source,
        })
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.factories.contains_key(module_id)
    }

    /// Registered module ids in sorted order.
    pub fn module_ids(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("modules", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}
