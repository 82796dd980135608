use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use mrirecon_config::ConfigStore;
use mrirecon_proto::{Measurement, SampleArray};
use tracing::{debug, info, warn};

use crate::error::{ConfigureFailure, PipelineError, Result};
use crate::plugin::ReconPlugin;
use crate::registry::PluginRegistry;

struct Stage {
    plugin: Box<dyn ReconPlugin>,
    next: Option<String>,
}

/// Plugin instances keyed by alias plus a linked processing chain.
///
/// Only the root and the chain reachable through its successors run; other
/// loaded instances are configured but never executed.
pub struct Pipeline {
    registry: Arc<PluginRegistry>,
    stages: BTreeMap<String, Stage>,
    root: Option<String>,
}

impl Pipeline {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            stages: BTreeMap::new(),
            root: None,
        }
    }

    /// Instantiate `module_id` as `alias`.
    ///
    /// An existing instance under `alias` is destroyed first, together with
    /// its outgoing link; it stays gone even if the new instance cannot be
    /// created.
    pub fn add_plugin(&mut self, module_id: &str, alias: &str) -> Result<()> {
        if alias.is_empty() {
            return Err(PipelineError::EmptyAlias);
        }
        if let Some(old) = self.stages.remove(alias) {
            debug!(alias, module = old.plugin.plugin_id(), "replacing plugin instance");
        }

        let plugin = self.registry.create(module_id, alias)?;
        self.stages.insert(
            alias.to_string(),
            Stage {
                plugin,
                next: None,
            },
        );
        info!(alias, module = module_id, "plugin loaded");
        Ok(())
    }

    /// Make `sink` the successor of `source`, replacing any previous one.
    pub fn link(&mut self, source: &str, sink: &str) -> Result<()> {
        if !self.stages.contains_key(sink) {
            return Err(PipelineError::UnknownAlias(sink.to_string()));
        }
        let stage = self
            .stages
            .get_mut(source)
            .ok_or_else(|| PipelineError::UnknownAlias(source.to_string()))?;
        stage.next = Some(sink.to_string());
        debug!(source, sink, "plugins linked");
        Ok(())
    }

    pub fn set_root(&mut self, alias: &str) -> Result<()> {
        if !self.stages.contains_key(alias) {
            return Err(PipelineError::UnknownAlias(alias.to_string()));
        }
        self.root = Some(alias.to_string());
        Ok(())
    }

    /// Hand one configuration layer to every loaded instance.
    ///
    /// All instances are visited in alias order even after a failure; the
    /// failures are collected into [`PipelineError::Configure`].
    pub fn configure(
        &mut self,
        config: &ConfigStore,
        is_main: bool,
        is_final: bool,
    ) -> Result<()> {
        let mut failures = Vec::new();
        for (alias, stage) in &mut self.stages {
            if let Err(error) = stage.plugin.configure(config, is_main, is_final) {
                warn!(alias = %alias, error = %error, "plugin rejected configuration");
                failures.push(ConfigureFailure {
                    alias: alias.clone(),
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Configure(failures))
        }
    }

    /// Build `array` from `measurements` with the root, then run every
    /// successor in chain order on the array in place.
    ///
    /// Stops at the first failing plugin or at a plugin visited twice.
    pub fn reconstruct(
        &mut self,
        measurements: &[Measurement],
        array: &mut SampleArray,
    ) -> Result<()> {
        let root = self.root.clone().ok_or(PipelineError::NoRoot)?;
        let stage = self
            .stages
            .get_mut(&root)
            .ok_or_else(|| PipelineError::UnknownAlias(root.clone()))?;
        if !stage.plugin.can_reconstruct_from_measurements() {
            return Err(PipelineError::RootCannotReconstruct(root));
        }

        debug!(alias = %root, count = measurements.len(), "running root plugin");
        stage
            .plugin
            .reconstruct_measurements(measurements, array)
            .map_err(|source| PipelineError::Stage {
                alias: root.clone(),
                source,
            })?;

        let mut visited = HashSet::from([root.clone()]);
        let mut current = stage.next.clone();
        while let Some(alias) = current {
            if !visited.insert(alias.clone()) {
                return Err(PipelineError::Cycle(alias));
            }
            let stage = self
                .stages
                .get_mut(&alias)
                .ok_or_else(|| PipelineError::UnknownAlias(alias.clone()))?;

            debug!(alias = %alias, "running plugin");
            stage
                .plugin
                .reconstruct(array)
                .map_err(|source| PipelineError::Stage {
                    alias: alias.clone(),
                    source,
                })?;
            current = stage.next.clone();
        }
        Ok(())
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn next_of(&self, alias: &str) -> Option<&str> {
        self.stages.get(alias)?.next.as_deref()
    }

    pub fn plugin(&self, alias: &str) -> Option<&dyn ReconPlugin> {
        self.stages.get(alias).map(|stage| stage.plugin.as_ref())
    }

    /// Loaded aliases in sorted order.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.stages.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("plugins", &self.stages.keys().collect::<Vec<_>>())
            .field("root", &self.root)
            .finish()
    }
}
