use std::path::Path;
use std::sync::Arc;

use mrirecon_config::{read_capped, ConfigStore, ParamSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::pipeline::Pipeline;
use crate::registry::PluginRegistry;

/// A plugin instance to load: module id plus alias.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub alias: String,
}

/// A successor link from `input` to `output`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEntry {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
}

/// JSON description of a pipeline and its own parameters.
///
/// ```json
/// {
///   "plugins": [ { "id": "sort_combine", "alias": "sorter" },
///                { "id": "scale", "alias": "gain" } ],
///   "root": "sorter",
///   "links": [ { "input": "sorter", "output": "gain" } ],
///   "config": [ { "plugin_alias": "gain", "params": { "factor": 2.0 } } ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineDefinition {
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub links: Vec<LinkEntry>,
    #[serde(default)]
    pub config: Vec<ParamSet>,
}

impl PipelineDefinition {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| PipelineError::Definition(err.into()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = read_capped(path)?;
        let definition = Self::from_json(&text)?;
        debug!(
            ?path,
            plugins = definition.plugins.len(),
            links = definition.links.len(),
            "loaded pipeline definition"
        );
        Ok(definition)
    }

    /// Instantiate plugins in document order, then set the root, then link.
    ///
    /// Entries with an empty id, alias or link end are skipped with a
    /// warning, as is a missing root.
    pub fn build(&self, registry: Arc<PluginRegistry>) -> Result<Pipeline> {
        let mut pipeline = Pipeline::new(registry);

        for entry in &self.plugins {
            if entry.id.is_empty() || entry.alias.is_empty() {
                warn!(id = %entry.id, alias = %entry.alias, "skipping incomplete plugin entry");
                continue;
            }
            pipeline.add_plugin(&entry.id, &entry.alias)?;
        }

        match self.root.as_deref().filter(|root| !root.is_empty()) {
            Some(root) => pipeline.set_root(root)?,
            None => warn!("pipeline definition has no root"),
        }

        for link in &self.links {
            if link.input.is_empty() || link.output.is_empty() {
                warn!(input = %link.input, output = %link.output, "skipping incomplete link");
                continue;
            }
            pipeline.link(&link.input, &link.output)?;
        }

        Ok(pipeline)
    }

    /// The pipeline's own configuration layer.
    pub fn config_store(&self) -> Result<ConfigStore> {
        let mut store = ConfigStore::new();
        for set in &self.config {
            set.apply_to(&mut store)?;
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use mrirecon_config::Scope;

    use super::*;

    const CHAIN: &str = r#"{
        "plugins": [
            { "id": "sort_combine", "alias": "sorter" },
            { "id": "scale", "alias": "gain" },
            { "id": "", "alias": "ignored" }
        ],
        "root": "sorter",
        "links": [ { "input": "sorter", "output": "gain" }, { "input": "gain" } ],
        "config": [ { "plugin_alias": "gain", "params": { "factor": 2.5 } } ]
    }"#;

    fn registry() -> Arc<PluginRegistry> {
        Arc::new(PluginRegistry::with_builtins())
    }

    #[test]
    fn builds_chain() {
        let definition = PipelineDefinition::from_json(CHAIN).unwrap();
        let pipeline = definition.build(registry()).unwrap();

        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.root(), Some("sorter"));
        assert_eq!(pipeline.next_of("sorter"), Some("gain"));
        assert_eq!(pipeline.next_of("gain"), None);
    }

    #[test]
    fn config_layer_is_scoped() {
        let definition = PipelineDefinition::from_json(CHAIN).unwrap();
        let store = definition.config_store().unwrap();
        assert_eq!(
            store.get_float(Scope::plugin("scale", "gain"), "factor").unwrap(),
            Some(2.5)
        );
    }

    #[test]
    fn unknown_module_fails_build() {
        let definition =
            PipelineDefinition::from_json(r#"{ "plugins": [ { "id": "fft", "alias": "f" } ] }"#)
                .unwrap();
        assert!(matches!(
            definition.build(registry()),
            Err(PipelineError::UnknownModule(_))
        ));
    }

    #[test]
    fn bad_link_fails_build() {
        let definition = PipelineDefinition::from_json(
            r#"{ "plugins": [ { "id": "passthrough", "alias": "p" } ],
                 "links": [ { "input": "p", "output": "q" } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            definition.build(registry()),
            Err(PipelineError::UnknownAlias(_))
        ));
    }

    #[test]
    fn missing_root_is_tolerated_until_reconstruct() {
        let definition = PipelineDefinition::from_json(
            r#"{ "plugins": [ { "id": "passthrough", "alias": "p" } ] }"#,
        )
        .unwrap();
        let pipeline = definition.build(registry()).unwrap();
        assert_eq!(pipeline.root(), None);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CHAIN.as_bytes()).unwrap();
        let definition = PipelineDefinition::load(file.path()).unwrap();
        assert_eq!(definition.plugins.len(), 3);
    }

    #[test]
    fn malformed_document_is_a_definition_error() {
        assert!(matches!(
            PipelineDefinition::from_json("{ not json"),
            Err(PipelineError::Definition(_))
        ));
    }
}
