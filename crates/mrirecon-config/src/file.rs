use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ConfigError, Result};
use crate::store::{ConfigStore, Scope};

/// Maximum bytes accepted from a configuration or pipeline file.
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// A block of parameters for one scope.
///
/// With neither `plugin_id` nor `plugin_alias` the parameters are global.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_alias: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

impl ParamSet {
    pub fn scope(&self) -> Scope<'_> {
        Scope::new(self.plugin_id.as_deref(), self.plugin_alias.as_deref())
    }

    /// Store every parameter, keeping values already present.
    ///
    /// Strings are stored verbatim; numbers and booleans in their JSON
    /// spelling. Empty keys are skipped with a warning.
    pub fn apply_to(&self, store: &mut ConfigStore) -> Result<()> {
        let scope = self.scope();
        for (key, value) in &self.params {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return Err(ConfigError::UnsupportedValue { key: key.clone() }),
            };
            match store.set(scope, key, text) {
                Ok(_) => {}
                Err(ConfigError::EmptyKey) => warn!(%scope, "skipping parameter with empty name"),
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

/// A standalone configuration file: global parameters plus scoped sets.
///
/// ```json
/// {
///   "params": { "port": 9999, "pipeline_dir": "/etc/mrirecon/pipelines" },
///   "plugins": [ { "plugin_alias": "gain", "params": { "factor": 2.0 } } ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigDocument {
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    #[serde(default)]
    pub plugins: Vec<ParamSet>,
}

impl ConfigDocument {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a document, refusing files above the size cap.
    pub fn load(path: &Path) -> Result<Self> {
        let text = read_capped(path)?;
        let doc = Self::from_json(&text)?;
        debug!(?path, sets = doc.plugins.len(), "loaded configuration document");
        Ok(doc)
    }

    pub fn to_store(&self) -> Result<ConfigStore> {
        let mut store = ConfigStore::new();
        ParamSet {
            plugin_id: None,
            plugin_alias: None,
            params: self.params.clone(),
        }
        .apply_to(&mut store)?;
        for set in &self.plugins {
            set.apply_to(&mut store)?;
        }
        Ok(store)
    }
}

impl ConfigStore {
    /// Load a [`ConfigDocument`] file into a fresh store.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        ConfigDocument::load(path.as_ref())?.to_store()
    }
}

/// Read a UTF-8 file no larger than [`MAX_CONFIG_FILE_SIZE`].
pub fn read_capped(path: &Path) -> Result<String> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    let size = std::fs::metadata(path).map_err(io_err)?.len();
    if size > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::TooLarge {
            path: path.to_path_buf(),
            size,
            max: MAX_CONFIG_FILE_SIZE,
        });
    }
    std::fs::read_to_string(path).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn document_fills_all_tiers() {
        let doc = ConfigDocument::from_json(
            r#"{
                "params": { "port": 7000, "log_path": "/tmp/x.log", "verbose": true },
                "plugins": [
                    { "plugin_id": "scale", "params": { "factor": 2 } },
                    { "plugin_alias": "gain", "params": { "factor": "0.5" } }
                ]
            }"#,
        )
        .unwrap();
        let store = doc.to_store().unwrap();

        assert_eq!(store.get_int(Scope::global(), "port").unwrap(), Some(7000));
        assert_eq!(store.get_bool(Scope::global(), "verbose").unwrap(), Some(true));
        assert_eq!(store.get(Scope::id("scale"), "factor"), Some("2"));
        assert_eq!(
            store.get_float(Scope::plugin("scale", "gain"), "factor").unwrap(),
            Some(0.5)
        );
    }

    #[test]
    fn first_set_wins_within_document() {
        let doc = ConfigDocument::from_json(
            r#"{ "plugins": [
                { "plugin_alias": "gain", "params": { "factor": 1 } },
                { "plugin_alias": "gain", "params": { "factor": 9 } }
            ] }"#,
        )
        .unwrap();
        let store = doc.to_store().unwrap();
        assert_eq!(store.get(Scope::alias("gain"), "factor"), Some("1"));
    }

    #[test]
    fn nested_values_are_rejected() {
        let doc = ConfigDocument::from_json(r#"{ "params": { "list": [1, 2] } }"#).unwrap();
        assert!(matches!(
            doc.to_store(),
            Err(ConfigError::UnsupportedValue { .. })
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(ConfigDocument::from_json(r#"{ "parms": {} }"#).is_err());
    }

    #[test]
    fn from_file_reads_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "params": {{ "pipeline_dir": "/srv/pipelines" }} }}"#).unwrap();

        let store = ConfigStore::from_file(file.path()).unwrap();
        assert_eq!(store.get(Scope::global(), "pipeline_dir"), Some("/srv/pipelines"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ConfigStore::from_file("/nonexistent/mrirecon.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
