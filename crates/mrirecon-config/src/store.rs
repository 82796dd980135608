use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, trace};

use crate::error::{ConfigError, Result};

pub(crate) type ParamMap = BTreeMap<String, String>;

/// Which part of the store a lookup or write addresses.
///
/// Empty names count as absent. With neither name the scope is global.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Scope<'a> {
    id: Option<&'a str>,
    alias: Option<&'a str>,
}

impl<'a> Scope<'a> {
    pub fn global() -> Self {
        Self::default()
    }

    /// Scope of a plugin instance: module id plus instance alias.
    pub fn plugin(id: &'a str, alias: &'a str) -> Self {
        Self::new(Some(id), Some(alias))
    }

    pub fn id(id: &'a str) -> Self {
        Self::new(Some(id), None)
    }

    pub fn alias(alias: &'a str) -> Self {
        Self::new(None, Some(alias))
    }

    pub fn new(id: Option<&'a str>, alias: Option<&'a str>) -> Self {
        Self {
            id: id.filter(|s| !s.is_empty()),
            alias: alias.filter(|s| !s.is_empty()),
        }
    }

    pub fn is_global(&self) -> bool {
        self.id.is_none() && self.alias.is_none()
    }

    pub fn id_name(&self) -> Option<&'a str> {
        self.id
    }

    pub fn alias_name(&self) -> Option<&'a str> {
        self.alias
    }
}

impl fmt::Display for Scope<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.id, self.alias) {
            (None, None) => f.write_str("global"),
            (Some(id), None) => write!(f, "id:{id}"),
            (None, Some(alias)) => write!(f, "alias:{alias}"),
            (Some(id), Some(alias)) => write!(f, "{id}/{alias}"),
        }
    }
}

/// String key/value store with three tiers.
///
/// - global values, visible only to unscoped lookups
/// - values per plugin module id
/// - values per plugin instance alias, which win over the id tier
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigStore {
    pub(crate) global: ParamMap,
    pub(crate) by_id: BTreeMap<String, ParamMap>,
    pub(crate) by_alias: BTreeMap<String, ParamMap>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
            && self.by_id.values().all(BTreeMap::is_empty)
            && self.by_alias.values().all(BTreeMap::is_empty)
    }

    /// Raw lookup.
    ///
    /// An unscoped lookup reads the global tier. A scoped lookup reads the
    /// id tier, then lets a value in the alias tier override it; it never
    /// falls back to global values.
    pub fn get(&self, scope: Scope<'_>, key: &str) -> Option<&str> {
        if scope.is_global() {
            return self.global.get(key).map(String::as_str);
        }

        let mut found = None;
        if let Some(value) = scope.id.and_then(|id| self.by_id.get(id)?.get(key)) {
            found = Some(value.as_str());
        }
        if let Some(value) = scope
            .alias
            .and_then(|alias| self.by_alias.get(alias)?.get(key))
        {
            found = Some(value.as_str());
        }
        found
    }

    pub fn get_string(&self, scope: Scope<'_>, key: &str) -> Option<String> {
        self.get(scope, key).map(str::to_string)
    }

    pub fn get_int(&self, scope: Scope<'_>, key: &str) -> Result<Option<i64>> {
        self.parse_with(scope, key, "integer", |v| v.trim().parse::<i64>().ok())
    }

    pub fn get_float(&self, scope: Scope<'_>, key: &str) -> Result<Option<f64>> {
        self.parse_with(scope, key, "float", |v| v.trim().parse::<f64>().ok())
    }

    /// Accepts `true`, `True`, `TRUE` and the matching `false` spellings.
    pub fn get_bool(&self, scope: Scope<'_>, key: &str) -> Result<Option<bool>> {
        self.parse_with(scope, key, "boolean", |v| match v {
            "true" | "True" | "TRUE" => Some(true),
            "false" | "False" | "FALSE" => Some(false),
            _ => None,
        })
    }

    fn parse_with<T>(
        &self,
        scope: Scope<'_>,
        key: &str,
        expected: &'static str,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Result<Option<T>> {
        let Some(value) = self.get(scope, key) else {
            return Ok(None);
        };
        parse(value).map(Some).ok_or_else(|| ConfigError::Parse {
            key: key.to_string(),
            value: value.to_string(),
            expected,
        })
    }

    /// Insert a value unless the key already exists in the target tier.
    ///
    /// The alias tier is targeted when an alias is given, else the id tier,
    /// else global. Returns whether the value was stored.
    pub fn set(&mut self, scope: Scope<'_>, key: &str, value: impl Into<String>) -> Result<bool> {
        if key.is_empty() {
            return Err(ConfigError::EmptyKey);
        }

        let map = match (scope.alias, scope.id) {
            (Some(alias), _) => self.by_alias.entry(alias.to_string()).or_default(),
            (None, Some(id)) => self.by_id.entry(id.to_string()).or_default(),
            (None, None) => &mut self.global,
        };

        if map.contains_key(key) {
            trace!(%scope, key, "config key already set, keeping first value");
            return Ok(false);
        }
        map.insert(key.to_string(), value.into());
        Ok(true)
    }

    /// Every key visible from `scope`, resolved through [`get`](Self::get).
    ///
    /// Keys are collected from all three tiers; global keys only resolve for
    /// an unscoped snapshot.
    pub fn load_snapshot(&self, scope: Scope<'_>) -> BTreeMap<String, String> {
        let empty = ParamMap::new();
        let id_map = scope
            .id
            .and_then(|id| self.by_id.get(id))
            .unwrap_or(&empty);
        let alias_map = scope
            .alias
            .and_then(|alias| self.by_alias.get(alias))
            .unwrap_or(&empty);

        self.global
            .keys()
            .chain(id_map.keys())
            .chain(alias_map.keys())
            .filter_map(|key| {
                self.get(scope, key)
                    .map(|value| (key.clone(), value.to_string()))
            })
            .collect()
    }

    /// Merge `other` into this store without overwriting existing keys.
    pub fn add(&mut self, other: &ConfigStore) {
        merge_missing(&mut self.global, &other.global);
        for (id, params) in &other.by_id {
            merge_missing(self.by_id.entry(id.clone()).or_default(), params);
        }
        for (alias, params) in &other.by_alias {
            merge_missing(self.by_alias.entry(alias.clone()).or_default(), params);
        }
        debug!(
            global = self.global.len(),
            ids = self.by_id.len(),
            aliases = self.by_alias.len(),
            "merged configuration"
        );
    }

    pub fn global_params(&self) -> &BTreeMap<String, String> {
        &self.global
    }

    pub fn id_params(&self) -> &BTreeMap<String, BTreeMap<String, String>> {
        &self.by_id
    }

    pub fn alias_params(&self) -> &BTreeMap<String, BTreeMap<String, String>> {
        &self.by_alias
    }
}

fn merge_missing(dst: &mut ParamMap, src: &ParamMap) {
    for (key, value) in src {
        dst.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

impl fmt::Display for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "global:")?;
        for (key, value) in &self.global {
            writeln!(f, "  {key} = {value}")?;
        }
        for (label, tier) in [("id", &self.by_id), ("alias", &self.by_alias)] {
            for (name, params) in tier {
                writeln!(f, "{label} {name}:")?;
                for (key, value) in params {
                    writeln!(f, "  {key} = {value}")?;
                }
            }
        }
        Ok(())
    }
}
