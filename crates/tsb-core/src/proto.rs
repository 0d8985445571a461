//! # Proto Registry
//!
//! A proto maps module paths to symbol tables:
//!
//! ```json
//! { "shared/User": { "User": { "type": "Interface", "properties": [] } } }
//! ```
//!
//! The registry is supplied wholesale by the caller and is read-only once a
//! validator has been built from it. Protos load from JSON (the format the
//! schema compiler emits) or YAML (hand-written fixtures).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ProtoError;
use crate::schema::Schema;

/// Module path → symbol name → schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Proto {
    modules: BTreeMap<String, BTreeMap<String, Schema>>,
}

impl Proto {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` as `symbol` in module `path`, replacing any previous
    /// definition.
    pub fn insert(&mut self, path: impl Into<String>, symbol: impl Into<String>, schema: Schema) {
        self.modules
            .entry(path.into())
            .or_default()
            .insert(symbol.into(), schema);
    }

    /// Builder form of [`Proto::insert`].
    pub fn with(mut self, path: impl Into<String>, symbol: impl Into<String>, schema: Schema) -> Self {
        self.insert(path, symbol, schema);
        self
    }

    pub fn get(&self, path: &str, symbol: &str) -> Option<&Schema> {
        self.modules.get(path)?.get(symbol)
    }

    /// The symbol table of one module.
    pub fn module(&self, path: &str) -> Option<&BTreeMap<String, Schema>> {
        self.modules.get(path)
    }

    pub fn has_module(&self, path: &str) -> bool {
        self.modules.contains_key(path)
    }

    /// Every module with its symbol table, ordered by path.
    pub fn modules(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, Schema>)> {
        self.modules.iter().map(|(path, table)| (path.as_str(), table))
    }

    /// Every `(path, symbol, schema)` triple, ordered by path then symbol.
    pub fn symbols(&self) -> impl Iterator<Item = (&str, &str, &Schema)> {
        self.modules.iter().flat_map(|(path, table)| {
            table
                .iter()
                .map(move |(symbol, schema)| (path.as_str(), symbol.as_str(), schema))
        })
    }

    /// Number of modules.
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Number of symbols across all modules.
    pub fn len(&self) -> usize {
        self.modules.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn from_json_str(json: &str) -> Result<Self, ProtoError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ProtoError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a proto file. `.yaml`/`.yml` files are parsed as YAML, anything
    /// else as JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProtoError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ProtoError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            "yaml" | "yml" => Self::from_yaml_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    pub fn to_json_string(&self) -> Result<String, ProtoError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Split a reference target `<module path>/<symbol name>` at its final `/`.
///
/// Returns `None` when the target has no `/` or either side is empty.
pub fn split_target(target: &str) -> Option<(&str, &str)> {
    let (path, symbol) = target.rsplit_once('/')?;
    if path.is_empty() || symbol.is_empty() {
        return None;
    }
    Some((path, symbol))
}
