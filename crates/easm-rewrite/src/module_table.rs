//! Table of recognized modules and the virtual-path functions they export.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// How a recognized call is rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// `get(store.state.a)` becomes `store.get(["a"])`.
    StoreMethod,
    /// `createHook(store.state.a, sel)` becomes
    /// `createHook(store.getSubStore(["a"]), sel)`.
    SubStoreFactory,
}

/// Functions a single module exports and how calls to them are rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub kind: CallKind,
    pub functions: BTreeSet<String>,
}

impl ModuleSpec {
    pub fn new<I, S>(kind: CallKind, functions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind,
            functions: functions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn exports(&self, function: &str) -> bool {
        self.functions.contains(function)
    }
}

/// Module specifier to [`ModuleSpec`].
///
/// Serialized as a plain JSON object:
///
/// ```json
/// { "@easm/core": { "kind": "store_method", "functions": ["get", "set"] } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleTable {
    modules: BTreeMap<String, ModuleSpec>,
}

const STORE_METHODS: [&str; 7] = ["get", "set", "push", "pop", "shift", "unshift", "merge"];
const SUB_STORE_FACTORIES: [&str; 2] = ["createAdapter", "createHook"];

impl Default for ModuleTable {
    fn default() -> Self {
        Self::empty()
            .with_module("@easm/core", ModuleSpec::new(CallKind::StoreMethod, STORE_METHODS))
            .with_module(
                "@easm/core/actions",
                ModuleSpec::new(CallKind::StoreMethod, STORE_METHODS),
            )
            .with_module(
                "@easm/react",
                ModuleSpec::new(CallKind::SubStoreFactory, SUB_STORE_FACTORIES),
            )
            .with_module(
                "@easm/react/connect",
                ModuleSpec::new(CallKind::SubStoreFactory, SUB_STORE_FACTORIES),
            )
    }
}

impl ModuleTable {
    /// A table recognizing nothing.
    pub fn empty() -> Self {
        Self {
            modules: BTreeMap::new(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn with_module(mut self, module: impl Into<String>, spec: ModuleSpec) -> Self {
        self.insert(module, spec);
        self
    }

    /// Add or replace a module entry.
    pub fn insert(&mut self, module: impl Into<String>, spec: ModuleSpec) -> Option<ModuleSpec> {
        self.modules.insert(module.into(), spec)
    }

    pub fn get(&self, module: &str) -> Option<&ModuleSpec> {
        self.modules.get(module)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModuleSpec)> {
        self.modules.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (module, spec) in &self.modules {
            if module.is_empty() {
                return Err(ConfigError::Invalid {
                    module: module.clone(),
                    reason: "module specifier is empty".into(),
                });
            }
            if spec.functions.is_empty() {
                return Err(ConfigError::Invalid {
                    module: module.clone(),
                    reason: "no functions listed".into(),
                });
            }
            if let Some(blank) = spec.functions.iter().find(|f| f.trim().is_empty()) {
                return Err(ConfigError::Invalid {
                    module: module.clone(),
                    reason: format!("function name {:?} is blank", blank),
                });
            }
        }
        Ok(())
    }
}
