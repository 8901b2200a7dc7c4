//! Host module registry.
//!
//! The engine provides a catalogue of modules that plugin manifests may
//! depend on. Its real contents live outside this repository, so the
//! registry is either the built-in stub or a TOML file:
//!
//! ```toml
//! [[module]]
//! name = "Core"
//!
//! [[module]]
//! name = "UnrealEd"
//! editor_only = true
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RegistryError;

/// A module provided by the host engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostModule {
    pub name: String,
    /// Only available in editor builds.
    #[serde(default)]
    pub editor_only: bool,
}

/// Name lookup into the host's module catalogue.
pub trait ModuleLookup {
    fn lookup(&self, name: &str) -> Option<&HostModule>;

    fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn is_editor_only(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|m| m.editor_only)
    }
}

/// Engine modules referenced by the bundled plugins.
const STUB_MODULES: &[&str] = &[
    "AIModule",
    "AssetRegistry",
    "AutomationController",
    "AutomationTest",
    "ChaosVehicles",
    "ChaosVehiclesCore",
    "Core",
    "CoreUObject",
    "DeveloperSettings",
    "Engine",
    "GameplayTags",
    "InputCore",
    "Json",
    "JsonUtilities",
    "MassAI",
    "MassCommon",
    "MassEntity",
    "MassLOD",
    "MassMovement",
    "MassRepresentation",
    "MassSpawner",
    "NavigationSystem",
    "Niagara",
    "OnlineSubsystem",
    "Slate",
    "SlateCore",
    "SmartObjectsModule",
    "StateTreeModule",
    "UMG",
    "WorldPartition",
    "ZoneGraph",
];

/// Editor tooling modules; referencing them outside an editor block
/// breaks game builds.
const STUB_EDITOR_MODULES: &[&str] = &[
    "AudioEditor",
    "Blutility",
    "EditorScriptingUtilities",
    "UMGEditor",
    "UnrealEd",
];

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default, rename = "module")]
    modules: Vec<HostModule>,
}

/// An immutable-after-construction map of host modules.
#[derive(Debug, Clone, Default)]
pub struct HostModuleRegistry {
    modules: BTreeMap<String, HostModule>,
}

impl HostModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in catalogue covering the engine modules the bundled plugins use.
    pub fn stub() -> Self {
        let mut registry = Self::new();
        for name in STUB_MODULES {
            registry.insert_unchecked(name, false);
        }
        for name in STUB_EDITOR_MODULES {
            registry.insert_unchecked(name, true);
        }
        registry
    }

    /// Registry with plain (non-editor) modules, mostly for tests.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::new();
        for name in names {
            registry.insert_unchecked(name.as_ref(), false);
        }
        registry
    }

    /// Mark additional modules as editor-only.
    pub fn with_editor_only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            self.insert_unchecked(name.as_ref(), true);
        }
        self
    }

    fn insert_unchecked(&mut self, name: &str, editor_only: bool) {
        self.modules.insert(
            name.to_string(),
            HostModule {
                name: name.to_string(),
                editor_only,
            },
        );
    }

    /// Add a module, rejecting duplicates.
    pub fn insert(&mut self, module: HostModule) -> Result<(), RegistryError> {
        if self.modules.contains_key(&module.name) {
            return Err(RegistryError::DuplicateModule { name: module.name });
        }
        self.modules.insert(module.name.clone(), module);
        Ok(())
    }

    /// Load a registry from a TOML file.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_str(&content, path)
    }

    /// Parse a registry from TOML text; `path` is used in error messages.
    pub fn parse_str(content: &str, path: &Path) -> Result<Self, RegistryError> {
        let file: RegistryFile = toml::from_str(content).map_err(|e| RegistryError::Parse {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;

        let mut registry = Self::new();
        for module in file.modules {
            registry.insert(module)?;
        }
        debug!(path = %path.display(), modules = registry.len(), "loaded host module registry");
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Modules in name order.
    pub fn iter(&self) -> impl Iterator<Item = &HostModule> {
        self.modules.values()
    }
}

impl ModuleLookup for HostModuleRegistry {
    fn lookup(&self, name: &str) -> Option<&HostModule> {
        self.modules.get(name)
    }
}
