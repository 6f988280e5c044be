// src/context/execution.rs

//! Per-run execution context.
//!
//! Layering, later entries winning:
//! 1. `[placeholders]` from the engine config
//! 2. built-in paths: `Game_Root`, `Project_Root`, `Registry_Root`,
//!    `Game.{RootPath,Name,Id}`, `Tools.<id>`
//! 3. the module's own `config.toml`, deep-merged

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::config::{EngineConfig, ModuleTable};
use crate::errors::{EngineError, Result};

/// Name of the module-local override file.
pub const MODULE_OVERRIDE_FILE: &str = "config.toml";

/// Non-fatal problem reading a module override file.
#[derive(Debug, Clone)]
pub struct OverrideWarning {
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for OverrideWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ignoring {}: {}", self.path.display(), self.reason)
    }
}

/// Read-only nested map consumed by the placeholder resolver.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    values: Map<String, Value>,
}

impl ExecutionContext {
    /// Wrap an existing map (mainly for tests and embedders).
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    /// Build a fresh context for `module_id`.
    ///
    /// Fails with `InvalidInput` for an empty id and `ModuleNotFound` when
    /// the id is not in `modules`. A malformed override file is logged and
    /// skipped.
    pub fn build(module_id: &str, modules: &ModuleTable, config: &EngineConfig) -> Result<Self> {
        if module_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("module id is empty".to_string()));
        }
        let module = modules
            .get(module_id)
            .ok_or_else(|| EngineError::ModuleNotFound(module_id.to_string()))?;

        let mut values = config.placeholders.clone();

        let settings = &config.settings;
        values.insert("Game_Root".into(), path_value(&module.root));
        values.insert("Project_Root".into(), path_value(&settings.project_root));
        values.insert("Registry_Root".into(), path_value(&settings.registry_root()));
        values.insert(
            "Game".into(),
            json!({
                "RootPath": path_string(&module.root),
                "Name": module.name,
                "Id": module.id,
            }),
        );

        let tools: Map<String, Value> = config
            .tools
            .iter()
            .map(|(id, path)| (id.clone(), path_value(path)))
            .collect();
        values.insert("Tools".into(), Value::Object(tools));

        match load_module_overrides(&module.root) {
            Ok(Some(overrides)) => {
                debug!(module = %module_id, keys = overrides.len(), "applying module overrides");
                deep_merge(&mut values, overrides);
            }
            Ok(None) => {}
            Err(warning) => warn!(module = %module_id, "{warning}"),
        }

        Ok(Self { values })
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }
}

/// Read `<module_root>/config.toml`.
///
/// - `Ok(None)`: no override file.
/// - `Ok(Some(map))`: parsed overrides.
/// - `Err(warning)`: unreadable or malformed; the caller proceeds without it.
pub fn load_module_overrides(
    module_root: &Path,
) -> std::result::Result<Option<Map<String, Value>>, OverrideWarning> {
    let path = module_root.join(MODULE_OVERRIDE_FILE);
    let contents = match fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(OverrideWarning {
                path,
                reason: e.to_string(),
            });
        }
    };

    toml::from_str::<Map<String, Value>>(&contents)
        .map(Some)
        .map_err(|e| OverrideWarning {
            path,
            reason: e.to_string(),
        })
}

/// Recursively merge `overlay` into `base`; maps merge, everything else
/// replaces.
pub fn deep_merge(base: &mut Map<String, Value>, overlay: Map<String, Value>) {
    for (key, value) in overlay {
        let Value::Object(incoming) = value else {
            base.insert(key, value);
            continue;
        };
        if let Some(Value::Object(existing)) = base.get_mut(&key) {
            deep_merge(existing, incoming);
            continue;
        }
        base.insert(key, Value::Object(incoming));
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn path_value(path: &Path) -> Value {
    Value::String(path_string(path))
}
