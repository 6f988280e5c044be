// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::config::model::{EngineConfig, OperationCatalog, RawCatalog, RawEngineConfig};
use crate::errors::{EngineError, Result};

/// File names probed, in order, when looking for a module's catalog.
pub const CATALOG_FILE_NAMES: [&str; 2] = ["operations.toml", "operations.json"];

/// Load a catalog file and return the raw `RawCatalog`.
///
/// `.json` files may hold either a bare array of operations or an object
/// with an `operations` array; anything else is parsed as TOML. Every
/// operation (including nested `on_success` entries) gets `source_file`
/// stamped with `path`.
///
/// This performs no semantic validation. Use [`load_catalog`] for that.
pub fn load_raw_catalog(path: impl AsRef<Path>) -> Result<RawCatalog> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let mut raw = if is_json(path) {
        match serde_json::from_str::<Value>(&contents)? {
            array @ Value::Array(_) => RawCatalog {
                operations: serde_json::from_value(array)?,
            },
            other => serde_json::from_value::<RawCatalog>(other)?,
        }
    } else {
        toml::from_str::<RawCatalog>(&contents)?
    };

    for op in raw.operations.iter_mut() {
        op.stamp_source(path);
    }

    debug!(path = %path.display(), operations = raw.operations.len(), "loaded catalog");
    Ok(raw)
}

/// Load and validate a module's operation catalog.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<OperationCatalog> {
    let raw = load_raw_catalog(&path)?;
    OperationCatalog::try_from(raw)
}

/// Find the catalog file inside a module directory, if any.
pub fn find_catalog(module_root: &Path) -> Option<PathBuf> {
    CATALOG_FILE_NAMES
        .iter()
        .map(|name| module_root.join(name))
        .find(|candidate| candidate.is_file())
}

/// Load `remake.toml` and validate it.
///
/// Relative paths in `[engine]` and `[tools]` are resolved against the
/// directory containing the config file.
pub fn load_engine_config(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        EngineError::ConfigError(format!("reading {}: {e}", path.display()))
    })?;
    let mut raw: RawEngineConfig = toml::from_str(&contents)?;

    let base = config_root_dir(path);
    raw.engine.project_root = absolutize(&base, &raw.engine.project_root);
    if let Some(registry) = raw.engine.registry_root.take() {
        raw.engine.registry_root = Some(absolutize(&base, &registry));
    }
    raw.engine.trusted_operation_roots = raw
        .engine
        .trusted_operation_roots
        .iter()
        .map(|root| absolutize(&base, root))
        .collect();
    for tool in raw.tools.values_mut() {
        if tool.components().count() > 1 {
            *tool = absolutize(&base, tool);
        }
    }

    EngineConfig::try_from(raw)
}

/// Directory a config file lives in, falling back to the current directory
/// for bare file names like `remake.toml`.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}
