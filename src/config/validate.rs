// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{
    EngineConfig, OperationCatalog, OperationSpec, RawCatalog, RawEngineConfig,
};
use crate::errors::{EngineError, Result};
use crate::types::{NativeActionId, ScriptType};

impl TryFrom<RawCatalog> for OperationCatalog {
    type Error = crate::errors::EngineError;

    fn try_from(raw: RawCatalog) -> std::result::Result<Self, Self::Error> {
        for op in raw.operations.iter() {
            validate_operation(op)?;
        }
        Ok(OperationCatalog::new_unchecked(raw.operations))
    }
}

impl TryFrom<RawEngineConfig> for EngineConfig {
    type Error = crate::errors::EngineError;

    fn try_from(raw: RawEngineConfig) -> std::result::Result<Self, Self::Error> {
        if raw.engine.queue_capacity == 0 {
            return Err(EngineError::ConfigError(
                "[engine].queue_capacity must be >= 1 (got 0)".to_string(),
            ));
        }
        if raw.engine.max_chain_depth == 0 {
            return Err(EngineError::ConfigError(
                "[engine].max_chain_depth must be >= 1 (got 0)".to_string(),
            ));
        }
        for (id, path) in raw.tools.iter() {
            if path.as_os_str().is_empty() {
                return Err(EngineError::ConfigError(format!(
                    "[tools].{id} has an empty path"
                )));
            }
        }
        Ok(EngineConfig::new_unchecked(
            raw.engine,
            raw.tools,
            raw.placeholders,
        ))
    }
}

/// Validate one operation and, recursively, its `on_success` follow-ups.
pub fn validate_operation(op: &OperationSpec) -> Result<()> {
    validate_prompts(op)?;
    validate_native_action(op)?;
    for child in op.on_success.iter() {
        validate_operation(child)?;
    }
    Ok(())
}

fn validate_prompts(op: &OperationSpec) -> Result<()> {
    let mut seen = HashSet::new();
    for prompt in op.prompts.iter() {
        if prompt.name.trim().is_empty() {
            return Err(EngineError::ConfigError(format!(
                "operation '{}' has a prompt with an empty name",
                op.display_name()
            )));
        }
        if !seen.insert(prompt.name.as_str()) {
            return Err(EngineError::ConfigError(format!(
                "operation '{}' declares prompt '{}' more than once",
                op.display_name(),
                prompt.name
            )));
        }
        if prompt.condition.as_deref() == Some(prompt.name.as_str()) {
            return Err(EngineError::ConfigError(format!(
                "prompt '{}' in operation '{}' cannot be conditional on itself",
                prompt.name,
                op.display_name()
            )));
        }
    }
    Ok(())
}

fn validate_native_action(op: &OperationSpec) -> Result<()> {
    if op.script_type != ScriptType::Native {
        return Ok(());
    }
    let Some(action) = op.script.as_deref() else {
        return Err(EngineError::ConfigError(format!(
            "native operation '{}' does not name an action in `script`",
            op.display_name()
        )));
    };
    action
        .parse::<NativeActionId>()
        .map_err(|e| EngineError::ConfigError(format!("operation '{}': {e}", op.display_name())))?;
    Ok(())
}
