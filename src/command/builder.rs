// src/command/builder.rs

//! Turns an `OperationSpec` into a concrete invocation.

use serde_json::Value;
use tracing::{debug, warn};

use crate::command::prompts::{PromptAnswers, prompt_arguments, seed_defaults};
use crate::config::{EngineConfig, ModuleTable, OperationSpec};
use crate::context::{ExecutionContext, resolve, resolve_str, value_to_string};
use crate::errors::{EngineError, Result};
use crate::types::ScriptType;

/// Script and arguments of an operation after placeholder resolution and
/// prompt materialization. Shared by every execution strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOperation {
    pub script: String,
    /// Resolved `args` followed by prompt-derived CLI fragments.
    pub args: Vec<String>,
}

/// Build the argv for a `process` operation.
///
/// Returns an empty vector when the operation declares no `script`; callers
/// treat that as "nothing to run".
pub fn build(
    module_id: &str,
    modules: &ModuleTable,
    config: &EngineConfig,
    operation: &OperationSpec,
    answers: &mut PromptAnswers,
) -> Result<Vec<String>> {
    let context = ExecutionContext::build(module_id, modules, config)?;
    build_with_context(&context, config, operation, answers)
}

/// Same as [`build`] with an already constructed context (one per chain root).
pub fn build_with_context(
    context: &ExecutionContext,
    config: &EngineConfig,
    operation: &OperationSpec,
    answers: &mut PromptAnswers,
) -> Result<Vec<String>> {
    let executable = match &operation.script_type {
        ScriptType::Process => config.settings.interpreter(),
        other => {
            return Err(EngineError::InvalidInput(format!(
                "operation '{}' has script_type '{other}' and is not run as a process",
                operation.display_name()
            )));
        }
    };

    let Some(resolved) = resolve_operation(context, operation, answers)? else {
        return Ok(Vec::new());
    };

    let mut argv = Vec::with_capacity(resolved.args.len() + 2);
    argv.push(executable);
    argv.push(resolved.script);
    argv.extend(resolved.args);

    debug!(operation = %operation.display_name(), ?argv, "built command");
    Ok(argv)
}

/// Resolve `script` and `args` and materialize prompts.
///
/// `Ok(None)` when the operation has no script.
pub fn resolve_operation(
    context: &ExecutionContext,
    operation: &OperationSpec,
    answers: &mut PromptAnswers,
) -> Result<Option<ResolvedOperation>> {
    let Some(script) = operation.script.as_deref() else {
        return Ok(None);
    };
    let script = resolve_str(script, context.values());

    let mut args = Vec::new();
    for arg in operation.args.iter() {
        push_scalars(&mut args, resolve(arg, context.values()), operation);
    }

    seed_defaults(&operation.prompts, answers);
    args.extend(prompt_arguments(&operation.prompts, answers)?);

    Ok(Some(ResolvedOperation { script, args }))
}

/// Append a resolved argument. Lists are flattened one level; `null` and
/// maps have no argv form and are dropped with a warning.
fn push_scalars(out: &mut Vec<String>, value: Value, operation: &OperationSpec) {
    match value {
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Array(_) | Value::Object(_) | Value::Null => {
                        warn!(operation = %operation.display_name(), "skipping non-scalar list item in args");
                    }
                    scalar => out.push(value_to_string(&scalar)),
                }
            }
        }
        Value::Object(_) | Value::Null => {
            warn!(operation = %operation.display_name(), "skipping non-scalar argument");
        }
        scalar => out.push(value_to_string(&scalar)),
    }
}
