// src/engine/dispatcher.rs

//! Runs one operation and its `on_success` chain.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::command::{PromptAnswers, ResolvedOperation, build_with_context, resolve_operation};
use crate::config::{EngineConfig, ModuleTable, OperationSpec};
use crate::context::ExecutionContext;
use crate::engine::collaborators::Collaborators;
use crate::engine::native::{check_provenance, run_native_action};
use crate::errors::{EngineError, Result};
use crate::exec::{CANCELLED_EXIT_CODE, ExecutionIo, ProcessBackend, ProcessRequest};
use crate::types::{NativeActionId, ScriptLanguage, ScriptType};

/// Executes operations by `script_type`: `process` through the backend,
/// embedded languages through the script factory, `native` through the
/// built-in action switch.
#[derive(Clone)]
pub struct OperationDispatcher {
    backend: Arc<dyn ProcessBackend>,
    config: Arc<EngineConfig>,
    collaborators: Collaborators,
}

impl OperationDispatcher {
    pub fn new(
        backend: Arc<dyn ProcessBackend>,
        config: Arc<EngineConfig>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            backend,
            config,
            collaborators,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Run `operation` and, on success, its follow-ups depth-first.
    ///
    /// - A failed entry skips its own children; siblings still run and the
    ///   overall result becomes `false`.
    /// - Cancellation stops the chain at once.
    /// - Entries deeper than `max_chain_depth` are refused as failures.
    ///
    /// Never returns an error: problems are reported to the sink.
    pub async fn run_operation(
        &self,
        module_id: &str,
        modules: &ModuleTable,
        operation: &OperationSpec,
        answers: &mut PromptAnswers,
        io: &mut ExecutionIo<'_>,
    ) -> bool {
        let context = match ExecutionContext::build(module_id, modules, &self.config) {
            Ok(context) => context,
            Err(err) => {
                error!(module = %module_id, operation = %operation.display_name(), error = %err, "cannot build execution context");
                io.sink.error(err.to_string());
                return false;
            }
        };

        let max_depth = self.config.settings.max_chain_depth;
        let mut overall = true;
        let mut worklist: Vec<(&OperationSpec, usize)> = vec![(operation, 0)];

        while let Some((op, depth)) = worklist.pop() {
            if io.is_cancelled() {
                report_abandoned(op, worklist.len() + 1, io);
                return false;
            }
            if depth > max_depth {
                warn!(operation = %op.display_name(), depth, max_depth, "chain too deep");
                io.sink.error(format!(
                    "refusing '{}': on_success chain deeper than {max_depth}",
                    op.display_name()
                ));
                overall = false;
                continue;
            }

            let ok = self.run_single(module_id, modules, &context, op, answers, io).await;
            if io.is_cancelled() {
                let pending = worklist.len() + if ok { op.on_success.len() } else { 0 };
                if pending > 0 {
                    report_abandoned(op, pending, io);
                }
                return false;
            }

            if ok {
                for child in op.on_success.iter().rev() {
                    worklist.push((child, depth + 1));
                }
            } else {
                debug!(operation = %op.display_name(), skipped = op.on_success.len(), "failed; skipping its follow-ups");
                overall = false;
            }
        }
        overall
    }

    async fn run_single(
        &self,
        module_id: &str,
        modules: &ModuleTable,
        context: &ExecutionContext,
        operation: &OperationSpec,
        answers: &mut PromptAnswers,
        io: &mut ExecutionIo<'_>,
    ) -> bool {
        info!(module = %module_id, operation = %operation.display_name(), script_type = %operation.script_type, "dispatching operation");
        match self.dispatch(module_id, modules, context, operation, answers, io).await {
            Ok(ok) => ok,
            Err(err) => {
                error!(operation = %operation.display_name(), error = %err, "operation failed");
                io.sink.error(format!("{}: {err}", operation.display_name()));
                false
            }
        }
    }

    async fn dispatch(
        &self,
        module_id: &str,
        modules: &ModuleTable,
        context: &ExecutionContext,
        operation: &OperationSpec,
        answers: &mut PromptAnswers,
        io: &mut ExecutionIo<'_>,
    ) -> Result<bool> {
        match &operation.script_type {
            ScriptType::Process => {
                let argv = build_with_context(context, &self.config, operation, answers)?;
                if argv.is_empty() {
                    return Err(missing_script(operation));
                }
                let request = ProcessRequest::new(argv, operation.display_name());
                Ok(self.backend.execute(request, io).await)
            }
            ScriptType::Embedded(language) => {
                let resolved = resolve_operation(context, operation, answers)?
                    .ok_or_else(|| missing_script(operation))?;
                self.run_embedded(*language, resolved, module_id, modules, io).await
            }
            ScriptType::Native => {
                check_provenance(operation, &self.config.settings.trusted_roots())?;
                let resolved = resolve_operation(context, operation, answers)?
                    .ok_or_else(|| missing_script(operation))?;
                let action = resolved
                    .script
                    .parse::<NativeActionId>()
                    .map_err(EngineError::InvalidInput)?;
                let module = modules
                    .get(module_id)
                    .ok_or_else(|| EngineError::ModuleNotFound(module_id.to_string()))?;
                run_native_action(action, module, &resolved.args, &self.collaborators, io).await
            }
            ScriptType::Unknown(kind) => Err(EngineError::InvalidInput(format!(
                "unknown script_type '{kind}'"
            ))),
        }
    }

    async fn run_embedded(
        &self,
        language: ScriptLanguage,
        resolved: ResolvedOperation,
        module_id: &str,
        modules: &ModuleTable,
        io: &mut ExecutionIo<'_>,
    ) -> Result<bool> {
        let Some(mut action) = self.collaborators.scripts.try_create(
            language,
            &resolved.script,
            &resolved.args,
            module_id,
            modules,
            &self.config.settings.project_root,
        ) else {
            warn!(%language, script = %resolved.script, "no embedded runtime");
            io.sink.error(format!(
                "no {language} runtime is available to run '{}'",
                resolved.script
            ));
            return Ok(false);
        };

        match action
            .execute(self.collaborators.tools.as_ref(), io.cancel.clone())
            .await
        {
            Ok(()) => Ok(true),
            Err(err) => {
                warn!(%language, script = %resolved.script, error = %err, "embedded script failed");
                io.sink.error(format!("{}: {err:#}", resolved.script));
                Ok(false)
            }
        }
    }
}

fn missing_script(operation: &OperationSpec) -> EngineError {
    EngineError::InvalidInput(format!(
        "operation '{}' has no script",
        operation.display_name()
    ))
}

/// Cancellation left `pending` chain entries unrun.
fn report_abandoned(op: &OperationSpec, pending: usize, io: &mut ExecutionIo<'_>) {
    info!(operation = %op.display_name(), pending, "cancelled; abandoning chain");
    io.sink.warning(format!(
        "cancelled: {pending} remaining operation(s) not run (exit code {CANCELLED_EXIT_CODE})"
    ));
}
