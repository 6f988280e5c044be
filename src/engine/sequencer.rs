// src/engine/sequencer.rs

//! `run-all`: every eligible operation of a module, one after another.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::command::PromptAnswers;
use crate::config::{ModuleTable, OperationCatalog};
use crate::engine::dispatcher::OperationDispatcher;
use crate::exec::{ControlEvent, ExecutionIo};
use crate::progress::{ActiveJobs, JobOutcome, PanelCounters};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunAllSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Operations with `run_all = false`.
    pub skipped: usize,
    pub cancelled: bool,
}

impl RunAllSummary {
    pub fn is_success(&self) -> bool {
        !self.cancelled && self.failed == 0
    }
}

/// Shared state a progress panel can poll while the sequence runs.
#[derive(Debug, Clone, Default)]
pub struct RunAllProgress {
    pub counters: Arc<PanelCounters>,
    pub jobs: ActiveJobs,
}

pub struct RunAllSequencer<'d> {
    dispatcher: &'d OperationDispatcher,
    progress: Option<RunAllProgress>,
}

impl<'d> RunAllSequencer<'d> {
    pub fn new(dispatcher: &'d OperationDispatcher) -> Self {
        Self {
            dispatcher,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: RunAllProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run the catalog in order. A failure does not stop the sequence;
    /// cancellation does.
    pub async fn run(
        &self,
        module_id: &str,
        modules: &ModuleTable,
        catalog: &OperationCatalog,
        answers: &mut PromptAnswers,
        io: &mut ExecutionIo<'_>,
    ) -> RunAllSummary {
        let mut summary = RunAllSummary {
            skipped: catalog.operations().iter().filter(|op| !op.run_all).count(),
            ..RunAllSummary::default()
        };
        let eligible: Vec<_> = catalog.operations().iter().filter(|op| op.run_all).collect();

        info!(module = %module_id, total = eligible.len(), skipped = summary.skipped, "run-all starting");
        io.sink.on_event(ControlEvent::RunAllStart {
            module: module_id.to_string(),
            total: eligible.len(),
        });
        if let Some(progress) = &self.progress {
            for _ in 0..summary.skipped {
                progress.counters.record(JobOutcome::Skipped);
            }
        }

        for (index, operation) in eligible.into_iter().enumerate() {
            if io.is_cancelled() {
                summary.cancelled = true;
                break;
            }

            let name = operation.display_name().to_string();
            io.sink.on_event(ControlEvent::RunAllOperationStart {
                index,
                name: name.clone(),
            });

            let guard = self
                .progress
                .as_ref()
                .map(|progress| progress.jobs.begin(module_id, name.clone()));
            let success = self
                .dispatcher
                .run_operation(module_id, modules, operation, answers, io)
                .await;
            drop(guard);

            io.sink.on_event(ControlEvent::RunAllOperationEnd {
                index,
                name: name.clone(),
                success,
            });

            if io.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            if success {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
                info!(module = %module_id, operation = %name, "operation failed; continuing");
            }
            if let Some(progress) = &self.progress {
                progress.counters.record(if success {
                    JobOutcome::Ok
                } else {
                    JobOutcome::Failed
                });
            }
        }

        info!(module = %module_id, ?summary, "run-all finished");
        io.sink.on_event(ControlEvent::RunAllComplete {
            succeeded: summary.succeeded,
            failed: summary.failed,
            skipped: summary.skipped,
            cancelled: summary.cancelled,
        });
        summary
    }
}
