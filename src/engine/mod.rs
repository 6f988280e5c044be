// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the operation dispatcher (`process` / embedded / `native` strategies
//!   and the `on_success` chain)
//! - the run-all sequencer
//! - the collaborator traits the dispatcher delegates to (tools, git,
//!   registry, embedded scripts, native toolkit)

pub mod collaborators;
pub mod dispatcher;
pub mod native;
pub mod sequencer;
pub mod toolkit;

pub use collaborators::{
    Collaborators, ConfigToolResolver, FileGameRegistry, GameRegistry, GitService,
    HostGitService, NativeActionRequest, NativeToolkit, NoScriptRuntime, ScriptAction,
    ScriptActionFactory, ToolResolver,
};
pub use dispatcher::OperationDispatcher;
pub use native::{check_provenance, run_native_action};
pub use sequencer::{RunAllProgress, RunAllSequencer, RunAllSummary};
pub use toolkit::{BuiltinToolkit, ValidationReport};
