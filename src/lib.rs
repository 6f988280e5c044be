// src/lib.rs

pub mod cli;
pub mod command;
pub mod config;
pub mod console;
pub mod context;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod progress;
pub mod types;

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::{AnswerArgs, CliArgs, Command};
use crate::command::{PromptAnswers, coerce_answer};
use crate::config::{
    EngineConfig, ModuleTable, OperationCatalog, OperationSpec, PromptSpec, find_catalog,
    load_catalog, load_engine_config,
};
use crate::console::{ConsoleSink, TerminalResponder, collect_answers};
use crate::engine::{
    Collaborators, FileGameRegistry, GameRegistry, OperationDispatcher, RunAllProgress,
    RunAllSequencer,
};
use crate::exec::{
    CANCELLED_EXIT_CODE, ExecutableAllowList, ExecutionIo, HostOptions, ProcessBackend,
    ProcessHost, PromptResponder, QueuedResponder,
};
use crate::progress::{TerminalPanel, start_panel};

/// Allow-list for a configuration: the registered defaults, the configured
/// interpreter, every `[tools]` entry (by id and by file name) and
/// `extra_allowed_tools`.
pub fn build_allow_list(config: &EngineConfig) -> ExecutableAllowList {
    let tool_files = config
        .tools
        .values()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned());

    ExecutableAllowList::default()
        .allow(&config.settings.interpreter())
        .with_tools(config.tools.keys())
        .with_tools(tool_files)
        .with_tools(&config.settings.extra_allowed_tools)
}

/// Production wiring of host, collaborators and dispatcher.
pub fn build_dispatcher(config: Arc<EngineConfig>) -> OperationDispatcher {
    let options = HostOptions {
        queue_capacity: config.settings.queue_capacity,
        ..HostOptions::default()
    };
    let backend: Arc<dyn ProcessBackend> =
        Arc::new(ProcessHost::new(build_allow_list(&config)).with_options(options));
    let collaborators = Collaborators::from_config(&config, Arc::clone(&backend));
    OperationDispatcher::new(backend, config, collaborators)
}

/// High-level entry point used by `main.rs`. Returns the process exit code.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config = Arc::new(load_config(Path::new(&args.config))?);
    let registry = FileGameRegistry::new(config.settings.registry_root());
    let modules = registry.registered_modules();
    debug!(modules = modules.len(), registry = %registry.games_dir().display(), "registry scanned");

    match args.command {
        Command::Modules => {
            print_modules(&modules);
            Ok(0)
        }
        Command::Ops { module } => {
            let catalog = module_catalog(&modules, &module)?;
            print_operations(&module, &catalog);
            Ok(0)
        }
        Command::Run {
            module,
            operation,
            answers,
        } => {
            let catalog = module_catalog(&modules, &module)?;
            let op = catalog.find(&operation).ok_or_else(|| {
                anyhow!("module '{module}' has no operation named '{operation}'")
            })?;
            let mut prompt_answers = gather_answers(op, &answers).await?;

            let dispatcher = build_dispatcher(Arc::clone(&config));
            let cancel = cancel_on_ctrl_c();
            let mut sink = ConsoleSink::new(io::stderr().is_terminal());
            let mut responder = responder_for(&answers);
            let mut exec_io = ExecutionIo::new(&mut sink, responder.as_mut(), cancel.clone());

            let ok = dispatcher
                .run_operation(&module, &modules, op, &mut prompt_answers, &mut exec_io)
                .await;
            Ok(exit_code(ok, &cancel))
        }
        Command::RunAll {
            module,
            answers,
            progress,
        } => {
            let catalog = module_catalog(&modules, &module)?;
            let mut prompt_answers = PromptAnswers::new();
            for op in catalog.operations().iter().filter(|op| op.run_all) {
                let more = gather_answers(op, &answers).await?;
                for (name, value) in more.iter() {
                    prompt_answers.set(name.clone(), value.clone());
                }
            }

            let dispatcher = build_dispatcher(Arc::clone(&config));
            let cancel = cancel_on_ctrl_c();
            let mut sink = ConsoleSink::new(io::stderr().is_terminal());
            let mut responder = responder_for(&answers);
            let mut exec_io = ExecutionIo::new(&mut sink, responder.as_mut(), cancel.clone());

            let mut sequencer = RunAllSequencer::new(&dispatcher);
            let panel = if progress {
                let state = RunAllProgress::default();
                sequencer = sequencer.with_progress(state.clone());
                let panel_cancel = cancel.child_token();
                let counters = Arc::clone(&state.counters);
                let jobs = state.jobs.clone();
                let handle = start_panel(
                    catalog.len() as u64,
                    move || counters.snapshot(),
                    move || jobs.snapshot(),
                    module.clone(),
                    TerminalPanel::stderr(),
                    panel_cancel.clone(),
                );
                Some((panel_cancel, handle))
            } else {
                None
            };

            let summary = sequencer
                .run(&module, &modules, &catalog, &mut prompt_answers, &mut exec_io)
                .await;

            if let Some((panel_cancel, handle)) = panel {
                panel_cancel.cancel();
                if let Err(e) = handle.await {
                    warn!(error = %e, "progress panel task failed");
                }
            }
            Ok(exit_code(summary.is_success(), &cancel))
        }
    }
}

fn load_config(path: &Path) -> Result<EngineConfig> {
    if path.is_file() {
        return load_engine_config(path)
            .with_context(|| format!("loading {}", path.display()));
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    info!(config = %path.display(), root = %cwd.display(), "no engine config; using defaults");
    Ok(EngineConfig::with_project_root(cwd))
}

fn module_catalog(modules: &ModuleTable, module_id: &str) -> Result<OperationCatalog> {
    let module = modules
        .get(module_id)
        .ok_or_else(|| anyhow!("unknown module '{module_id}'"))?;
    let path = find_catalog(&module.root)
        .ok_or_else(|| anyhow!("module '{module_id}' has no operations catalog"))?;
    load_catalog(&path).with_context(|| format!("loading {}", path.display()))
}

/// `--answer` values typed by the prompt they target, plus interactive
/// answers for everything else unless `--defaults` was given.
async fn gather_answers(operation: &OperationSpec, args: &AnswerArgs) -> Result<PromptAnswers> {
    let mut preset = PromptAnswers::new();
    for (name, raw) in &args.answers {
        let value = match find_prompt(operation, name) {
            Some(prompt) => coerce_answer(prompt.kind, raw),
            None => serde_json::Value::String(raw.clone()),
        };
        preset.set(name.clone(), value);
    }
    if args.defaults {
        return Ok(preset);
    }

    let operation = operation.clone();
    tokio::task::spawn_blocking(move || {
        let mut answers = preset.clone();
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stderr();
        collect_answers(&operation, &preset, &mut answers, &mut input, &mut output)?;
        Ok::<_, io::Error>(answers)
    })
    .await
    .context("prompt collection panicked")?
    .context("reading prompt answers")
}

fn find_prompt<'a>(operation: &'a OperationSpec, name: &str) -> Option<&'a PromptSpec> {
    operation
        .prompts
        .iter()
        .find(|prompt| prompt.name == name)
        .or_else(|| {
            operation
                .on_success
                .iter()
                .find_map(|child| find_prompt(child, name))
        })
}

fn responder_for(args: &AnswerArgs) -> Box<dyn PromptResponder> {
    if args.defaults {
        Box::new(QueuedResponder::default())
    } else {
        Box::new(TerminalResponder::new())
    }
}

/// Ctrl-C trips the returned token.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("Ctrl+C received; cancelling");
        token.cancel();
    });
    cancel
}

fn exit_code(ok: bool, cancel: &CancellationToken) -> i32 {
    if cancel.is_cancelled() {
        CANCELLED_EXIT_CODE
    } else if ok {
        0
    } else {
        1
    }
}

fn print_modules(modules: &ModuleTable) {
    if modules.is_empty() {
        println!("no modules registered");
        return;
    }
    for module in modules.values() {
        match &module.url {
            Some(url) => println!("{}  {}  ({url})", module.id, module.name),
            None => println!("{}  {}", module.id, module.name),
        }
    }
}

fn print_operations(module_id: &str, catalog: &OperationCatalog) {
    println!("{module_id}: {} operation(s)", catalog.len());
    for op in catalog.operations() {
        let flag = if op.run_all { "" } else { "  [not in run-all]" };
        println!("  - {} ({}){flag}", op.display_name(), op.script_type);
        if let Some(description) = &op.description {
            println!("      {description}");
        }
        if !op.on_success.is_empty() {
            println!("      on_success: {} follow-up(s)", op.on_success.len());
        }
    }
}
