// src/engine/collaborators.rs

//! Services the dispatcher delegates to.
//!
//! Each one is a trait so embedders (and tests) can plug in their own; the
//! defaults here cover a plain on-disk registry and `git` through the
//! process host.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{EngineConfig, ModuleInfo, ModuleTable, find_catalog};
use crate::engine::toolkit::BuiltinToolkit;
use crate::exec::{EventSink, ExecutionIo, ProcessBackend, ProcessRequest};
use crate::types::{BoxFuture, ScriptLanguage};

pub trait ToolResolver: Send + Sync {
    fn resolve_tool_path(&self, tool_id: &str) -> Option<PathBuf>;
}

/// Resolves tool ids through the `[tools]` table of `remake.toml`.
#[derive(Debug, Clone, Default)]
pub struct ConfigToolResolver {
    tools: BTreeMap<String, PathBuf>,
}

impl ConfigToolResolver {
    pub fn new(tools: BTreeMap<String, PathBuf>) -> Self {
        Self { tools }
    }
}

impl ToolResolver for ConfigToolResolver {
    fn resolve_tool_path(&self, tool_id: &str) -> Option<PathBuf> {
        self.tools.get(tool_id).cloned()
    }
}

pub trait GitService: Send + Sync {
    fn clone_module<'a>(
        &'a self,
        url: &'a str,
        destination: &'a Path,
        io: &'a mut ExecutionIo<'_>,
    ) -> BoxFuture<'a, bool>;

    /// Fast-forward an existing checkout.
    fn update<'a>(&'a self, checkout: &'a Path, io: &'a mut ExecutionIo<'_>) -> BoxFuture<'a, bool>;
}

/// Runs `git` through a process backend so output, cancellation and the
/// allow-list apply as for any other operation.
#[derive(Clone)]
pub struct HostGitService {
    backend: Arc<dyn ProcessBackend>,
}

impl HostGitService {
    pub fn new(backend: Arc<dyn ProcessBackend>) -> Self {
        Self { backend }
    }
}

impl GitService for HostGitService {
    fn clone_module<'a>(
        &'a self,
        url: &'a str,
        destination: &'a Path,
        io: &'a mut ExecutionIo<'_>,
    ) -> BoxFuture<'a, bool> {
        let argv = vec![
            "git".to_string(),
            "clone".to_string(),
            "--depth".to_string(),
            "1".to_string(),
            url.to_string(),
            destination.to_string_lossy().into_owned(),
        ];
        let request = ProcessRequest::new(argv, format!("git clone {url}"));
        self.backend.execute(request, io)
    }

    fn update<'a>(&'a self, checkout: &'a Path, io: &'a mut ExecutionIo<'_>) -> BoxFuture<'a, bool> {
        let argv = vec![
            "git".to_string(),
            "-C".to_string(),
            checkout.to_string_lossy().into_owned(),
            "pull".to_string(),
            "--ff-only".to_string(),
        ];
        let request = ProcessRequest::new(argv, format!("git pull {}", checkout.display()));
        self.backend.execute(request, io)
    }
}

pub trait GameRegistry: Send + Sync {
    fn registered_modules(&self) -> ModuleTable;

    fn module_url(&self, module_id: &str) -> Option<String>;

    /// Where a module with this id lives (or would be installed).
    fn module_root(&self, module_id: &str) -> PathBuf;

    fn registry_root(&self) -> PathBuf;
}

/// Optional `<registry_root>/modules.toml`:
///
/// ```toml
/// [modules.quake]
/// name = "Quake"
/// url = "https://example.invalid/quake-module.git"
/// ```
#[derive(Debug, Default, Deserialize)]
struct ModuleIndex {
    #[serde(default)]
    modules: BTreeMap<String, ModuleIndexEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct ModuleIndexEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

pub const MODULE_INDEX_FILE: &str = "modules.toml";
pub const GAMES_DIR: &str = "Games";

/// Registry backed by `<registry_root>/Games/<id>/` directories.
#[derive(Debug, Clone)]
pub struct FileGameRegistry {
    registry_root: PathBuf,
}

impl FileGameRegistry {
    pub fn new(registry_root: impl Into<PathBuf>) -> Self {
        Self {
            registry_root: registry_root.into(),
        }
    }

    pub fn games_dir(&self) -> PathBuf {
        self.registry_root.join(GAMES_DIR)
    }

    fn index(&self) -> ModuleIndex {
        let path = self.registry_root.join(MODULE_INDEX_FILE);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return ModuleIndex::default(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read module index");
                return ModuleIndex::default();
            }
        };
        toml::from_str(&contents).unwrap_or_else(|e| {
            warn!(path = %path.display(), error = %e, "malformed module index; ignoring");
            ModuleIndex::default()
        })
    }
}

impl GameRegistry for FileGameRegistry {
    fn registered_modules(&self) -> ModuleTable {
        let index = self.index();
        let mut modules = ModuleTable::new();

        let entries = match fs::read_dir(self.games_dir()) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(dir = %self.games_dir().display(), error = %e, "no games directory");
                return modules;
            }
        };

        for entry in entries.flatten() {
            let root = entry.path();
            if !root.is_dir() || find_catalog(&root).is_none() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            let mut info = ModuleInfo::new(id.clone(), root);
            if let Some(meta) = index.modules.get(&id) {
                if let Some(name) = &meta.name {
                    info.name = name.clone();
                }
                info.url = meta.url.clone();
            }
            modules.insert(id, info);
        }
        modules
    }

    fn module_url(&self, module_id: &str) -> Option<String> {
        self.index()
            .modules
            .remove(module_id)
            .and_then(|entry| entry.url)
    }

    fn module_root(&self, module_id: &str) -> PathBuf {
        self.games_dir().join(module_id)
    }

    fn registry_root(&self) -> PathBuf {
        self.registry_root.clone()
    }
}

/// An in-process script (Lua, JS) ready to run.
pub trait ScriptAction: Send {
    fn execute<'a>(
        &'a mut self,
        tools: &'a dyn ToolResolver,
        cancel: CancellationToken,
    ) -> BoxFuture<'a, anyhow::Result<()>>;
}

pub trait ScriptActionFactory: Send + Sync {
    /// `None` when no runtime for `language` is available.
    fn try_create(
        &self,
        language: ScriptLanguage,
        script: &str,
        args: &[String],
        module_id: &str,
        modules: &ModuleTable,
        project_root: &Path,
    ) -> Option<Box<dyn ScriptAction>>;
}

/// Factory for builds without an embedded scripting runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoScriptRuntime;

impl ScriptActionFactory for NoScriptRuntime {
    fn try_create(
        &self,
        language: ScriptLanguage,
        script: &str,
        _args: &[String],
        _module_id: &str,
        _modules: &ModuleTable,
        _project_root: &Path,
    ) -> Option<Box<dyn ScriptAction>> {
        debug!(%language, script, "no embedded runtime available");
        None
    }
}

/// Inputs shared by every native toolkit action.
#[derive(Debug, Clone, Copy)]
pub struct NativeActionRequest<'a> {
    pub module_id: &'a str,
    pub module_root: &'a Path,
    pub args: &'a [String],
}

/// File-format and filesystem actions available to `native` operations.
pub trait NativeToolkit: Send + Sync {
    fn format_extract<'a>(
        &'a self,
        request: NativeActionRequest<'a>,
        sink: &'a mut dyn EventSink,
    ) -> BoxFuture<'a, anyhow::Result<bool>>;

    fn format_convert<'a>(
        &'a self,
        request: NativeActionRequest<'a>,
        sink: &'a mut dyn EventSink,
    ) -> BoxFuture<'a, anyhow::Result<bool>>;

    fn validate_files<'a>(
        &'a self,
        request: NativeActionRequest<'a>,
        sink: &'a mut dyn EventSink,
    ) -> BoxFuture<'a, anyhow::Result<bool>>;

    fn rename_folders<'a>(
        &'a self,
        request: NativeActionRequest<'a>,
        sink: &'a mut dyn EventSink,
    ) -> BoxFuture<'a, anyhow::Result<bool>>;
}

/// Everything the dispatcher delegates to.
#[derive(Clone)]
pub struct Collaborators {
    pub tools: Arc<dyn ToolResolver>,
    pub git: Arc<dyn GitService>,
    pub registry: Arc<dyn GameRegistry>,
    pub scripts: Arc<dyn ScriptActionFactory>,
    pub toolkit: Arc<dyn NativeToolkit>,
}

impl Collaborators {
    /// Production wiring: config-driven tools, on-disk registry, `git`
    /// through `backend`, no embedded runtime, built-in toolkit.
    pub fn from_config(config: &EngineConfig, backend: Arc<dyn ProcessBackend>) -> Self {
        Self {
            tools: Arc::new(ConfigToolResolver::new(config.tools.clone())),
            git: Arc::new(HostGitService::new(backend)),
            registry: Arc::new(FileGameRegistry::new(config.settings.registry_root())),
            scripts: Arc::new(NoScriptRuntime),
            toolkit: Arc::new(BuiltinToolkit),
        }
    }

    pub fn with_scripts(mut self, scripts: Arc<dyn ScriptActionFactory>) -> Self {
        self.scripts = scripts;
        self
    }

    pub fn with_toolkit(mut self, toolkit: Arc<dyn NativeToolkit>) -> Self {
        self.toolkit = toolkit;
        self
    }

    pub fn with_git(mut self, git: Arc<dyn GitService>) -> Self {
        self.git = git;
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn GameRegistry>) -> Self {
        self.registry = registry;
        self
    }
}
