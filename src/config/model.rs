// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::types::{PromptKind, ScriptType};

/// One declarative unit of work from a module's catalog.
///
/// ```toml
/// [[operations]]
/// name = "Extract archives"
/// script = "{{Game_Root}}/scripts/extract.py"
/// args = ["--src", "{{Game.RootPath}}/Source"]
///
/// [[operations.prompts]]
/// name = "verbose"
/// type = "confirm"
/// cli_flag = "--verbose"
///
/// [[operations.on_success]]
/// script_type = "native"
/// script = "validate_files"
/// args = ["GameFiles/**/*.pak"]
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct OperationSpec {
    #[serde(default, alias = "Name")]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Missing means `process`.
    #[serde(default, alias = "scriptType")]
    pub script_type: ScriptType,

    /// Script path, or the action id for native operations.
    #[serde(default)]
    pub script: Option<String>,

    /// Template values resolved against the execution context.
    #[serde(default)]
    pub args: Vec<Value>,

    #[serde(default)]
    pub prompts: Vec<PromptSpec>,

    /// Follow-ups run after this operation succeeds. Accepts either a single
    /// table or a list.
    #[serde(
        default,
        rename = "on_success",
        alias = "onsuccess",
        alias = "onSuccess",
        deserialize_with = "one_or_many"
    )]
    pub on_success: Vec<OperationSpec>,

    /// Whether `run-all` includes this operation.
    #[serde(default = "default_run_all")]
    pub run_all: bool,

    /// Catalog file this record was loaded from. Stamped by the loader; used
    /// by the native-action provenance check.
    #[serde(skip)]
    pub source_file: Option<PathBuf>,
}

fn default_run_all() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<OperationSpec>),
    One(Box<OperationSpec>),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<OperationSpec>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(ops) => ops,
        OneOrMany::One(op) => vec![*op],
    })
}

impl OperationSpec {
    /// Minimal operation with only a script set; everything else defaulted.
    pub fn new(script_type: ScriptType, script: impl Into<String>) -> Self {
        Self {
            name: None,
            description: None,
            script_type,
            script: Some(script.into()),
            args: Vec::new(),
            prompts: Vec::new(),
            on_success: Vec::new(),
            run_all: true,
            source_file: None,
        }
    }

    /// Human-readable label for logs and events.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.script.as_deref())
            .unwrap_or("<unnamed operation>")
    }

    /// Stamp `source_file` on this operation and every nested follow-up.
    pub fn stamp_source(&mut self, path: &Path) {
        self.source_file = Some(path.to_path_buf());
        for child in self.on_success.iter_mut() {
            child.stamp_source(path);
        }
    }
}

/// `[[operations.prompts]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: PromptKind,

    #[serde(default)]
    pub message: Option<String>,

    /// Flag emitted for `confirm`, and paired with the value for `text`.
    #[serde(default, alias = "cliFlag", alias = "cli_arg")]
    pub cli_flag: Option<String>,

    /// Flag emitted before the selected items of a `checkbox`.
    #[serde(default, alias = "cliPrefix")]
    pub cli_prefix: Option<String>,

    /// Name of a prior boolean answer gating this prompt.
    #[serde(default)]
    pub condition: Option<String>,

    #[serde(default)]
    pub default: Option<Value>,

    #[serde(default)]
    pub choices: Vec<String>,
}

impl PromptSpec {
    /// Value recorded for a prompt whose condition is false.
    pub fn empty_value(&self) -> Value {
        match self.kind {
            PromptKind::Confirm => Value::Bool(false),
            PromptKind::Checkbox => Value::Array(Vec::new()),
            PromptKind::Text => Value::String(String::new()),
        }
    }
}

/// Raw catalog file as deserialized, before validation.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawCatalog {
    #[serde(default)]
    pub operations: Vec<OperationSpec>,
}

/// Validated operation catalog for one module.
#[derive(Debug, Clone)]
pub struct OperationCatalog {
    operations: Vec<OperationSpec>,
}

impl OperationCatalog {
    /// Build without validation. Use `OperationCatalog::try_from(raw)` for
    /// untrusted input.
    pub fn new_unchecked(operations: Vec<OperationSpec>) -> Self {
        Self { operations }
    }

    pub fn operations(&self) -> &[OperationSpec] {
        &self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Look up an operation by name, falling back to its script.
    pub fn find(&self, name: &str) -> Option<&OperationSpec> {
        self.operations
            .iter()
            .find(|op| op.name.as_deref() == Some(name))
            .or_else(|| {
                self.operations
                    .iter()
                    .find(|op| op.script.as_deref() == Some(name))
            })
    }
}

/// A game/asset module known to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub id: String,
    pub name: String,
    pub root: PathBuf,
    pub url: Option<String>,
}

impl ModuleInfo {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            root: root.into(),
            url: None,
        }
    }
}

/// Module id → module metadata.
pub type ModuleTable = BTreeMap<String, ModuleInfo>;

/// `[engine]` section of `remake.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSettings {
    #[serde(default = "default_project_root")]
    pub project_root: PathBuf,

    /// Defaults to `<project_root>/RemakeRegistry`.
    #[serde(default)]
    pub registry_root: Option<PathBuf>,

    /// Interpreter used for `process` operations.
    #[serde(default)]
    pub interpreter: Option<String>,

    /// Additional executables the process host may spawn.
    #[serde(default)]
    pub extra_allowed_tools: Vec<String>,

    /// Directories native-action operations must be loaded from. Defaults to
    /// the registry root and `<project_root>/EngineApps`.
    #[serde(default)]
    pub trusted_operation_roots: Vec<PathBuf>,

    /// Capacity of the per-process output queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Deepest `on_success` nesting the dispatcher will follow.
    #[serde(default = "default_max_chain_depth")]
    pub max_chain_depth: usize,
}

fn default_project_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_queue_capacity() -> usize {
    1000
}

fn default_max_chain_depth() -> usize {
    32
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            project_root: default_project_root(),
            registry_root: None,
            interpreter: None,
            extra_allowed_tools: Vec::new(),
            trusted_operation_roots: Vec::new(),
            queue_capacity: default_queue_capacity(),
            max_chain_depth: default_max_chain_depth(),
        }
    }
}

impl EngineSettings {
    pub fn registry_root(&self) -> PathBuf {
        self.registry_root
            .clone()
            .unwrap_or_else(|| self.project_root.join("RemakeRegistry"))
    }

    /// Interpreter for `process` operations: configured value, else
    /// `python` on Windows and `python3` elsewhere.
    pub fn interpreter(&self) -> String {
        match &self.interpreter {
            Some(interp) if !interp.trim().is_empty() => interp.clone(),
            _ if cfg!(windows) => "python".to_string(),
            _ => "python3".to_string(),
        }
    }

    pub fn trusted_roots(&self) -> Vec<PathBuf> {
        if !self.trusted_operation_roots.is_empty() {
            return self.trusted_operation_roots.clone();
        }
        vec![self.registry_root(), self.project_root.join("EngineApps")]
    }
}

/// Raw `remake.toml` as deserialized.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawEngineConfig {
    #[serde(default)]
    pub engine: EngineSettings,

    /// Tool id → executable path.
    #[serde(default)]
    pub tools: BTreeMap<String, PathBuf>,

    /// Free-form values seeded into every execution context.
    #[serde(default)]
    pub placeholders: Map<String, Value>,
}

/// Validated engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub settings: EngineSettings,
    pub tools: BTreeMap<String, PathBuf>,
    pub placeholders: Map<String, Value>,
}

impl EngineConfig {
    pub fn new_unchecked(
        settings: EngineSettings,
        tools: BTreeMap<String, PathBuf>,
        placeholders: Map<String, Value>,
    ) -> Self {
        Self {
            settings,
            tools,
            placeholders,
        }
    }

    /// Convenience for tests and embedders: defaults rooted at `project_root`.
    pub fn with_project_root(project_root: impl Into<PathBuf>) -> Self {
        Self {
            settings: EngineSettings {
                project_root: project_root.into(),
                ..EngineSettings::default()
            },
            ..Self::default()
        }
    }
}
