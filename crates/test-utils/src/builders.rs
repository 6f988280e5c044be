#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use remake_engine::config::{
    EngineConfig, ModuleInfo, ModuleTable, OperationSpec, PromptSpec,
};
use remake_engine::types::{PromptKind, ScriptType};
use serde_json::Value;

/// Builder for `OperationSpec` to simplify test setup.
pub struct OperationBuilder {
    op: OperationSpec,
}

impl OperationBuilder {
    /// `process` operation running `script`.
    pub fn process(script: &str) -> Self {
        Self {
            op: OperationSpec::new(ScriptType::Process, script),
        }
    }

    /// `native` operation for the given action id.
    pub fn native(action: &str) -> Self {
        Self {
            op: OperationSpec::new(ScriptType::Native, action),
        }
    }

    pub fn with_type(script_type: ScriptType, script: &str) -> Self {
        Self {
            op: OperationSpec::new(script_type, script),
        }
    }

    /// Operation without a script.
    pub fn empty() -> Self {
        let mut op = OperationSpec::new(ScriptType::Process, "");
        op.script = None;
        Self { op }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.op.name = Some(name.to_string());
        self
    }

    pub fn arg(mut self, arg: impl Into<Value>) -> Self {
        self.op.args.push(arg.into());
        self
    }

    pub fn prompt(mut self, prompt: PromptSpec) -> Self {
        self.op.prompts.push(prompt);
        self
    }

    pub fn on_success(mut self, child: OperationSpec) -> Self {
        self.op.on_success.push(child);
        self
    }

    pub fn run_all(mut self, include: bool) -> Self {
        self.op.run_all = include;
        self
    }

    pub fn source_file(mut self, path: &Path) -> Self {
        self.op.stamp_source(path);
        self
    }

    pub fn build(self) -> OperationSpec {
        self.op
    }
}

/// Builder for `PromptSpec`.
pub struct PromptBuilder {
    prompt: PromptSpec,
}

impl PromptBuilder {
    pub fn new(name: &str, kind: PromptKind) -> Self {
        Self {
            prompt: PromptSpec {
                name: name.to_string(),
                kind,
                message: None,
                cli_flag: None,
                cli_prefix: None,
                condition: None,
                default: None,
                choices: Vec::new(),
            },
        }
    }

    pub fn confirm(name: &str) -> Self {
        Self::new(name, PromptKind::Confirm)
    }

    pub fn checkbox(name: &str) -> Self {
        Self::new(name, PromptKind::Checkbox)
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, PromptKind::Text)
    }

    pub fn flag(mut self, flag: &str) -> Self {
        self.prompt.cli_flag = Some(flag.to_string());
        self
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prompt.cli_prefix = Some(prefix.to_string());
        self
    }

    pub fn condition(mut self, condition: &str) -> Self {
        self.prompt.condition = Some(condition.to_string());
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.prompt.default = Some(value.into());
        self
    }

    pub fn build(self) -> PromptSpec {
        self.prompt
    }
}

/// Single-module table rooted at `root`.
pub fn module_table(id: &str, root: &Path) -> ModuleTable {
    let mut modules = ModuleTable::new();
    modules.insert(id.to_string(), ModuleInfo::new(id, root));
    modules
}

/// Engine config rooted at `project_root` with `python3` as interpreter.
pub fn engine_config(project_root: &Path) -> EngineConfig {
    let mut config = EngineConfig::with_project_root(project_root);
    config.settings.interpreter = Some("python3".to_string());
    config
}

/// On-disk layout `<project>/RemakeRegistry/Games/<id>/` with a catalog.
pub struct RegistryFixture {
    pub project_root: PathBuf,
}

impl RegistryFixture {
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
        }
    }

    pub fn registry_root(&self) -> PathBuf {
        self.project_root.join("RemakeRegistry")
    }

    /// Create a module directory holding `operations.toml` with `catalog`.
    pub fn add_module(&self, id: &str, catalog: &str) -> PathBuf {
        let root = self.registry_root().join("Games").join(id);
        fs::create_dir_all(&root).expect("create module dir");
        fs::write(root.join("operations.toml"), catalog).expect("write catalog");
        root
    }

    pub fn write_module_index(&self, contents: &str) {
        fs::create_dir_all(self.registry_root()).expect("create registry");
        fs::write(self.registry_root().join("modules.toml"), contents).expect("write index");
    }
}
