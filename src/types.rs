// src/types.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Boxed, sendable future used at the trait seams that need dynamic dispatch.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Embedded scripting languages that run in-process through a
/// [`ScriptActionFactory`](crate::engine::ScriptActionFactory).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptLanguage {
    Lua,
    Js,
}

impl fmt::Display for ScriptLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptLanguage::Lua => f.write_str("lua"),
            ScriptLanguage::Js => f.write_str("js"),
        }
    }
}

/// How an operation is executed.
///
/// - `Process`: the script is handed to an external interpreter and supervised
///   by the process host (default when a catalog omits `script_type`).
/// - `Embedded`: the script runs inside an embedded runtime.
/// - `Native`: `script` names a built-in action id.
/// - `Unknown`: anything else. Kept rather than rejected at load time so the
///   dispatcher can report it per operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ScriptType {
    #[default]
    Process,
    Embedded(ScriptLanguage),
    Native,
    Unknown(String),
}

impl From<String> for ScriptType {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "process" | "python" | "py" => ScriptType::Process,
            "lua" => ScriptType::Embedded(ScriptLanguage::Lua),
            "js" | "javascript" => ScriptType::Embedded(ScriptLanguage::Js),
            "native" | "engine" | "internal" => ScriptType::Native,
            _ => ScriptType::Unknown(s),
        }
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptType::Process => f.write_str("process"),
            ScriptType::Embedded(lang) => write!(f, "{lang}"),
            ScriptType::Native => f.write_str("native"),
            ScriptType::Unknown(raw) => write!(f, "{raw}"),
        }
    }
}

/// Kind of interactive prompt declared by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Confirm,
    Checkbox,
    Text,
}

impl FromStr for PromptKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "confirm" => Ok(PromptKind::Confirm),
            "checkbox" => Ok(PromptKind::Checkbox),
            "text" => Ok(PromptKind::Text),
            other => Err(format!(
                "invalid prompt type: {other} (expected \"confirm\", \"checkbox\" or \"text\")"
            )),
        }
    }
}

/// Which child stream a line of output arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamSource {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamSource::Stdout => f.write_str("stdout"),
            StreamSource::Stderr => f.write_str("stderr"),
        }
    }
}

/// Built-in actions reachable from `script_type = "native"` operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeActionId {
    DownloadModuleGit,
    DownloadModuleRegistry,
    FormatExtract,
    FormatConvert,
    ValidateFiles,
    RenameFolders,
}

impl NativeActionId {
    pub fn as_str(&self) -> &'static str {
        match self {
            NativeActionId::DownloadModuleGit => "download_module_git",
            NativeActionId::DownloadModuleRegistry => "download_module_registry",
            NativeActionId::FormatExtract => "format_extract",
            NativeActionId::FormatConvert => "format_convert",
            NativeActionId::ValidateFiles => "validate_files",
            NativeActionId::RenameFolders => "rename_folders",
        }
    }
}

impl fmt::Display for NativeActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NativeActionId {
    type Err = String;

    /// Hyphenated and underscored spellings are equivalent
    /// (`format-extract` == `format_extract`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "download_module_git" | "git_download" => Ok(NativeActionId::DownloadModuleGit),
            "download_module_registry" | "registry_download" => {
                Ok(NativeActionId::DownloadModuleRegistry)
            }
            "format_extract" => Ok(NativeActionId::FormatExtract),
            "format_convert" => Ok(NativeActionId::FormatConvert),
            "validate_files" => Ok(NativeActionId::ValidateFiles),
            "rename_folders" => Ok(NativeActionId::RenameFolders),
            other => Err(format!("unknown native action id: {other}")),
        }
    }
}
