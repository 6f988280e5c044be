// src/exec/allow_list.rs

//! Which executables the host may start.
//!
//! Default-deny: only names registered here run. General-purpose file
//! manipulation utilities are refused outright, even when someone tries to
//! register them, and the refusal points at the sandboxed built-in actions.

use std::collections::BTreeSet;
use std::fmt;

use tracing::warn;

/// Interpreters and external tools shipped with or expected by modules.
pub const REGISTERED_TOOLS: &[&str] = &[
    "python",
    "python3",
    "py",
    "lua",
    "luajit",
    "node",
    "pwsh",
    "powershell",
    "dotnet",
    "git",
    "ffmpeg",
    "ffprobe",
    "vgmstream-cli",
    "quickbms",
    "7z",
    "7za",
    "7zz",
    "blender",
    "godot",
    "texconv",
    "magick",
];

/// Raw filesystem utilities that are never started.
pub const DENIED_UTILITIES: &[&str] = &[
    "rm", "rmdir", "rd", "del", "erase", "unlink", "mv", "move", "ren", "rename", "cp", "copy",
    "xcopy", "robocopy", "dd", "chmod", "chown", "icacls", "takeown", "mkfs", "format", "shred",
    "truncate", "ln", "mklink",
];

const EXECUTABLE_SUFFIXES: &[&str] = &[".exe", ".cmd", ".bat", ".com"];

/// Why an executable was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    EmptyCommand,
    Denied { executable: String },
    NotRegistered { executable: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::EmptyCommand => f.write_str("refusing to run an empty command"),
            Rejection::Denied { executable } => write!(
                f,
                "'{executable}' is a raw filesystem utility and is not allowed; use a \
                 script_type = \"native\" operation (validate_files, rename_folders) instead"
            ),
            Rejection::NotRegistered { executable } => write!(
                f,
                "'{executable}' is not a registered tool; add it to [tools] or \
                 engine.extra_allowed_tools to allow it"
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutableAllowList {
    allowed: BTreeSet<String>,
}

impl Default for ExecutableAllowList {
    fn default() -> Self {
        Self::empty().with_tools(REGISTERED_TOOLS.iter().copied())
    }
}

impl ExecutableAllowList {
    /// An allow-list that refuses everything.
    pub fn empty() -> Self {
        Self {
            allowed: BTreeSet::new(),
        }
    }

    /// Register one executable by name or path. Denied utilities are ignored.
    pub fn allow(mut self, executable: &str) -> Self {
        let name = normalize(executable);
        if name.is_empty() {
            return self;
        }
        if is_denied(&name) {
            warn!(executable, "refusing to register a denied filesystem utility");
            return self;
        }
        self.allowed.insert(name);
        self
    }

    pub fn with_tools<I, S>(self, executables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        executables
            .into_iter()
            .fold(self, |list, exe| list.allow(exe.as_ref()))
    }

    pub fn is_allowed(&self, executable: &str) -> bool {
        self.check(executable).is_ok()
    }

    pub fn check(&self, executable: &str) -> Result<(), Rejection> {
        let name = normalize(executable);
        if name.is_empty() {
            return Err(Rejection::EmptyCommand);
        }
        if is_denied(&name) {
            return Err(Rejection::Denied {
                executable: executable.to_string(),
            });
        }
        if !self.allowed.contains(&name) {
            return Err(Rejection::NotRegistered {
                executable: executable.to_string(),
            });
        }
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }
}

fn is_denied(name: &str) -> bool {
    DENIED_UTILITIES.contains(&name)
}

/// Lowercased basename with any Windows executable suffix removed.
///
/// Both separators are honoured so a Windows path is judged the same way on
/// every host.
pub fn normalize(executable: &str) -> String {
    let base = executable
        .trim()
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    EXECUTABLE_SUFFIXES
        .iter()
        .find_map(|suffix| base.strip_suffix(suffix))
        .map(str::to_string)
        .unwrap_or(base)
}
