// src/exec/protocol.rs

//! Line-oriented control protocol spoken by child processes.
//!
//! A child writes ordinary text on stdout/stderr. A line that starts with
//! [`CONTROL_PREFIX`] carries one JSON object tagged by `"event"`:
//!
//! ```text
//! @@REMAKE@@{"event":"progress","current":3,"total":10,"label":"textures"}
//! @@REMAKE@@{"event":"prompt","message":"Overwrite existing output? [y/N]"}
//! ```
//!
//! Anything that fails to decode is treated as plain output, so a child
//! can never break the host by printing garbage after the prefix.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::progress::PanelFrame;

/// Marker that turns an output line into a control event.
pub const CONTROL_PREFIX: &str = "@@REMAKE@@";

fn default_newline() -> bool {
    true
}

fn default_prompt_message() -> String {
    "Input required".to_string()
}

/// Structured events flowing from a child (or the engine) to the event sink.
///
/// The first group is what a child may emit. The `progress_panel_*` and
/// `run_all_*` kinds are produced by the engine itself; a child sending
/// them is treated as plain output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ControlEvent {
    Print {
        #[serde(default)]
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        color: Option<String>,
        #[serde(default = "default_newline")]
        newline: bool,
    },
    Warning {
        #[serde(default)]
        message: String,
    },
    Error {
        #[serde(default)]
        message: String,
    },
    /// The child blocks on stdin until exactly one line is written back.
    Prompt {
        #[serde(default = "default_prompt_message")]
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    Progress {
        #[serde(default)]
        current: u64,
        #[serde(default)]
        total: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    Start {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        argv: Vec<String>,
    },
    End {
        #[serde(default)]
        success: bool,
        #[serde(default, alias = "exitCode")]
        exit_code: i32,
    },

    ProgressPanelStart {
        label: String,
        total: u64,
    },
    ProgressPanelUpdate {
        frame: PanelFrame,
    },
    ProgressPanelEnd {
        frame: PanelFrame,
    },
    RunAllStart {
        module: String,
        total: usize,
    },
    RunAllOperationStart {
        index: usize,
        name: String,
    },
    RunAllOperationEnd {
        index: usize,
        name: String,
        success: bool,
    },
    RunAllComplete {
        succeeded: usize,
        failed: usize,
        skipped: usize,
        cancelled: bool,
    },

    /// Any `event` value this build does not know about.
    #[serde(other)]
    Unknown,
}

impl ControlEvent {
    /// Whether a child process is allowed to emit this kind.
    pub fn is_child_event(&self) -> bool {
        matches!(
            self,
            ControlEvent::Print { .. }
                | ControlEvent::Warning { .. }
                | ControlEvent::Error { .. }
                | ControlEvent::Prompt { .. }
                | ControlEvent::Progress { .. }
                | ControlEvent::Start { .. }
                | ControlEvent::End { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ControlEvent::Print { .. } => "print",
            ControlEvent::Warning { .. } => "warning",
            ControlEvent::Error { .. } => "error",
            ControlEvent::Prompt { .. } => "prompt",
            ControlEvent::Progress { .. } => "progress",
            ControlEvent::Start { .. } => "start",
            ControlEvent::End { .. } => "end",
            ControlEvent::ProgressPanelStart { .. } => "progress_panel_start",
            ControlEvent::ProgressPanelUpdate { .. } => "progress_panel_update",
            ControlEvent::ProgressPanelEnd { .. } => "progress_panel_end",
            ControlEvent::RunAllStart { .. } => "run_all_start",
            ControlEvent::RunAllOperationStart { .. } => "run_all_operation_start",
            ControlEvent::RunAllOperationEnd { .. } => "run_all_operation_end",
            ControlEvent::RunAllComplete { .. } => "run_all_complete",
            ControlEvent::Unknown => "unknown",
        }
    }
}

/// Result of classifying one output line.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedLine {
    Plain(String),
    Event(ControlEvent),
}

/// Classify a single line (already stripped of its line terminator).
pub fn decode_line(line: String) -> DecodedLine {
    let Some(payload) = line.strip_prefix(CONTROL_PREFIX) else {
        return DecodedLine::Plain(line);
    };

    match serde_json::from_str::<ControlEvent>(payload.trim()) {
        Ok(event) if event.is_child_event() => DecodedLine::Event(event),
        Ok(event) => {
            debug!(kind = event.kind(), "control line with unsupported event kind; treating as text");
            DecodedLine::Plain(line)
        }
        Err(e) => {
            debug!(error = %e, "undecodable control line; treating as text");
            DecodedLine::Plain(line)
        }
    }
}

/// Render an event as a control line (without the trailing newline).
pub fn encode_event(event: &ControlEvent) -> serde_json::Result<String> {
    Ok(format!("{CONTROL_PREFIX}{}", serde_json::to_string(event)?))
}
