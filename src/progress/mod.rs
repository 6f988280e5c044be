// src/progress/mod.rs

//! Live progress panel for work that fans out over many files.
//!
//! Workers bump [`PanelCounters`] and hold a [`JobGuard`] while busy; the
//! panel task polls both and hands frames to a [`PanelSink`].

pub mod jobs;
pub mod panel;
pub mod render;
pub mod sinks;

pub use jobs::{ActiveJob, ActiveJobs, JobGuard, JobOutcome, PanelCounters, PanelStats};
pub use panel::{TICK_INTERVAL, start_panel};
pub use render::{JobRow, PanelFrame, render_bar, render_frame, spinner_frame, truncate_file_name};
pub use sinks::{EventPanelSink, PanelSink, TerminalPanel};
