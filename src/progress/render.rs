// src/progress/render.rs

//! Pure rendering of one panel frame.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::progress::jobs::{ActiveJob, PanelStats};

pub const BAR_WIDTH: usize = 30;
pub const FILE_NAME_WIDTH: usize = 40;
pub const SPINNER_FRAMES: [char; 4] = ['|', '/', '-', '\\'];
/// Spinner cell used for the final frame.
pub const BLANK_SPINNER: char = ' ';

/// A job as shown in one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRow {
    pub tool: String,
    pub file: String,
    pub elapsed_secs: u64,
}

/// Everything a presentation layer needs to draw the panel once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelFrame {
    pub label: String,
    pub total: u64,
    pub stats: PanelStats,
    pub percent: u64,
    pub spinner: char,
    pub jobs: Vec<JobRow>,
    /// Pre-rendered text: the header line followed by one line per job.
    pub lines: Vec<String>,
}

pub fn spinner_frame(tick: u64) -> char {
    SPINNER_FRAMES[(tick % SPINNER_FRAMES.len() as u64) as usize]
}

pub fn percent(done: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (done.saturating_mul(100) / total).min(100)
}

/// `#` for done cells, `.` for the rest; always `BAR_WIDTH` wide.
pub fn render_bar(done: u64, total: u64) -> String {
    let filled = if total == 0 {
        0
    } else {
        ((done.min(total) as u128 * BAR_WIDTH as u128) / total as u128) as usize
    };
    let mut bar = String::with_capacity(BAR_WIDTH);
    bar.extend(std::iter::repeat_n('#', filled));
    bar.extend(std::iter::repeat_n('.', BAR_WIDTH - filled));
    bar
}

/// Keep the tail of long names; the extension is the informative part.
pub fn truncate_file_name(name: &str, width: usize) -> String {
    let count = name.chars().count();
    if count <= width {
        return name.to_string();
    }
    let keep = width.saturating_sub(3);
    let tail: String = name.chars().skip(count - keep).collect();
    format!("...{tail}")
}

pub fn render_frame(
    label: &str,
    total: u64,
    stats: PanelStats,
    jobs: &[ActiveJob],
    spinner: char,
    now: Instant,
) -> PanelFrame {
    let pct = percent(stats.processed, total);
    let mut lines = Vec::with_capacity(jobs.len() + 1);
    lines.push(format!(
        "{label} [{bar}] {done}/{total} ({pct}%)  ok {ok}  failed {failed}  skipped {skipped}",
        bar = render_bar(stats.processed, total),
        done = stats.processed,
        ok = stats.ok,
        failed = stats.failed,
        skipped = stats.skipped,
    ));

    let rows: Vec<JobRow> = jobs
        .iter()
        .map(|job| JobRow {
            tool: job.tool.clone(),
            file: truncate_file_name(&job.file, FILE_NAME_WIDTH),
            elapsed_secs: now.saturating_duration_since(job.started_at).as_secs(),
        })
        .collect();
    for row in &rows {
        lines.push(format!(
            "  {spinner} {tool:<12} {file:<width$} {secs}s",
            tool = row.tool,
            file = row.file,
            width = FILE_NAME_WIDTH,
            secs = row.elapsed_secs,
        ));
    }

    PanelFrame {
        label: label.to_string(),
        total,
        stats,
        percent: pct,
        spinner,
        jobs: rows,
        lines,
    }
}
