// src/progress/sinks.rs

//! Panel presentation targets.

use std::io::{self, Write};

use tokio::sync::mpsc;
use tracing::debug;

use crate::exec::protocol::ControlEvent;
use crate::progress::render::PanelFrame;

/// Receives rendered frames from the panel task.
pub trait PanelSink: Send + 'static {
    fn start(&mut self, _label: &str, _total: u64) {}

    /// Replace whatever was drawn last with `frame`.
    fn draw(&mut self, frame: &PanelFrame);

    fn finish(&mut self, frame: &PanelFrame);
}

/// Redraws the panel in place using ANSI cursor movement.
pub struct TerminalPanel<W: Write + Send + 'static = io::Stderr> {
    out: W,
    lines_drawn: usize,
}

impl TerminalPanel<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send + 'static> TerminalPanel<W> {
    pub fn new(out: W) -> Self {
        Self { out, lines_drawn: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn redraw(&mut self, frame: &PanelFrame) -> io::Result<()> {
        if self.lines_drawn > 0 {
            // Cursor to the start of the first panel line.
            write!(self.out, "\x1b[{}F", self.lines_drawn)?;
        }
        for line in &frame.lines {
            writeln!(self.out, "\x1b[2K{line}")?;
        }
        // A frame with fewer job lines leaves stale rows below it.
        for _ in frame.lines.len()..self.lines_drawn {
            writeln!(self.out, "\x1b[2K")?;
        }
        self.lines_drawn = self.lines_drawn.max(frame.lines.len());
        self.out.flush()
    }
}

impl<W: Write + Send + 'static> PanelSink for TerminalPanel<W> {
    fn draw(&mut self, frame: &PanelFrame) {
        if let Err(e) = self.redraw(frame) {
            debug!(error = %e, "panel redraw failed");
        }
    }

    fn finish(&mut self, _frame: &PanelFrame) {
        self.lines_drawn = 0;
        if let Err(e) = self.out.flush() {
            debug!(error = %e, "panel flush failed");
        }
    }
}

/// Turns frames into `progress_panel_*` control events.
#[derive(Debug, Clone)]
pub struct EventPanelSink {
    tx: mpsc::UnboundedSender<ControlEvent>,
}

impl EventPanelSink {
    pub fn new(tx: mpsc::UnboundedSender<ControlEvent>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ControlEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: ControlEvent) {
        if self.tx.send(event).is_err() {
            debug!("panel event receiver dropped");
        }
    }
}

impl PanelSink for EventPanelSink {
    fn start(&mut self, label: &str, total: u64) {
        self.send(ControlEvent::ProgressPanelStart {
            label: label.to_string(),
            total,
        });
    }

    fn draw(&mut self, frame: &PanelFrame) {
        self.send(ControlEvent::ProgressPanelUpdate {
            frame: frame.clone(),
        });
    }

    fn finish(&mut self, frame: &PanelFrame) {
        self.send(ControlEvent::ProgressPanelEnd {
            frame: frame.clone(),
        });
    }
}
