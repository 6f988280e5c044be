// src/exec/sink.rs

//! Where plain output lines and control events end up.
//!
//! The engine never prints directly; a terminal, a GUI bridge, or a test
//! recorder implements [`EventSink`] and decides how to present things.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::exec::protocol::ControlEvent;
use crate::types::StreamSource;

/// One plain line read from a child stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLine {
    pub source: StreamSource,
    pub text: String,
}

impl OutputLine {
    pub fn new(source: StreamSource, text: impl Into<String>) -> Self {
        Self {
            source,
            text: text.into(),
        }
    }
}

/// Receiver for everything an execution produces.
///
/// Calls arrive in the order the lines were read, from a single task.
pub trait EventSink: Send {
    fn on_output(&mut self, line: OutputLine);

    fn on_event(&mut self, event: ControlEvent);

    fn error(&mut self, message: String) {
        self.on_event(ControlEvent::Error { message });
    }

    fn warning(&mut self, message: String) {
        self.on_event(ControlEvent::Warning { message });
    }
}

/// Routes everything into `tracing`. Useful when nobody is watching.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn on_output(&mut self, line: OutputLine) {
        info!(source = %line.source, "{}", line.text);
    }

    fn on_event(&mut self, event: ControlEvent) {
        match &event {
            ControlEvent::Error { message } => error!("{message}"),
            ControlEvent::Warning { message } => warn!("{message}"),
            ControlEvent::Print { message, .. } => info!("{message}"),
            other => debug!(kind = other.kind(), ?other, "event"),
        }
    }
}

/// Message forwarded by [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkMessage {
    Output(OutputLine),
    Event(ControlEvent),
}

/// Forwards to an unbounded channel so another task (a UI bridge) can
/// consume the stream without blocking the reader.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkMessage>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<SinkMessage>) -> Self {
        Self { tx }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SinkMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, message: SinkMessage) {
        if self.tx.send(message).is_err() {
            debug!("sink receiver dropped; discarding message");
        }
    }
}

impl EventSink for ChannelSink {
    fn on_output(&mut self, line: OutputLine) {
        self.forward(SinkMessage::Output(line));
    }

    fn on_event(&mut self, event: ControlEvent) {
        self.forward(SinkMessage::Event(event));
    }
}
