// src/console.rs

//! Terminal presentation for the `remake` binary: a sink that prints,
//! a responder that reads stdin, and interactive prompt collection.

use std::io::{self, BufRead, Write};

use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::command::{PromptAnswers, coerce_answer};
use crate::config::{OperationSpec, PromptSpec};
use crate::context::value_to_string;
use crate::exec::{ControlEvent, EventSink, OutputLine, PromptResponder};
use crate::types::{BoxFuture, PromptKind, StreamSource};

/// Plain child output to stdout/stderr as it arrived; events to stderr.
#[derive(Debug, Default)]
pub struct ConsoleSink {
    color: bool,
}

impl ConsoleSink {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn paint(&self, color: Option<&str>, text: &str) -> String {
        let code = match (self.color, color.map(str::to_lowercase).as_deref()) {
            (true, Some("red")) => "31",
            (true, Some("green")) => "32",
            (true, Some("yellow")) => "33",
            (true, Some("blue")) => "34",
            (true, Some("magenta")) => "35",
            (true, Some("cyan")) => "36",
            _ => return text.to_string(),
        };
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

impl EventSink for ConsoleSink {
    fn on_output(&mut self, line: OutputLine) {
        match line.source {
            StreamSource::Stdout => println!("{}", line.text),
            StreamSource::Stderr => eprintln!("{}", line.text),
        }
    }

    fn on_event(&mut self, event: ControlEvent) {
        match event {
            ControlEvent::Print {
                message,
                color,
                newline,
            } => {
                let text = self.paint(color.as_deref(), &message);
                if newline {
                    println!("{text}");
                } else {
                    print!("{text}");
                    let _ = io::stdout().flush();
                }
            }
            ControlEvent::Warning { message } => {
                eprintln!("{}", self.paint(Some("yellow"), &format!("warning: {message}")));
            }
            ControlEvent::Error { message } => {
                eprintln!("{}", self.paint(Some("red"), &format!("error: {message}")));
            }
            ControlEvent::Prompt { message, .. } => {
                eprint!("? {message} ");
                let _ = io::stderr().flush();
            }
            ControlEvent::Progress {
                current,
                total,
                label,
            } => {
                eprintln!("[{current}/{total}] {}", label.unwrap_or_default());
            }
            ControlEvent::Start { title, .. } => {
                eprintln!("==> {}", title.unwrap_or_default());
            }
            ControlEvent::End { success, exit_code } => {
                if !success {
                    eprintln!("{}", self.paint(Some("red"), &format!("<== exited with {exit_code}")));
                }
            }
            ControlEvent::RunAllOperationStart { index, name } => {
                eprintln!("--- [{}] {name}", index + 1);
            }
            ControlEvent::RunAllComplete {
                succeeded,
                failed,
                skipped,
                cancelled,
            } => {
                eprintln!(
                    "run-all: {succeeded} succeeded, {failed} failed, {skipped} skipped{}",
                    if cancelled { ", cancelled" } else { "" }
                );
            }
            _ => {}
        }
    }
}

/// Answers child prompts with a line read from stdin.
pub struct TerminalResponder {
    lines: Lines<BufReader<Stdin>>,
}

impl TerminalResponder {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for TerminalResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptResponder for TerminalResponder {
    fn respond<'a>(&'a mut self, _message: &'a str) -> BoxFuture<'a, String> {
        Box::pin(async move {
            match self.lines.next_line().await {
                Ok(Some(line)) => line,
                _ => String::new(),
            }
        })
    }
}

/// Ask every catalog prompt of `operation` and its follow-ups that the
/// caller has not pre-answered. An empty reply keeps the default.
///
/// Blocking; run it before any process starts.
pub fn collect_answers(
    operation: &OperationSpec,
    preset: &PromptAnswers,
    answers: &mut PromptAnswers,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> io::Result<()> {
    let mut stack = vec![operation];
    while let Some(op) = stack.pop() {
        for prompt in &op.prompts {
            if preset.contains(&prompt.name) {
                continue;
            }
            if let Some(condition) = &prompt.condition {
                if !answers.is_true(condition) {
                    continue;
                }
            }
            if let Some(answer) = ask(prompt, input, output)? {
                answers.set(prompt.name.clone(), answer);
            } else if let Some(default) = &prompt.default {
                answers.set(prompt.name.clone(), default.clone());
            }
        }
        stack.extend(op.on_success.iter().rev());
    }
    Ok(())
}

fn ask(
    prompt: &PromptSpec,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> io::Result<Option<serde_json::Value>> {
    let message = prompt.message.as_deref().unwrap_or(&prompt.name);
    let hint = match prompt.kind {
        PromptKind::Confirm => " [y/N]".to_string(),
        PromptKind::Checkbox if !prompt.choices.is_empty() => {
            format!(" ({}; comma-separated)", prompt.choices.join(", "))
        }
        PromptKind::Checkbox => " (comma-separated)".to_string(),
        PromptKind::Text => String::new(),
    };
    let default = prompt
        .default
        .as_ref()
        .map(|d| format!(" [{}]", value_to_string(d)))
        .unwrap_or_default();
    write!(output, "{message}{hint}{default}: ")?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 || line.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(coerce_answer(prompt.kind, &line)))
}
