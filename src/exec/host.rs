// src/exec/host.rs

//! Runs one external process and speaks the control protocol with it.
//!
//! Flow for a single run:
//! - refuse anything the allow-list does not know
//! - spawn with piped stdio in its own process group
//! - one reader task per stream pushes lines into a bounded queue
//! - the consumer loop decodes lines, forwards them to the sink, and
//!   answers `prompt` events through the responder
//! - cancellation kills the whole tree and reports exit code 130

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::exec::allow_list::ExecutableAllowList;
use crate::exec::protocol::{ControlEvent, DecodedLine, decode_line};
use crate::exec::responder::PromptResponder;
use crate::exec::sink::{EventSink, OutputLine};
use crate::exec::tree_kill;
use crate::types::StreamSource;

/// Exit code reported for a cancelled run.
pub const CANCELLED_EXIT_CODE: i32 = 130;

pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// How long to keep draining output after the child has exited before
/// giving up on stragglers (grandchildren holding the pipes open).
pub const DEFAULT_DRAIN_IDLE: Duration = Duration::from_millis(250);

/// One process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRequest {
    pub argv: Vec<String>,
    pub title: String,
    pub env: BTreeMap<String, String>,
    pub working_dir: Option<PathBuf>,
}

impl ProcessRequest {
    pub fn new(argv: Vec<String>, title: impl Into<String>) -> Self {
        Self {
            argv,
            title: title.into(),
            env: BTreeMap::new(),
            working_dir: None,
        }
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// The caller-side ends of an execution: where events go, who answers
/// prompts, and the token that stops everything.
pub struct ExecutionIo<'a> {
    pub sink: &'a mut dyn EventSink,
    pub responder: &'a mut dyn PromptResponder,
    pub cancel: CancellationToken,
}

impl<'a> ExecutionIo<'a> {
    pub fn new(
        sink: &'a mut dyn EventSink,
        responder: &'a mut dyn PromptResponder,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            sink,
            responder,
            cancel,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[derive(Debug, Clone)]
pub struct HostOptions {
    /// Bound of the line queue between the readers and the consumer.
    pub queue_capacity: usize,
    pub drain_idle: Duration,
    /// Do not forward `prompt` events to the sink; the responder still runs.
    pub suppress_prompt_echo: bool,
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            drain_idle: DEFAULT_DRAIN_IDLE,
            suppress_prompt_echo: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProcessHost {
    allow_list: Arc<ExecutableAllowList>,
    options: HostOptions,
}

impl ProcessHost {
    pub fn new(allow_list: ExecutableAllowList) -> Self {
        Self {
            allow_list: Arc::new(allow_list),
            options: HostOptions::default(),
        }
    }

    pub fn with_options(mut self, options: HostOptions) -> Self {
        self.options = options;
        self
    }

    pub fn allow_list(&self) -> &ExecutableAllowList {
        &self.allow_list
    }

    pub fn options(&self) -> &HostOptions {
        &self.options
    }

    /// Run `request` to completion.
    ///
    /// `true` only when the child exited with code 0. Spawn failures and
    /// refusals surface as an `error` event; cancellation ends with
    /// `End { success: false, exit_code: 130 }`.
    pub async fn run(&self, request: ProcessRequest, io: &mut ExecutionIo<'_>) -> bool {
        let title = request.title.clone();
        match self.run_inner(request, io).await {
            Ok(success) => success,
            Err(err) => {
                error!(title = %title, error = %err, "process execution error");
                io.sink.error(format!("{title}: {err:#}"));
                false
            }
        }
    }

    async fn run_inner(&self, request: ProcessRequest, io: &mut ExecutionIo<'_>) -> Result<bool> {
        let executable = request.argv.first().map(String::as_str).unwrap_or_default();
        if let Err(rejection) = self.allow_list.check(executable) {
            warn!(title = %request.title, executable, "{rejection}");
            io.sink.error(rejection.to_string());
            return Ok(false);
        }
        if io.is_cancelled() {
            debug!(title = %request.title, "cancelled before spawn");
            io.sink.on_event(ControlEvent::End {
                success: false,
                exit_code: CANCELLED_EXIT_CODE,
            });
            return Ok(false);
        }

        info!(title = %request.title, argv = ?request.argv, "starting process");

        let mut cmd = Command::new(executable);
        cmd.args(&request.argv[1..])
            .env("PYTHONUNBUFFERED", "1")
            .env("PYTHONIOENCODING", "utf-8")
            .envs(&request.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &request.working_dir {
            cmd.current_dir(dir);
        }
        tree_kill::configure_process_group(&mut cmd);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(title = %request.title, executable, "executable not found");
                io.sink.error(format!("executable not found: {executable}"));
                return Ok(false);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("spawning '{executable}'"));
            }
        };

        io.sink.on_event(ControlEvent::Start {
            title: Some(request.title.clone()),
            argv: request.argv.clone(),
        });

        let (tx, mut rx) = mpsc::channel::<(StreamSource, String)>(self.options.queue_capacity.max(1));
        if let Some(stdout) = child.stdout.take() {
            spawn_reader(stdout, StreamSource::Stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(stderr, StreamSource::Stderr, tx.clone());
        }
        drop(tx);

        let mut stdin = child.stdin.take();
        let mut exit: Option<ExitStatus> = None;
        let mut streams_open = true;
        let mut pending_prompt: Option<String> = None;

        loop {
            if let Some(message) = pending_prompt.take() {
                if exit.is_none() {
                    let answer = tokio::select! {
                        biased;
                        _ = io.cancel.cancelled() => {
                            return Ok(self.cancel_child(&mut child, &request.title, io).await);
                        }
                        answer = io.responder.respond(&message) => answer,
                    };
                    write_answer(&mut stdin, &answer, io.sink).await;
                } else {
                    debug!(title = %request.title, "prompt arrived after exit; not answering");
                }
            }

            if exit.is_some() && !streams_open {
                break;
            }

            tokio::select! {
                biased;
                _ = io.cancel.cancelled() => {
                    return Ok(self.cancel_child(&mut child, &request.title, io).await);
                }
                received = rx.recv(), if streams_open => match received {
                    Some((source, text)) => {
                        pending_prompt = self.dispatch_line(source, text, io.sink);
                    }
                    None => streams_open = false,
                },
                status = child.wait(), if exit.is_none() => {
                    let status = status
                        .with_context(|| format!("waiting for '{}'", request.title))?;
                    exit = Some(status);
                }
                _ = tokio::time::sleep(self.options.drain_idle), if exit.is_some() => {
                    debug!(title = %request.title, "output still open after exit; stop draining");
                    break;
                }
            }
        }

        let code = exit.and_then(|status| status.code()).unwrap_or(-1);
        let success = code == 0;
        info!(title = %request.title, exit_code = code, success, "process exited");
        io.sink.on_event(ControlEvent::End {
            success,
            exit_code: code,
        });
        Ok(success)
    }

    /// Forward one line; returns the prompt message if it asked for input.
    fn dispatch_line(&self, source: StreamSource, text: String, sink: &mut dyn EventSink) -> Option<String> {
        match decode_line(text) {
            DecodedLine::Plain(text) => {
                sink.on_output(OutputLine { source, text });
                None
            }
            DecodedLine::Event(ControlEvent::Prompt { message, id }) => {
                if !self.options.suppress_prompt_echo {
                    sink.on_event(ControlEvent::Prompt {
                        message: message.clone(),
                        id,
                    });
                }
                Some(message)
            }
            DecodedLine::Event(event) => {
                sink.on_event(event);
                None
            }
        }
    }

    async fn cancel_child(&self, child: &mut Child, title: &str, io: &mut ExecutionIo<'_>) -> bool {
        info!(title = %title, "cancellation requested; killing process tree");
        if let Err(e) = tree_kill::kill_process_tree(child).await {
            warn!(title = %title, error = %e, "failed to kill process tree");
        }
        io.sink.on_event(ControlEvent::End {
            success: false,
            exit_code: CANCELLED_EXIT_CODE,
        });
        false
    }
}

fn spawn_reader<R>(stream: R, source: StreamSource, tx: mpsc::Sender<(StreamSource, String)>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf)
                        .trim_end_matches(['\r', '\n'])
                        .to_string();
                    if tx.send((source, line)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(%source, error = %e, "stream read failed");
                    break;
                }
            }
        }
    });
}

/// Write exactly one line to the child's stdin.
async fn write_answer(stdin: &mut Option<ChildStdin>, answer: &str, sink: &mut dyn EventSink) {
    let Some(pipe) = stdin.as_mut() else {
        sink.warning("stdin is closed; prompt left unanswered".to_string());
        return;
    };
    let line = format!("{}\n", answer.lines().next().unwrap_or_default());
    let result = async {
        pipe.write_all(line.as_bytes()).await?;
        pipe.flush().await
    }
    .await;
    if let Err(e) = result {
        warn!(error = %e, "failed to write prompt answer");
        sink.warning(format!("failed to answer prompt: {e}"));
        *stdin = None;
    }
}
