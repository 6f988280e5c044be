use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use remake_engine::config::ModuleTable;
use remake_engine::engine::{
    GameRegistry, GitService, NativeActionRequest, NativeToolkit, ScriptAction,
    ScriptActionFactory, ToolResolver,
};
use remake_engine::exec::{
    ControlEvent, EventSink, ExecutionIo, OutputLine, ProcessBackend, ProcessRequest,
    PromptResponder,
};
use remake_engine::types::{BoxFuture, ScriptLanguage, StreamSource};
use tokio_util::sync::CancellationToken;

/// Everything a sink received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Output(OutputLine),
    Event(ControlEvent),
}

/// Sink that records everything it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub items: Vec<Recorded>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outputs(&self) -> Vec<OutputLine> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Recorded::Output(line) => Some(line.clone()),
                Recorded::Event(_) => None,
            })
            .collect()
    }

    pub fn output_texts(&self) -> Vec<String> {
        self.outputs().into_iter().map(|line| line.text).collect()
    }

    pub fn events(&self) -> Vec<ControlEvent> {
        self.items
            .iter()
            .filter_map(|item| match item {
                Recorded::Event(event) => Some(event.clone()),
                Recorded::Output(_) => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ControlEvent::Error { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    /// The last `end` event's `(success, exit_code)`.
    pub fn last_end(&self) -> Option<(bool, i32)> {
        self.events().into_iter().rev().find_map(|event| match event {
            ControlEvent::End { success, exit_code } => Some((success, exit_code)),
            _ => None,
        })
    }
}

impl EventSink for RecordingSink {
    fn on_output(&mut self, line: OutputLine) {
        self.items.push(Recorded::Output(line));
    }

    fn on_event(&mut self, event: ControlEvent) {
        self.items.push(Recorded::Event(event));
    }
}

/// Responder that replays scripted answers and remembers the questions.
#[derive(Debug, Default)]
pub struct ScriptedResponder {
    answers: VecDeque<String>,
    pub asked: Vec<String>,
}

impl ScriptedResponder {
    pub fn new<I: IntoIterator<Item = &'static str>>(answers: I) -> Self {
        Self {
            answers: answers.into_iter().map(str::to_string).collect(),
            asked: Vec::new(),
        }
    }
}

impl PromptResponder for ScriptedResponder {
    fn respond<'a>(&'a mut self, message: &'a str) -> BoxFuture<'a, String> {
        self.asked.push(message.to_string());
        let answer = self.answers.pop_front().unwrap_or_default();
        Box::pin(async move { answer })
    }
}

/// A fake process backend that:
/// - records every request it was asked to run
/// - echoes the argv as one stdout line
/// - fails any request whose argv mentions `fail`
/// - cancels the run's token for any argv mentioning `cancel`
#[derive(Debug, Clone, Default)]
pub struct FakeProcessBackend {
    executed: Arc<Mutex<Vec<ProcessRequest>>>,
}

impl FakeProcessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn executed(&self) -> Vec<ProcessRequest> {
        self.executed.lock().unwrap().clone()
    }

    /// The script (second argv element) of every request, in run order.
    pub fn scripts(&self) -> Vec<String> {
        self.executed()
            .into_iter()
            .map(|req| req.argv.get(1).cloned().unwrap_or_default())
            .collect()
    }
}

impl ProcessBackend for FakeProcessBackend {
    fn execute<'a>(
        &'a self,
        request: ProcessRequest,
        io: &'a mut ExecutionIo<'_>,
    ) -> BoxFuture<'a, bool> {
        Box::pin(async move {
            self.executed.lock().unwrap().push(request.clone());
            let mentions = |needle: &str| request.argv.iter().any(|a| a.contains(needle));

            io.sink.on_event(ControlEvent::Start {
                title: Some(request.title.clone()),
                argv: request.argv.clone(),
            });
            io.sink.on_output(OutputLine::new(StreamSource::Stdout, request.argv.join(" ")));

            if mentions("cancel") {
                io.cancel.cancel();
                io.sink.on_event(ControlEvent::End {
                    success: false,
                    exit_code: 130,
                });
                return false;
            }
            let success = !mentions("fail");
            io.sink.on_event(ControlEvent::End {
                success,
                exit_code: if success { 0 } else { 1 },
            });
            success
        })
    }
}

/// Script factory producing actions that succeed unless the script name
/// contains `fail`. `None` for languages not listed in `languages`.
#[derive(Debug, Clone, Default)]
pub struct FakeScriptFactory {
    pub languages: Vec<ScriptLanguage>,
    created: Arc<Mutex<Vec<(ScriptLanguage, String, Vec<String>)>>>,
}

impl FakeScriptFactory {
    pub fn supporting(languages: &[ScriptLanguage]) -> Self {
        Self {
            languages: languages.to_vec(),
            created: Arc::default(),
        }
    }

    pub fn created(&self) -> Vec<(ScriptLanguage, String, Vec<String>)> {
        self.created.lock().unwrap().clone()
    }
}

struct FakeScriptAction {
    fail: bool,
}

impl ScriptAction for FakeScriptAction {
    fn execute<'a>(
        &'a mut self,
        _tools: &'a dyn ToolResolver,
        _cancel: CancellationToken,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        let fail = self.fail;
        Box::pin(async move {
            if fail {
                anyhow::bail!("script raised an error");
            }
            Ok(())
        })
    }
}

impl ScriptActionFactory for FakeScriptFactory {
    fn try_create(
        &self,
        language: ScriptLanguage,
        script: &str,
        args: &[String],
        _module_id: &str,
        _modules: &ModuleTable,
        _project_root: &Path,
    ) -> Option<Box<dyn ScriptAction>> {
        if !self.languages.contains(&language) {
            return None;
        }
        self.created
            .lock()
            .unwrap()
            .push((language, script.to_string(), args.to_vec()));
        Some(Box::new(FakeScriptAction {
            fail: script.contains("fail"),
        }))
    }
}

/// Toolkit that records which action ran with which args and succeeds.
#[derive(Debug, Clone, Default)]
pub struct RecordingToolkit {
    calls: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

impl RecordingToolkit {
    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, action: &str, request: NativeActionRequest<'_>) -> BoxFuture<'static, anyhow::Result<bool>> {
        self.calls
            .lock()
            .unwrap()
            .push((action.to_string(), request.args.to_vec()));
        Box::pin(async { Ok(true) })
    }
}

impl NativeToolkit for RecordingToolkit {
    fn format_extract<'a>(
        &'a self,
        request: NativeActionRequest<'a>,
        _sink: &'a mut dyn EventSink,
    ) -> BoxFuture<'a, anyhow::Result<bool>> {
        self.record("format_extract", request)
    }

    fn format_convert<'a>(
        &'a self,
        request: NativeActionRequest<'a>,
        _sink: &'a mut dyn EventSink,
    ) -> BoxFuture<'a, anyhow::Result<bool>> {
        self.record("format_convert", request)
    }

    fn validate_files<'a>(
        &'a self,
        request: NativeActionRequest<'a>,
        _sink: &'a mut dyn EventSink,
    ) -> BoxFuture<'a, anyhow::Result<bool>> {
        self.record("validate_files", request)
    }

    fn rename_folders<'a>(
        &'a self,
        request: NativeActionRequest<'a>,
        _sink: &'a mut dyn EventSink,
    ) -> BoxFuture<'a, anyhow::Result<bool>> {
        self.record("rename_folders", request)
    }
}

/// Git service that records clone/update targets and always succeeds.
#[derive(Debug, Clone, Default)]
pub struct RecordingGit {
    pub clones: Arc<Mutex<Vec<(String, PathBuf)>>>,
    pub updates: Arc<Mutex<Vec<PathBuf>>>,
}

impl GitService for RecordingGit {
    fn clone_module<'a>(
        &'a self,
        url: &'a str,
        destination: &'a Path,
        _io: &'a mut ExecutionIo<'_>,
    ) -> BoxFuture<'a, bool> {
        self.clones
            .lock()
            .unwrap()
            .push((url.to_string(), destination.to_path_buf()));
        Box::pin(async { true })
    }

    fn update<'a>(&'a self, checkout: &'a Path, _io: &'a mut ExecutionIo<'_>) -> BoxFuture<'a, bool> {
        self.updates.lock().unwrap().push(checkout.to_path_buf());
        Box::pin(async { true })
    }
}

/// In-memory registry.
#[derive(Debug, Clone, Default)]
pub struct FakeRegistry {
    pub root: PathBuf,
    pub modules: ModuleTable,
    pub urls: BTreeMap<String, String>,
}

impl GameRegistry for FakeRegistry {
    fn registered_modules(&self) -> ModuleTable {
        self.modules.clone()
    }

    fn module_url(&self, module_id: &str) -> Option<String> {
        self.urls.get(module_id).cloned()
    }

    fn module_root(&self, module_id: &str) -> PathBuf {
        self.root.join("Games").join(module_id)
    }

    fn registry_root(&self) -> PathBuf {
        self.root.clone()
    }
}
