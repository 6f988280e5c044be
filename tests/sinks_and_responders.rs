// tests/sinks_and_responders.rs

mod common;
use crate::common::builders::{OperationBuilder, RegistryFixture, engine_config, module_table};
use crate::common::fakes::{FakeRegistry, RecordingSink, ScriptedResponder};
use crate::common::{TestResult, fake_dispatcher_with, init_tracing, io};

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use remake_engine::command::PromptAnswers;
use remake_engine::engine::{ConfigToolResolver, ToolResolver};
use remake_engine::exec::{
    ChannelSink, ControlEvent, EventSink, FnResponder, OutputLine, PromptResponder,
    QueuedResponder, SinkMessage,
};
use remake_engine::types::StreamSource;

#[tokio::test]
async fn channel_sink_forwards_in_order() {
    let (mut sink, mut rx) = ChannelSink::channel();
    sink.on_output(OutputLine::new(StreamSource::Stdout, "one"));
    sink.warning("two".to_string());
    drop(sink);

    assert_eq!(
        rx.recv().await,
        Some(SinkMessage::Output(OutputLine::new(StreamSource::Stdout, "one")))
    );
    assert_eq!(
        rx.recv().await,
        Some(SinkMessage::Event(ControlEvent::Warning {
            message: "two".into()
        }))
    );
    assert_eq!(rx.recv().await, None);
}

#[test]
fn sink_messages_serialize_with_a_type_tag() -> TestResult {
    let message = SinkMessage::Output(OutputLine::new(StreamSource::Stderr, "oops"));
    let value = serde_json::to_value(&message)?;
    assert_eq!(value["type"], "output");
    assert_eq!(value["source"], "stderr");
    assert_eq!(value["text"], "oops");
    Ok(())
}

#[tokio::test]
async fn queued_responder_falls_back_to_empty_lines() {
    let mut responder = QueuedResponder::new(["first"]);
    assert_eq!(responder.remaining(), 1);
    assert_eq!(responder.respond("q1").await, "first");
    assert_eq!(responder.respond("q2").await, "");
}

#[tokio::test]
async fn fn_responder_sees_the_prompt_message() {
    let mut responder = FnResponder(|message: &str| format!("re: {message}"));
    assert_eq!(responder.respond("Overwrite?").await, "re: Overwrite?");
}

#[test]
fn config_tool_resolver_looks_up_tools_table() {
    let mut tools = BTreeMap::new();
    tools.insert("ffmpeg".to_string(), PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
    let resolver = ConfigToolResolver::new(tools);
    assert_eq!(
        resolver.resolve_tool_path("ffmpeg"),
        Some(PathBuf::from("/opt/ffmpeg/bin/ffmpeg"))
    );
    assert_eq!(resolver.resolve_tool_path("blender"), None);
}

#[tokio::test]
async fn default_git_service_clones_through_the_process_backend() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let fixture = RegistryFixture::new(dir.path());
    let module_root = fixture.add_module("quake", "");
    let catalog = module_root.join("operations.toml");
    let modules = module_table("quake", &module_root);

    let mut registry = FakeRegistry {
        root: fixture.registry_root(),
        ..FakeRegistry::default()
    };
    registry
        .urls
        .insert("doom".into(), "https://example.invalid/doom.git".into());
    let (dispatcher, backend) = fake_dispatcher_with(engine_config(dir.path()), |c| {
        c.with_registry(Arc::new(registry))
    });

    let op = OperationBuilder::native("download_module_git")
        .arg("doom")
        .source_file(&catalog)
        .build();
    let mut sink = RecordingSink::new();
    let mut responder = ScriptedResponder::default();
    let ok = {
        let mut exec_io = io(&mut sink, &mut responder);
        dispatcher
            .run_operation("quake", &modules, &op, &mut PromptAnswers::new(), &mut exec_io)
            .await
    };

    assert!(ok, "{:?}", sink.errors());
    let executed = backend.executed();
    assert_eq!(executed.len(), 1);
    let destination = fixture.registry_root().join("Games").join("doom");
    assert_eq!(
        executed[0].argv,
        vec![
            "git".to_string(),
            "clone".into(),
            "--depth".into(),
            "1".into(),
            "https://example.invalid/doom.git".into(),
            destination.to_string_lossy().into_owned(),
        ]
    );
    assert_eq!(executed[0].title, "git clone https://example.invalid/doom.git");
    Ok(())
}
