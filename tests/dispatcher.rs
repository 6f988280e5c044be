// tests/dispatcher.rs

mod common;
use crate::common::builders::{
    OperationBuilder, PromptBuilder, RegistryFixture, engine_config, module_table,
};
use crate::common::fakes::{
    FakeRegistry, FakeScriptFactory, RecordingGit, RecordingSink, RecordingToolkit,
    ScriptedResponder,
};
use crate::common::{TestResult, fake_dispatcher, fake_dispatcher_with, init_tracing, io};

use std::fs;
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use remake_engine::command::PromptAnswers;
use remake_engine::config::{ModuleTable, OperationSpec};
use remake_engine::engine::OperationDispatcher;
use remake_engine::exec::{ControlEvent, ExecutionIo};
use remake_engine::types::{ScriptLanguage, ScriptType};

async fn run(
    dispatcher: &OperationDispatcher,
    modules: &ModuleTable,
    op: &OperationSpec,
) -> (bool, RecordingSink) {
    let mut sink = RecordingSink::new();
    let mut responder = ScriptedResponder::default();
    let ok = {
        let mut exec_io = io(&mut sink, &mut responder);
        dispatcher
            .run_operation("quake", modules, op, &mut PromptAnswers::new(), &mut exec_io)
            .await
    };
    (ok, sink)
}

/// Catalog file inside the default registry so native operations pass the
/// provenance check.
fn trusted_catalog(project_root: &Path) -> TestResult<std::path::PathBuf> {
    let fixture = RegistryFixture::new(project_root);
    let root = fixture.add_module("quake", "");
    Ok(root.join("operations.toml"))
}

#[tokio::test]
async fn on_success_chain_runs_depth_first_in_declaration_order() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let modules = module_table("quake", dir.path());
    let (dispatcher, backend) = fake_dispatcher(engine_config(dir.path()));

    let op = OperationBuilder::process("a.py")
        .on_success(
            OperationBuilder::process("b.py")
                .on_success(OperationBuilder::process("c.py").build())
                .build(),
        )
        .on_success(OperationBuilder::process("d.py").build())
        .build();

    let (ok, sink) = run(&dispatcher, &modules, &op).await;
    assert!(ok);
    assert_eq!(backend.scripts(), vec!["a.py", "b.py", "c.py", "d.py"]);
    assert!(sink.errors().is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_entry_skips_its_children_but_not_its_siblings() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let modules = module_table("quake", dir.path());
    let (dispatcher, backend) = fake_dispatcher(engine_config(dir.path()));

    let op = OperationBuilder::process("a.py")
        .on_success(
            OperationBuilder::process("fail.py")
                .on_success(OperationBuilder::process("never.py").build())
                .build(),
        )
        .on_success(OperationBuilder::process("d.py").build())
        .build();

    let (ok, _) = run(&dispatcher, &modules, &op).await;
    assert!(!ok);
    assert_eq!(backend.scripts(), vec!["a.py", "fail.py", "d.py"]);
    Ok(())
}

#[tokio::test]
async fn failed_root_runs_nothing_else() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let modules = module_table("quake", dir.path());
    let (dispatcher, backend) = fake_dispatcher(engine_config(dir.path()));

    let op = OperationBuilder::process("fail.py")
        .on_success(OperationBuilder::process("b.py").build())
        .build();

    let (ok, sink) = run(&dispatcher, &modules, &op).await;
    assert!(!ok);
    assert_eq!(backend.scripts(), vec!["fail.py"]);
    assert_eq!(sink.last_end(), Some((false, 1)));
    Ok(())
}

#[tokio::test]
async fn cancellation_stops_the_chain() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let modules = module_table("quake", dir.path());
    let (dispatcher, backend) = fake_dispatcher(engine_config(dir.path()));

    let op = OperationBuilder::process("a.py")
        .on_success(OperationBuilder::process("cancel.py").build())
        .on_success(OperationBuilder::process("d.py").build())
        .build();

    let (ok, sink) = run(&dispatcher, &modules, &op).await;
    assert!(!ok);
    assert_eq!(backend.scripts(), vec!["a.py", "cancel.py"]);
    assert_eq!(sink.last_end(), Some((false, 130)));
    assert!(sink.events().contains(&ControlEvent::Warning {
        message: "cancelled: 1 remaining operation(s) not run (exit code 130)".into(),
    }));
    Ok(())
}

#[tokio::test]
async fn cancelled_before_the_root_reports_and_runs_nothing() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let modules = module_table("quake", dir.path());
    let (dispatcher, backend) = fake_dispatcher(engine_config(dir.path()));

    let op = OperationBuilder::process("a.py")
        .on_success(OperationBuilder::process("b.py").build())
        .build();

    let mut sink = RecordingSink::new();
    let mut responder = ScriptedResponder::default();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let ok = {
        let mut exec_io = ExecutionIo::new(&mut sink, &mut responder, cancel);
        dispatcher
            .run_operation("quake", &modules, &op, &mut PromptAnswers::new(), &mut exec_io)
            .await
    };

    assert!(!ok);
    assert!(backend.scripts().is_empty());
    assert_eq!(
        sink.events(),
        vec![ControlEvent::Warning {
            message: "cancelled: 1 remaining operation(s) not run (exit code 130)".into(),
        }]
    );
    Ok(())
}

#[tokio::test]
async fn chain_deeper_than_the_limit_is_refused() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let modules = module_table("quake", dir.path());
    let mut config = engine_config(dir.path());
    config.settings.max_chain_depth = 1;
    let (dispatcher, backend) = fake_dispatcher(config);

    let op = OperationBuilder::process("a.py")
        .on_success(
            OperationBuilder::process("b.py")
                .on_success(OperationBuilder::process("c.py").build())
                .build(),
        )
        .build();

    let (ok, sink) = run(&dispatcher, &modules, &op).await;
    assert!(!ok);
    assert_eq!(backend.scripts(), vec!["a.py", "b.py"]);
    assert!(sink.errors().iter().any(|e| e.contains("deeper than 1")));
    Ok(())
}

#[tokio::test]
async fn process_argv_uses_interpreter_and_resolved_placeholders() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path().to_string_lossy().replace('\\', "/");
    let modules = module_table("quake", dir.path());
    let (dispatcher, backend) = fake_dispatcher(engine_config(dir.path()));

    let op = OperationBuilder::process("{{Game_Root}}/extract.py")
        .name("Extract")
        .arg("--game")
        .arg("{{Game.Id}}")
        .build();

    let (ok, _) = run(&dispatcher, &modules, &op).await;
    assert!(ok);
    let executed = backend.executed();
    assert_eq!(executed.len(), 1);
    assert_eq!(executed[0].title, "Extract");
    assert_eq!(
        executed[0].argv,
        vec![
            "python3".to_string(),
            format!("{root}/extract.py"),
            "--game".into(),
            "quake".into()
        ]
    );
    Ok(())
}

#[tokio::test]
async fn answers_flow_down_the_chain() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let modules = module_table("quake", dir.path());
    let (dispatcher, backend) = fake_dispatcher(engine_config(dir.path()));

    let op = OperationBuilder::process("a.py")
        .prompt(PromptBuilder::confirm("verbose").flag("-v").default(true).build())
        .on_success(
            OperationBuilder::process("b.py")
                .prompt(
                    PromptBuilder::text("level")
                        .flag("--level")
                        .condition("verbose")
                        .default("3")
                        .build(),
                )
                .build(),
        )
        .build();

    let (ok, _) = run(&dispatcher, &modules, &op).await;
    assert!(ok);
    let argvs: Vec<_> = backend.executed().into_iter().map(|r| r.argv).collect();
    assert_eq!(argvs[0][2..].to_vec(), vec!["-v"]);
    assert_eq!(argvs[1][2..].to_vec(), vec!["--level", "3"]);
    Ok(())
}

#[tokio::test]
async fn unknown_script_type_fails_without_spawning() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let modules = module_table("quake", dir.path());
    let (dispatcher, backend) = fake_dispatcher(engine_config(dir.path()));

    let op = OperationBuilder::with_type(ScriptType::Unknown("perl".into()), "x.pl")
        .on_success(OperationBuilder::process("b.py").build())
        .build();

    let (ok, sink) = run(&dispatcher, &modules, &op).await;
    assert!(!ok);
    assert!(backend.executed().is_empty());
    assert!(
        sink.errors()
            .iter()
            .any(|e| e.contains("unknown script_type 'perl'"))
    );
    Ok(())
}

#[tokio::test]
async fn operation_without_script_is_an_error() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let modules = module_table("quake", dir.path());
    let (dispatcher, backend) = fake_dispatcher(engine_config(dir.path()));

    let op = OperationBuilder::empty().name("nothing").build();
    let (ok, sink) = run(&dispatcher, &modules, &op).await;
    assert!(!ok);
    assert!(backend.executed().is_empty());
    assert!(sink.errors()[0].contains("has no script"));
    Ok(())
}

#[tokio::test]
async fn unknown_module_is_reported() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let modules = module_table("doom", dir.path());
    let (dispatcher, backend) = fake_dispatcher(engine_config(dir.path()));

    let op = OperationBuilder::process("a.py").build();
    let (ok, sink) = run(&dispatcher, &modules, &op).await;
    assert!(!ok);
    assert!(backend.executed().is_empty());
    assert!(sink.errors()[0].contains("quake"));
    Ok(())
}

#[tokio::test]
async fn embedded_scripts_go_through_the_factory() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let root = dir.path().to_string_lossy().replace('\\', "/");
    let modules = module_table("quake", dir.path());
    let factory = FakeScriptFactory::supporting(&[ScriptLanguage::Lua]);
    let scripts = Arc::new(factory.clone());
    let (dispatcher, backend) =
        fake_dispatcher_with(engine_config(dir.path()), |c| c.with_scripts(scripts));

    let op = OperationBuilder::with_type(ScriptType::Embedded(ScriptLanguage::Lua), "{{Game_Root}}/init.lua")
        .arg("--fast")
        .build();
    let (ok, _) = run(&dispatcher, &modules, &op).await;
    assert!(ok);
    assert!(backend.executed().is_empty());
    assert_eq!(
        factory.created(),
        vec![(
            ScriptLanguage::Lua,
            format!("{root}/init.lua"),
            vec!["--fast".to_string()]
        )]
    );

    let failing = OperationBuilder::with_type(ScriptType::Embedded(ScriptLanguage::Lua), "fail.lua").build();
    let (ok, sink) = run(&dispatcher, &modules, &failing).await;
    assert!(!ok);
    assert!(sink.errors()[0].contains("script raised an error"));
    Ok(())
}

#[tokio::test]
async fn embedded_language_without_runtime_fails() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let modules = module_table("quake", dir.path());
    let (dispatcher, _) = fake_dispatcher(engine_config(dir.path()));

    let op = OperationBuilder::with_type(ScriptType::Embedded(ScriptLanguage::Js), "main.js").build();
    let (ok, sink) = run(&dispatcher, &modules, &op).await;
    assert!(!ok);
    assert_eq!(
        sink.errors(),
        vec!["no js runtime is available to run 'main.js'".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn native_action_from_trusted_catalog_runs() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let catalog = trusted_catalog(dir.path())?;
    let module_root = catalog.parent().ok_or("catalog has no parent")?.to_path_buf();
    let modules = module_table("quake", &module_root);
    let toolkit = RecordingToolkit::default();
    let shared = Arc::new(toolkit.clone());
    let (dispatcher, backend) =
        fake_dispatcher_with(engine_config(dir.path()), |c| c.with_toolkit(shared));

    let op = OperationBuilder::native("validate-files")
        .arg("{{Game_Root}}/**/*.pak")
        .source_file(&catalog)
        .build();
    let (ok, sink) = run(&dispatcher, &modules, &op).await;
    assert!(ok, "{:?}", sink.errors());
    assert!(backend.executed().is_empty());

    let root = module_root.to_string_lossy().replace('\\', "/");
    assert_eq!(
        toolkit.calls(),
        vec![("validate_files".to_string(), vec![format!("{root}/**/*.pak")])]
    );
    Ok(())
}

#[tokio::test]
async fn native_action_from_untrusted_catalog_is_refused() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let elsewhere = tempfile::tempdir()?;
    let catalog = elsewhere.path().join("operations.toml");
    fs::write(&catalog, "")?;
    let modules = module_table("quake", elsewhere.path());
    let toolkit = RecordingToolkit::default();
    let shared = Arc::new(toolkit.clone());
    let (dispatcher, _) =
        fake_dispatcher_with(engine_config(dir.path()), |c| c.with_toolkit(shared));

    let untrusted = OperationBuilder::native("rename_folders")
        .arg("a=b")
        .source_file(&catalog)
        .build();
    let (ok, sink) = run(&dispatcher, &modules, &untrusted).await;
    assert!(!ok);
    assert!(sink.errors()[0].contains("outside the trusted operation roots"));

    let unstamped = OperationBuilder::native("rename_folders").arg("a=b").build();
    let (ok, sink) = run(&dispatcher, &modules, &unstamped).await;
    assert!(!ok);
    assert!(sink.errors()[0].contains("no recorded catalog file"));

    assert!(toolkit.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn download_module_git_clones_the_registered_url() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let catalog = trusted_catalog(dir.path())?;
    let module_root = catalog.parent().ok_or("catalog has no parent")?.to_path_buf();
    let modules = module_table("quake", &module_root);

    let registry_root = dir.path().join("RemakeRegistry");
    let mut registry = FakeRegistry {
        root: registry_root.clone(),
        ..FakeRegistry::default()
    };
    registry
        .urls
        .insert("doom".into(), "https://example.invalid/doom.git".into());
    let git = RecordingGit::default();
    let shared_git = Arc::new(git.clone());
    let (dispatcher, _) = fake_dispatcher_with(engine_config(dir.path()), |c| {
        c.with_git(shared_git).with_registry(Arc::new(registry))
    });

    let op = OperationBuilder::native("download_module_git")
        .arg("doom")
        .source_file(&catalog)
        .build();
    let (ok, sink) = run(&dispatcher, &modules, &op).await;
    assert!(ok, "{:?}", sink.errors());
    assert_eq!(
        git.clones.lock().unwrap().clone(),
        vec![(
            "https://example.invalid/doom.git".to_string(),
            registry_root.join("Games").join("doom")
        )]
    );

    // The running module is already installed: nothing to clone.
    let op = OperationBuilder::native("download_module_git")
        .arg("quake")
        .arg("https://example.invalid/quake.git")
        .source_file(&catalog)
        .build();
    let (ok, sink) = run(&dispatcher, &modules, &op).await;
    assert!(ok);
    assert_eq!(git.clones.lock().unwrap().len(), 1);
    assert!(matches!(
        sink.events().last(),
        Some(remake_engine::exec::ControlEvent::Warning { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn download_module_registry_updates_an_existing_checkout() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let catalog = trusted_catalog(dir.path())?;
    let module_root = catalog.parent().ok_or("catalog has no parent")?.to_path_buf();
    let modules = module_table("quake", &module_root);
    let registry_root = dir.path().join("RemakeRegistry");
    fs::create_dir_all(registry_root.join(".git"))?;

    let git = RecordingGit::default();
    let shared_git = Arc::new(git.clone());
    let (dispatcher, _) =
        fake_dispatcher_with(engine_config(dir.path()), |c| c.with_git(shared_git));

    let op = OperationBuilder::native("download_module_registry")
        .source_file(&catalog)
        .build();
    let (ok, _) = run(&dispatcher, &modules, &op).await;
    assert!(ok);
    assert_eq!(git.updates.lock().unwrap().clone(), vec![registry_root]);
    assert!(git.clones.lock().unwrap().is_empty());
    Ok(())
}
