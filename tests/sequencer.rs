// tests/sequencer.rs

mod common;
use crate::common::builders::{OperationBuilder, engine_config, module_table};
use crate::common::fakes::{RecordingSink, ScriptedResponder};
use crate::common::{TestResult, fake_dispatcher, init_tracing, io};

use remake_engine::command::PromptAnswers;
use remake_engine::config::OperationCatalog;
use remake_engine::engine::{RunAllProgress, RunAllSequencer, RunAllSummary};
use remake_engine::exec::ControlEvent;
use remake_engine::progress::PanelStats;

#[tokio::test]
async fn runs_eligible_operations_in_order_and_keeps_going_after_failure() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let modules = module_table("quake", dir.path());
    let (dispatcher, backend) = fake_dispatcher(engine_config(dir.path()));

    let catalog = OperationCatalog::new_unchecked(vec![
        OperationBuilder::process("extract.py").name("Extract").build(),
        OperationBuilder::process("manual.py").name("Manual").run_all(false).build(),
        OperationBuilder::process("fail.py").name("Convert").build(),
        OperationBuilder::process("package.py").name("Package").build(),
    ]);

    let mut sink = RecordingSink::new();
    let mut responder = ScriptedResponder::default();
    let progress = RunAllProgress::default();
    let summary = {
        let mut exec_io = io(&mut sink, &mut responder);
        RunAllSequencer::new(&dispatcher)
            .with_progress(progress.clone())
            .run("quake", &modules, &catalog, &mut PromptAnswers::new(), &mut exec_io)
            .await
    };

    assert_eq!(
        summary,
        RunAllSummary {
            succeeded: 2,
            failed: 1,
            skipped: 1,
            cancelled: false,
        }
    );
    assert!(!summary.is_success());
    assert_eq!(backend.scripts(), vec!["extract.py", "fail.py", "package.py"]);

    assert_eq!(
        progress.counters.snapshot(),
        PanelStats {
            processed: 4,
            ok: 2,
            failed: 1,
            skipped: 1,
        }
    );
    assert!(progress.jobs.is_empty());

    let run_all: Vec<_> = sink
        .events()
        .into_iter()
        .filter(|event| event.kind().starts_with("run_all"))
        .collect();
    assert_eq!(
        run_all.first(),
        Some(&ControlEvent::RunAllStart {
            module: "quake".into(),
            total: 3,
        })
    );
    assert!(run_all.contains(&ControlEvent::RunAllOperationEnd {
        index: 1,
        name: "Convert".into(),
        success: false,
    }));
    assert_eq!(
        run_all.last(),
        Some(&ControlEvent::RunAllComplete {
            succeeded: 2,
            failed: 1,
            skipped: 1,
            cancelled: false,
        })
    );
    Ok(())
}

#[tokio::test]
async fn cancellation_ends_the_sequence_without_counting_a_failure() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let modules = module_table("quake", dir.path());
    let (dispatcher, backend) = fake_dispatcher(engine_config(dir.path()));

    let catalog = OperationCatalog::new_unchecked(vec![
        OperationBuilder::process("a.py").build(),
        OperationBuilder::process("cancel.py").build(),
        OperationBuilder::process("c.py").build(),
    ]);

    let mut sink = RecordingSink::new();
    let mut responder = ScriptedResponder::default();
    let summary = {
        let mut exec_io = io(&mut sink, &mut responder);
        RunAllSequencer::new(&dispatcher)
            .run("quake", &modules, &catalog, &mut PromptAnswers::new(), &mut exec_io)
            .await
    };

    assert_eq!(
        summary,
        RunAllSummary {
            succeeded: 1,
            failed: 0,
            skipped: 0,
            cancelled: true,
        }
    );
    assert!(!summary.is_success());
    assert_eq!(backend.scripts(), vec!["a.py", "cancel.py"]);
    assert!(matches!(
        sink.events().last(),
        Some(ControlEvent::RunAllComplete { cancelled: true, .. })
    ));
    Ok(())
}

#[tokio::test]
async fn empty_catalog_completes_immediately() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let modules = module_table("quake", dir.path());
    let (dispatcher, backend) = fake_dispatcher(engine_config(dir.path()));
    let catalog = OperationCatalog::new_unchecked(Vec::new());

    let mut sink = RecordingSink::new();
    let mut responder = ScriptedResponder::default();
    let summary = {
        let mut exec_io = io(&mut sink, &mut responder);
        RunAllSequencer::new(&dispatcher)
            .run("quake", &modules, &catalog, &mut PromptAnswers::new(), &mut exec_io)
            .await
    };

    assert!(summary.is_success());
    assert!(backend.executed().is_empty());
    assert_eq!(sink.events().len(), 2);
    Ok(())
}
