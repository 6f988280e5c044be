pub mod builders;
pub mod fakes;

use std::sync::{Arc, Once};

use remake_engine::config::EngineConfig;
use remake_engine::engine::{Collaborators, OperationDispatcher};
use remake_engine::exec::ProcessBackend;
use tracing_subscriber::{EnvFilter, fmt};

use crate::fakes::FakeProcessBackend;

static INIT: Once = Once::new();

/// Install a test-captured subscriber once per test binary.
///
/// `REMAKE_LOG` takes the same directives as `RUST_LOG`; the engine logs at
/// debug by default so failing tests show the process lifecycle.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("REMAKE_LOG")
            .unwrap_or_else(|_| EnvFilter::new("warn,remake_engine=debug"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(false)
            .try_init();
    });
}

/// Bound a test future; engine tests that hang usually mean a child was not reaped.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    match tokio::time::timeout(std::time::Duration::from_secs(10), f).await {
        Ok(value) => value,
        Err(_) => panic!("engine test did not finish within 10s"),
    }
}

/// Dispatcher over a [`FakeProcessBackend`], with production collaborators
/// wired to that same fake. Returns the backend for inspection.
pub fn fake_dispatcher(config: EngineConfig) -> (OperationDispatcher, FakeProcessBackend) {
    let fake = FakeProcessBackend::new();
    let backend: Arc<dyn ProcessBackend> = Arc::new(fake.clone());
    let collaborators = Collaborators::from_config(&config, Arc::clone(&backend));
    (
        OperationDispatcher::new(backend, Arc::new(config), collaborators),
        fake,
    )
}

/// Like [`fake_dispatcher`] with caller-adjusted collaborators.
pub fn fake_dispatcher_with(
    config: EngineConfig,
    adjust: impl FnOnce(Collaborators) -> Collaborators,
) -> (OperationDispatcher, FakeProcessBackend) {
    let fake = FakeProcessBackend::new();
    let backend: Arc<dyn ProcessBackend> = Arc::new(fake.clone());
    let collaborators = adjust(Collaborators::from_config(&config, Arc::clone(&backend)));
    (
        OperationDispatcher::new(backend, Arc::new(config), collaborators),
        fake,
    )
}
