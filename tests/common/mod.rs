#![allow(dead_code, unused_imports)]

pub use remake_test_utils::builders;
pub use remake_test_utils::fakes;
pub use remake_test_utils::{fake_dispatcher, fake_dispatcher_with, init_tracing, with_timeout};

use remake_engine::exec::{ExecutionIo, PromptResponder};
use tokio_util::sync::CancellationToken;

use crate::common::fakes::RecordingSink;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Execution io over a recording sink with a fresh token.
pub fn io<'a>(
    sink: &'a mut RecordingSink,
    responder: &'a mut dyn PromptResponder,
) -> ExecutionIo<'a> {
    ExecutionIo::new(sink, responder, CancellationToken::new())
}
