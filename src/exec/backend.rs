// src/exec/backend.rs

//! Pluggable process backend.
//!
//! The dispatcher talks to a `ProcessBackend` instead of a concrete
//! [`ProcessHost`], so tests can swap in a fake that records requests and
//! emits scripted events without spawning anything.

use crate::exec::host::{ExecutionIo, ProcessHost, ProcessRequest};
use crate::types::BoxFuture;

/// Trait abstracting how a built command line gets executed.
///
/// The implementation is free to:
/// - spawn OS processes (production)
/// - simulate output and outcomes (tests)
pub trait ProcessBackend: Send + Sync {
    /// Run `request` to completion and report success.
    fn execute<'a>(
        &'a self,
        request: ProcessRequest,
        io: &'a mut ExecutionIo<'_>,
    ) -> BoxFuture<'a, bool>;
}

impl ProcessBackend for ProcessHost {
    fn execute<'a>(
        &'a self,
        request: ProcessRequest,
        io: &'a mut ExecutionIo<'_>,
    ) -> BoxFuture<'a, bool> {
        Box::pin(self.run(request, io))
    }
}
