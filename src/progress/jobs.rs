// src/progress/jobs.rs

//! Shared progress state polled by the panel.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Point-in-time copy of [`PanelCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelStats {
    pub processed: u64,
    pub ok: u64,
    pub failed: u64,
    pub skipped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Ok,
    Failed,
    Skipped,
}

/// Lock-free counters bumped by workers and read by the panel tick.
#[derive(Debug, Default)]
pub struct PanelCounters {
    processed: AtomicU64,
    ok: AtomicU64,
    failed: AtomicU64,
    skipped: AtomicU64,
}

impl PanelCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: JobOutcome) {
        let counter = match outcome {
            JobOutcome::Ok => &self.ok,
            JobOutcome::Failed => &self.failed,
            JobOutcome::Skipped => &self.skipped,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> PanelStats {
        PanelStats {
            processed: self.processed.load(Ordering::SeqCst),
            ok: self.ok.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
        }
    }
}

/// One unit of work currently in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveJob {
    pub tool: String,
    pub file: String,
    pub started_at: Instant,
}

/// The set of in-flight jobs. Cloning shares the set.
#[derive(Debug, Clone, Default)]
pub struct ActiveJobs {
    inner: Arc<Mutex<BTreeMap<u64, ActiveJob>>>,
    next_id: Arc<AtomicU64>,
}

impl ActiveJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job; it stays listed until the guard drops.
    pub fn begin(&self, tool: impl Into<String>, file: impl Into<String>) -> JobGuard {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.lock().insert(
            id,
            ActiveJob {
                tool: tool.into(),
                file: file.into(),
                started_at: Instant::now(),
            },
        );
        JobGuard {
            jobs: self.clone(),
            id,
        }
    }

    /// Jobs in start order.
    pub fn snapshot(&self) -> Vec<ActiveJob> {
        self.lock().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<u64, ActiveJob>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes its job from the set on drop.
#[derive(Debug)]
pub struct JobGuard {
    jobs: ActiveJobs,
    id: u64,
}

impl Drop for JobGuard {
    fn drop(&mut self) {
        self.jobs.lock().remove(&self.id);
    }
}
