// src/progress/panel.rs

//! The ticking panel task.

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::progress::jobs::{ActiveJob, PanelStats};
use crate::progress::render::{BLANK_SPINNER, render_frame, spinner_frame};
use crate::progress::sinks::PanelSink;

pub const TICK_INTERVAL: Duration = Duration::from_millis(200);

/// Spawn the panel: every tick it polls both snapshot functions and draws a
/// frame. Cancelling `cancel` triggers one last frame with a blank spinner,
/// then `finish`, then the task ends.
pub fn start_panel<S, J, P>(
    total: u64,
    stats_fn: S,
    jobs_fn: J,
    label: impl Into<String>,
    mut sink: P,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    S: Fn() -> PanelStats + Send + 'static,
    J: Fn() -> Vec<ActiveJob> + Send + 'static,
    P: PanelSink,
{
    let label = label.into();
    tokio::spawn(async move {
        debug!(label = %label, total, "progress panel started");
        sink.start(&label, total);

        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tick: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let frame = render_frame(
                        &label,
                        total,
                        stats_fn(),
                        &jobs_fn(),
                        spinner_frame(tick),
                        Instant::now(),
                    );
                    sink.draw(&frame);
                    tick = tick.wrapping_add(1);
                }
            }
        }

        let last = render_frame(
            &label,
            total,
            stats_fn(),
            &jobs_fn(),
            BLANK_SPINNER,
            Instant::now(),
        );
        sink.draw(&last);
        sink.finish(&last);
        debug!(label = %label, "progress panel finished");
    })
}
