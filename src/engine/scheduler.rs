// ── Limbic: Background Scheduler ───────────────────────────────────────────
// Cooperative interval tasks that drive the engine's periodic hooks:
//   • sync tick          — flush state to the durable backend (default 5 min)
//   • retrain check tick — run the retraining gate/cycle (default 1 hour)
//
// Both hooks are idempotent no-ops when there is nothing to do, so the
// cadence is tunable without correctness concerns. Tasks stop when the
// shared flag flips and are aborted on shutdown; there is no blocking
// sleep loop anywhere.

use log::{error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::engine::facade::MoodEngine;

/// Handle to the running scheduler tasks. Dropping the handle does NOT stop
/// them; call `shutdown()`.
pub struct SchedulerHandle {
    stop: Arc<AtomicBool>,
    sync_task: tokio::task::JoinHandle<()>,
    retrain_task: tokio::task::JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal both loops to stop and abort their tasks.
    pub fn shutdown(self) {
        self.stop.store(true, Ordering::Relaxed);
        self.sync_task.abort();
        self.retrain_task.abort();
        info!("[limbic:scheduler] Stopped");
    }

    pub fn is_finished(&self) -> bool {
        self.sync_task.is_finished() && self.retrain_task.is_finished()
    }
}

/// Spawn the sync and retrain-check interval tasks for `engine`.
/// Cadence comes from the engine's config. Must be called from within a
/// tokio runtime.
pub fn spawn_scheduler(engine: &MoodEngine) -> SchedulerHandle {
    let config = engine.config().clone();
    let stop = Arc::new(AtomicBool::new(false));

    let sync_engine = engine.clone();
    let sync_stop = stop.clone();
    let sync_task = tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(config.sync_interval_secs.max(1)));
        while !sync_stop.load(Ordering::Relaxed) {
            interval.tick().await;
            sync_engine.sync_tick();
        }
    });

    let retrain_engine = engine.clone();
    let retrain_stop = stop.clone();
    let watchdog = Duration::from_secs(config.retrain_watchdog_secs.max(1));
    let retrain_task = tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(config.retrain_check_interval_secs.max(1)));
        while !retrain_stop.load(Ordering::Relaxed) {
            interval.tick().await;
            let started = Instant::now();
            let decision = retrain_engine.retrain_check_tick();
            let elapsed = started.elapsed();
            if elapsed > watchdog {
                // Cycles are bounded by feedback-history size; one this slow
                // means the host should compact or investigate.
                error!(
                    "[limbic:scheduler] Retrain cycle ({:?}) took {:?}, over the {:?} watchdog",
                    decision, elapsed, watchdog
                );
            }
        }
    });

    info!(
        "[limbic:scheduler] Started (sync every {}s, retrain check every {}s)",
        config.sync_interval_secs, config.retrain_check_interval_secs
    );

    SchedulerHandle {
        stop,
        sync_task,
        retrain_task,
    }
}

// ═════════════════════════════════════════════════════════════════════════════
// Tests
// ═════════════════════════════════════════════════════════════════════════════
