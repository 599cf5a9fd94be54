//! Per-path debounce timers feeding a single drain loop.
//!
//! Each path moves `Idle -> TimerPending -> QueuedForBatch -> Idle`. A new
//! notification while the timer is pending restarts it. A fired timer puts
//! the path in the shared pending set and requests a drain; at most one
//! drain loop runs, and it keeps taking snapshots of the pending set until
//! it finds it empty.

use crate::build::{BatchRunner, BuildState};
use crate::model::SourceFile;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info};

pub struct Debouncer {
    state: Arc<BuildState>,
    runner: Arc<dyn BatchRunner>,
    window: Duration,
    next_generation: AtomicU64,
}

impl Debouncer {
    pub fn new(
        state: Arc<BuildState>,
        runner: Arc<dyn BatchRunner>,
        window: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            state,
            runner,
            window,
            next_generation: AtomicU64::new(0),
        })
    }

    pub fn state(&self) -> &Arc<BuildState> {
        &self.state
    }

    /// (Re)starts the debounce timer for `path`.
    pub fn notify(self: &Arc<Self>, path: PathBuf) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        if let Some(previous) = self.state.arm_timer(&path, generation) {
            previous.abort();
        }

        let this = Arc::clone(self);
        let timer_path = path.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(this.window).await;
            if this.state.fire_timer(&timer_path, generation) {
                debug!("Debounce elapsed for {}", timer_path.display());
                this.request_drain();
            }
        });
        self.state
            .attach_timer_handle(&path, generation, task.abort_handle());
    }

    /// Cancels any timer and pending rebuild for a removed source.
    pub fn forget(&self, path: &Path) {
        self.state.forget(path);
    }

    /// Starts the drain loop unless one is already running, in which case
    /// that loop picks up newly pending paths on its next iteration.
    pub fn request_drain(self: &Arc<Self>) -> bool {
        if !self.state.begin_drain() {
            return false;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.drain().await;
        });
        true
    }

    async fn drain(&self) {
        while let Some(paths) = self.state.take_pending_or_finish_drain() {
            info!("Detected changes in {} files. Rebuilding...", paths.len());
            let sources = paths.into_iter().map(SourceFile::new).collect();
            let summary = self.runner.run_batch(sources).await;
            debug!(
                "Batch finished: built {}, skipped {}, failed {}",
                summary.built, summary.skipped, summary.failed
            );
        }
    }
}
