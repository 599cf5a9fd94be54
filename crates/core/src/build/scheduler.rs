//! Bounded-concurrency batch builds.

use super::driver::{BuildDriver, BuildOutcome};
use crate::config::DEFAULT_CONCURRENCY;
use crate::index::IndexGenerator;
use crate::model::SourceFile;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub built: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total: usize,
}

impl Summary {
    pub fn record(&mut self, outcome: BuildOutcome) {
        match outcome {
            BuildOutcome::Built => self.built += 1,
            BuildOutcome::Skipped => self.skipped += 1,
            BuildOutcome::Failed => self.failed += 1,
        }
        self.total += 1;
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Consumer of debounced batches.
#[async_trait]
pub trait BatchRunner: Send + Sync {
    async fn run_batch(&self, sources: Vec<SourceFile>) -> Summary;
}

pub struct BatchScheduler {
    driver: Arc<BuildDriver>,
    in_flight: Arc<Semaphore>,
    index: Option<IndexGenerator>,
}

impl BatchScheduler {
    pub fn new(driver: Arc<BuildDriver>) -> Self {
        Self {
            driver,
            in_flight: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)),
            index: None,
        }
    }

    pub fn with_concurrency(mut self, max_in_flight: usize) -> Self {
        self.in_flight = Arc::new(Semaphore::new(max_in_flight.max(1)));
        self
    }

    pub fn with_index(mut self, index: IndexGenerator) -> Self {
        self.index = Some(index);
        self
    }

    pub fn driver(&self) -> &Arc<BuildDriver> {
        &self.driver
    }

    /// Builds every source with at most `max_in_flight` builds running, then
    /// regenerates the index once. The shared library is never scheduled.
    pub async fn run_all(&self, sources: Vec<SourceFile>) -> Summary {
        let mut summary = Summary::default();
        let mut tasks = JoinSet::new();

        for source in sources.into_iter().filter(|s| !s.is_shared_library()) {
            let permit = match self.in_flight.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    error!("Build limiter closed; skipping {}", source.path.display());
                    summary.record(BuildOutcome::Failed);
                    continue;
                }
            };
            let driver = Arc::clone(&self.driver);
            tasks.spawn(async move {
                let _permit = permit;
                driver.build(&source).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    error!("Build task aborted: {}", e);
                    summary.record(BuildOutcome::Failed);
                }
            }
        }

        info!(
            "Done. Total: {}, built: {}, skipped: {}, failed: {}",
            summary.total, summary.built, summary.skipped, summary.failed
        );

        if let Some(index) = &self.index {
            match index.generate() {
                Ok(path) => info!("Index written: {}", path.display()),
                Err(e) => warn!("Index generation failed: {}", e),
            }
        }

        summary
    }
}

#[async_trait]
impl BatchRunner for BatchScheduler {
    async fn run_batch(&self, sources: Vec<SourceFile>) -> Summary {
        self.run_all(sources).await
    }
}
