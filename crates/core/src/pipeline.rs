//! Wires configuration, compiler, scheduler and watcher together.

use crate::build::{BatchScheduler, BuildDriver, BuildState, Summary};
use crate::compiler::{GeometryCompiler, ProcessCompiler};
use crate::config::WatchConfig;
use crate::discovery::buildable_sources;
use crate::error::Result;
use crate::index::IndexGenerator;
use crate::watch::{Debouncer, NotifySource, WatchService};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Pipeline {
    config: WatchConfig,
    state: Arc<BuildState>,
    scheduler: Arc<BatchScheduler>,
}

impl Pipeline {
    /// Uses the configured compiler executable.
    pub fn from_config(config: WatchConfig) -> Self {
        let compiler = ProcessCompiler::from_command_line(&config.compiler)
            .with_mesh_mode(config.mesh_mode);
        Self::with_compiler(config, Arc::new(compiler))
    }

    pub fn with_compiler(config: WatchConfig, compiler: Arc<dyn GeometryCompiler>) -> Self {
        let state = Arc::new(BuildState::new());
        let driver = BuildDriver::new(compiler, Arc::clone(&state))
            .with_image_size(config.image_size)
            .with_dimension_overlay(config.dimension_overlay);
        let scheduler = BatchScheduler::new(Arc::new(driver))
            .with_concurrency(config.concurrency)
            .with_index(IndexGenerator::new(config.models_root()));
        Self {
            config,
            state,
            scheduler: Arc::new(scheduler),
        }
    }

    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<BuildState> {
        &self.state
    }

    pub fn scheduler(&self) -> &Arc<BatchScheduler> {
        &self.scheduler
    }

    /// One pass over every buildable source under the models root, followed
    /// by index regeneration.
    pub async fn build_all(&self) -> Summary {
        let models_root = self.config.models_root();
        let sources = buildable_sources(&models_root);
        tracing::info!(
            "Building {} sources under {}",
            sources.len(),
            models_root.display()
        );
        self.scheduler.run_all(sources).await
    }

    /// Installs the filesystem watcher. The returned task ends when
    /// `cancel_token` is cancelled.
    pub fn watch(&self, cancel_token: CancellationToken) -> Result<JoinHandle<()>> {
        let models_root = self.config.models_root();
        std::fs::create_dir_all(&models_root)?;
        // Native backends may report resolved paths; keep event paths and the
        // relevance root in the same form.
        let models_root = models_root.canonicalize().unwrap_or(models_root);
        let source = NotifySource::open(
            &models_root,
            self.config.poll_interval,
            self.config.force_poll,
        )?;
        let debouncer = Debouncer::new(
            Arc::clone(&self.state),
            self.scheduler.clone(),
            self.config.debounce,
        );
        tracing::info!(
            "Watching {} (debounce {}ms)",
            models_root.display(),
            self.config.debounce.as_millis()
        );
        Ok(WatchService::spawn(
            source,
            models_root,
            debouncer,
            cancel_token,
        ))
    }
}
