use scadwatch_core::{Pipeline, WatchConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub fn run(root: PathBuf) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = WatchConfig::from_env(root)?;
    let rt = tokio::runtime::Runtime::new()?;

    info!("Using OpenSCAD: {}", config.compiler);
    let pipeline = Pipeline::from_config(config);

    rt.block_on(async {
        let summary = pipeline.build_all().await;
        if !summary.is_success() {
            warn!("{} models failed in the initial pass", summary.failed);
        }

        let cancel_token = CancellationToken::new();
        let watcher = pipeline.watch(cancel_token.clone())?;
        info!("Press Ctrl+C to stop.");

        tokio::signal::ctrl_c().await?;
        cancel_token.cancel();
        let _ = watcher.await;
        info!("Watcher stopped.");
        Ok::<_, Box<dyn std::error::Error>>(())
    })?;

    Ok(ExitCode::SUCCESS)
}
