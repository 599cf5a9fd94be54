use scadwatch_core::{Pipeline, Summary, WatchConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

pub fn run(root: PathBuf, json: bool) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = WatchConfig::from_env(root)?;
    let rt = tokio::runtime::Runtime::new()?;

    info!("Using OpenSCAD: {}", config.compiler);
    let pipeline = Pipeline::from_config(config);
    let summary = rt.block_on(pipeline.build_all());

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    Ok(ExitCode::from(exit_status(&summary)))
}

/// Process status for a finished one-shot build: 1 when any source failed.
fn exit_status(summary: &Summary) -> u8 {
    if summary.is_success() { 0 } else { 1 }
}
