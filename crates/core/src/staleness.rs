//! Timestamp-based freshness checks.
//!
//! An artifact is fresh iff it exists and its mtime is not older than the
//! source's. Content is never hashed: touching a source forces a rebuild, and
//! an artifact truncated by a crash mid-write still looks fresh.

use crate::error::{Result, ScadwatchError};
use crate::model::{Artifact, SourceFile};
use std::fs;
use std::path::Path;
use std::time::SystemTime;

#[derive(Debug, Clone)]
pub struct Staleness {
    pub artifact: Artifact,
    pub stale: bool,
}

/// One entry per artifact, in input order.
///
/// Fails only when the source itself cannot be stat'ed.
pub fn needs_rebuild(source: &SourceFile, artifacts: &[Artifact]) -> Result<Vec<Staleness>> {
    let source_mtime = modified(&source.path).map_err(|e| ScadwatchError::SourceUnreadable {
        path: source.path.clone(),
        source: e,
    })?;

    Ok(artifacts
        .iter()
        .map(|artifact| Staleness {
            artifact: artifact.clone(),
            stale: is_stale(source_mtime, &artifact.path),
        })
        .collect())
}

fn is_stale(source_mtime: SystemTime, artifact: &Path) -> bool {
    match modified(artifact) {
        Ok(artifact_mtime) => artifact_mtime < source_mtime,
        Err(_) => true,
    }
}

fn modified(path: &Path) -> std::io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}
