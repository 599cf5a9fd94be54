//! Per-source build: staleness check, compiler runs, image post-processing.

use super::state::BuildState;
use crate::compiler::{CompileJob, GeometryCompiler};
use crate::config::{DEFAULT_IMAGE_SIZE, ImageSize};
use crate::model::{Artifact, ArtifactKind, SourceFile, artifacts_for, mesh_path};
use crate::preview::{self, MeshBounds};
use crate::staleness;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildOutcome {
    Built,
    Skipped,
    Failed,
}

pub struct BuildDriver {
    compiler: Arc<dyn GeometryCompiler>,
    state: Arc<BuildState>,
    image_size: ImageSize,
    dimension_overlay: bool,
}

impl BuildDriver {
    pub fn new(compiler: Arc<dyn GeometryCompiler>, state: Arc<BuildState>) -> Self {
        Self {
            compiler,
            state,
            image_size: DEFAULT_IMAGE_SIZE,
            dimension_overlay: false,
        }
    }

    pub fn with_image_size(mut self, size: ImageSize) -> Self {
        self.image_size = size;
        self
    }

    pub fn with_dimension_overlay(mut self, enabled: bool) -> Self {
        self.dimension_overlay = enabled;
        self
    }

    pub fn state(&self) -> &Arc<BuildState> {
        &self.state
    }

    pub async fn build(&self, source: &SourceFile) -> BuildOutcome {
        if source.is_shared_library() {
            return BuildOutcome::Skipped;
        }

        let artifacts = artifacts_for(source);
        let checks = match staleness::needs_rebuild(source, &artifacts) {
            Ok(checks) => checks,
            Err(e) => {
                error!("Cannot build {}: {}", source.path.display(), e);
                return BuildOutcome::Failed;
            }
        };
        let stale: Vec<Artifact> = checks
            .into_iter()
            .filter(|c| c.stale)
            .map(|c| c.artifact)
            .collect();
        if stale.is_empty() {
            return BuildOutcome::Skipped;
        }

        let Some(_guard) = self.state.try_begin_build(&source.path) else {
            debug!("Already building {}", source.path.display());
            return BuildOutcome::Skipped;
        };

        info!(
            "Rendering {} ({} stale artifacts)",
            source.path.display(),
            stale.len()
        );
        self.build_stale(source, &stale).await
    }

    async fn build_stale(&self, source: &SourceFile, stale: &[Artifact]) -> BuildOutcome {
        let mut produced = 0usize;
        let mut failed = false;

        if let Some(mesh) = stale.iter().find(|a| a.is_mesh()) {
            let job = CompileJob::mesh(&source.path, &mesh.path);
            match self.compiler.compile(&job).await {
                Ok(()) => {
                    info!("Built: {}", mesh.path.display());
                    produced += 1;
                }
                Err(e) => {
                    // Every preview would hit the same compile error.
                    error!("Error rendering {}: {}", source.path.display(), e);
                    return BuildOutcome::Failed;
                }
            }
        }

        let mut bounds: Option<Option<MeshBounds>> = None;
        for artifact in stale {
            let ArtifactKind::Preview(view) = artifact.kind else {
                continue;
            };
            let job = CompileJob::preview(&source.path, &artifact.path, view, self.image_size);
            if let Err(e) = self.compiler.compile(&job).await {
                error!(
                    "Error rendering {} view of {}: {}",
                    view.name,
                    source.path.display(),
                    e
                );
                failed = true;
                continue;
            }

            preview::canonicalize(&artifact.path);
            if self.dimension_overlay {
                let bounds = bounds
                    .get_or_insert_with(|| MeshBounds::from_stl_file(&mesh_path(&source.path)));
                if let Some(bounds) = bounds {
                    if let Err(e) = preview::annotate_with_bounds(&artifact.path, bounds) {
                        warn!(
                            "Skipping dimension label on {}: {}",
                            artifact.path.display(),
                            e
                        );
                    }
                }
            }
            debug!("Built: {}", artifact.path.display());
            produced += 1;
        }

        if failed {
            BuildOutcome::Failed
        } else if produced > 0 {
            BuildOutcome::Built
        } else {
            BuildOutcome::Skipped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::CompileTarget;
    use crate::error::{Result, ScadwatchError};
    use async_trait::async_trait;
    use std::fs;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingCompiler {
        jobs: Mutex<Vec<CompileJob>>,
        fail_views: Vec<&'static str>,
        fail_mesh: bool,
    }

    #[async_trait]
    impl GeometryCompiler for RecordingCompiler {
        async fn compile(&self, job: &CompileJob) -> Result<()> {
            self.jobs.lock().unwrap().push(job.clone());
            tokio::time::sleep(Duration::from_millis(20)).await;
            let fail = match job.target {
                CompileTarget::Mesh => self.fail_mesh,
                CompileTarget::Preview { view, .. } => self.fail_views.contains(&view.name),
            };
            if fail {
                return Err(ScadwatchError::Compiler {
                    path: job.input.clone(),
                    message: "exit 1".to_string(),
                });
            }
            fs::write(&job.output, b"out").unwrap();
            Ok(())
        }
    }

    fn driver(compiler: Arc<RecordingCompiler>) -> BuildDriver {
        BuildDriver::new(compiler, Arc::new(BuildState::new()))
    }

    fn source_in(dir: &std::path::Path) -> SourceFile {
        let path = dir.join("widget.scad");
        fs::write(&path, "cube(1);").unwrap();
        SourceFile::new(path)
    }

    #[tokio::test]
    async fn builds_every_missing_artifact_once() {
        let temp = tempfile::tempdir().unwrap();
        let source = source_in(temp.path());
        let compiler = Arc::new(RecordingCompiler::default());
        let driver = driver(compiler.clone());

        assert_eq!(driver.build(&source).await, BuildOutcome::Built);
        let jobs = compiler.jobs.lock().unwrap().clone();
        assert_eq!(jobs.len(), 5);
        assert!(jobs[0].is_mesh());
        assert!(!driver.state().is_building(&source.path));
    }

    #[tokio::test]
    async fn fresh_artifacts_skip_without_compiling() {
        let temp = tempfile::tempdir().unwrap();
        let source = source_in(temp.path());
        let compiler = Arc::new(RecordingCompiler::default());
        let driver = driver(compiler.clone());

        driver.build(&source).await;
        compiler.jobs.lock().unwrap().clear();

        assert_eq!(driver.build(&source).await, BuildOutcome::Skipped);
        assert!(compiler.jobs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_build_of_same_source_is_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let source = source_in(temp.path());
        let compiler = Arc::new(RecordingCompiler::default());
        let driver = driver(compiler.clone());

        let (a, b) = tokio::join!(driver.build(&source), driver.build(&source));
        let mut outcomes = [a, b];
        outcomes.sort_by_key(|o| *o as u8);
        assert_eq!(outcomes, [BuildOutcome::Built, BuildOutcome::Skipped]);
        assert_eq!(compiler.jobs.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn failed_view_keeps_other_artifacts() {
        let temp = tempfile::tempdir().unwrap();
        let source = source_in(temp.path());
        let compiler = Arc::new(RecordingCompiler {
            fail_views: vec!["xz"],
            ..Default::default()
        });
        let driver = driver(compiler.clone());

        assert_eq!(driver.build(&source).await, BuildOutcome::Failed);
        assert!(temp.path().join("widget.stl").exists());
        assert!(temp.path().join("preview.iso.png").exists());
        assert!(!temp.path().join("preview.xz.png").exists());
        assert!(temp.path().join("preview.yz.png").exists());
        assert!(!driver.state().is_building(&source.path));
    }

    #[tokio::test]
    async fn mesh_failure_stops_the_file() {
        let temp = tempfile::tempdir().unwrap();
        let source = source_in(temp.path());
        let compiler = Arc::new(RecordingCompiler {
            fail_mesh: true,
            ..Default::default()
        });
        let driver = driver(compiler.clone());

        assert_eq!(driver.build(&source).await, BuildOutcome::Failed);
        assert_eq!(compiler.jobs.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_source_fails_and_shared_library_skips() {
        let temp = tempfile::tempdir().unwrap();
        let compiler = Arc::new(RecordingCompiler::default());
        let driver = driver(compiler.clone());

        let missing = SourceFile::new(temp.path().join("gone.scad"));
        assert_eq!(driver.build(&missing).await, BuildOutcome::Failed);

        let library = temp.path().join("modules.scad");
        fs::write(&library, "module m(){}").unwrap();
        assert_eq!(
            driver.build(&SourceFile::new(library)).await,
            BuildOutcome::Skipped
        );
        assert!(compiler.jobs.lock().unwrap().is_empty());
    }

    /// Writes an ASCII STL and a flat grey PNG with a text chunk.
    struct RenderingCompiler;

    #[async_trait]
    impl GeometryCompiler for RenderingCompiler {
        async fn compile(&self, job: &CompileJob) -> Result<()> {
            match job.target {
                CompileTarget::Mesh => fs::write(
                    &job.output,
                    "solid s\nvertex 0 0 0\nvertex 12 5 0\nvertex 0 0 3\nendsolid s\n",
                )?,
                CompileTarget::Preview { .. } => {
                    let mut bytes = Vec::new();
                    let mut encoder = png::Encoder::new(&mut bytes, 160, 120);
                    encoder.set_color(png::ColorType::Rgba);
                    encoder.set_depth(png::BitDepth::Eight);
                    encoder
                        .add_text_chunk("Software".to_string(), "render".to_string())
                        .unwrap();
                    let mut writer = encoder.write_header().unwrap();
                    writer.write_image_data(&[200u8; 160 * 120 * 4]).unwrap();
                    writer.finish().unwrap();
                    fs::write(&job.output, bytes)?;
                }
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn dimension_overlay_marks_canonical_previews() {
        let plain_dir = tempfile::tempdir().unwrap();
        let labelled_dir = tempfile::tempdir().unwrap();
        let plain = source_in(plain_dir.path());
        let labelled = source_in(labelled_dir.path());

        let state = Arc::new(BuildState::new());
        let plain_driver = BuildDriver::new(Arc::new(RenderingCompiler), state.clone());
        let labelled_driver =
            BuildDriver::new(Arc::new(RenderingCompiler), state).with_dimension_overlay(true);

        assert_eq!(plain_driver.build(&plain).await, BuildOutcome::Built);
        assert_eq!(labelled_driver.build(&labelled).await, BuildOutcome::Built);

        for view in ["iso", "xy", "xz", "yz"] {
            let name = format!("preview.{view}.png");
            let without = fs::read(plain_dir.path().join(&name)).unwrap();
            let with = fs::read(labelled_dir.path().join(&name)).unwrap();
            assert_ne!(without, with, "{view} was not labelled");
            assert_eq!(preview::canonical_bytes(&without).unwrap(), without);
            assert_eq!(preview::canonical_bytes(&with).unwrap(), with);
        }
    }
}
