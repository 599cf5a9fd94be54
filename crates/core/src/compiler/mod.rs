//! Invocation seam for the external geometry compiler.

mod process;

pub use process::ProcessCompiler;

use crate::config::ImageSize;
use crate::error::Result;
use crate::model::ViewSpec;
use async_trait::async_trait;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompileTarget {
    Mesh,
    Preview {
        view: &'static ViewSpec,
        size: ImageSize,
    },
}

/// One compiler run producing exactly one artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub target: CompileTarget,
}

impl CompileJob {
    pub fn mesh(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            target: CompileTarget::Mesh,
        }
    }

    pub fn preview(
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        view: &'static ViewSpec,
        size: ImageSize,
    ) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            target: CompileTarget::Preview { view, size },
        }
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self.target, CompileTarget::Mesh)
    }

    /// Command-line arguments, excluding the program itself.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["-o".to_string(), self.output.display().to_string()];
        if let CompileTarget::Preview { view, size } = self.target {
            args.push(format!("--imgsize={}", size.flag()));
            args.push(format!("--projection={}", view.projection.flag()));
            args.push(format!("--camera={}", view.camera));
            args.push("--render".to_string());
            args.push("--autocenter".to_string());
            args.push("--viewall".to_string());
            args.push("--view=axes".to_string());
        }
        args.push(self.input.display().to_string());
        args
    }
}

#[async_trait]
pub trait GeometryCompiler: Send + Sync {
    /// Produces `job.output`. `Ok` means the artifact was (or, in detached
    /// mode, will be) written.
    async fn compile(&self, job: &CompileJob) -> Result<()>;
}
