use super::{CompileJob, GeometryCompiler};
use crate::config::MeshMode;
use crate::error::{Result, ScadwatchError};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

/// Runs the compiler as a child process.
pub struct ProcessCompiler {
    program: String,
    prefix_args: Vec<String>,
    mesh_mode: MeshMode,
}

impl ProcessCompiler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
            mesh_mode: MeshMode::Await,
        }
    }

    /// Splits a configured command line such as `flatpak run org.openscad.OpenSCAD`.
    pub fn from_command_line(command: &str) -> Self {
        match shlex::split(command) {
            Some(mut parts) if !parts.is_empty() => {
                let program = parts.remove(0);
                Self::new(program).with_prefix_args(parts)
            }
            _ => Self::new(command),
        }
    }

    pub fn with_prefix_args(mut self, args: Vec<String>) -> Self {
        self.prefix_args = args;
        self
    }

    pub fn with_mesh_mode(mut self, mode: MeshMode) -> Self {
        self.mesh_mode = mode;
        self
    }

    fn command(&self, job: &CompileJob) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.prefix_args)
            .args(job.args())
            .stdin(Stdio::null())
            .kill_on_drop(false);
        cmd
    }

    async fn run_awaited(&self, job: &CompileJob) -> Result<()> {
        let output = self
            .command(job)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ScadwatchError::Compiler {
                path: job.input.clone(),
                message: format!("failed to spawn {}: {e}", self.program),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
            tracing::debug!(target: "scadwatch::compiler", "{}", line);
        }

        if output.status.success() {
            return Ok(());
        }

        let tail = stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or_default();
        Err(ScadwatchError::Compiler {
            path: job.input.clone(),
            message: format!("{} exited with {}: {}", self.program, output.status, tail),
        })
    }

    fn run_detached(&self, job: &CompileJob) -> Result<()> {
        let mut child = self
            .command(job)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ScadwatchError::Compiler {
                path: job.input.clone(),
                message: format!("failed to spawn {}: {e}", self.program),
            })?;

        let output = job.output.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => {
                    tracing::info!("Detached build finished: {}", output.display());
                }
                Ok(status) => {
                    tracing::error!(
                        "Detached build of {} exited with {}",
                        output.display(),
                        status
                    );
                }
                Err(e) => tracing::error!("Detached build of {} lost: {}", output.display(), e),
            }
        });
        Ok(())
    }
}

#[async_trait]
impl GeometryCompiler for ProcessCompiler {
    async fn compile(&self, job: &CompileJob) -> Result<()> {
        if let Some(parent) = job.output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if job.is_mesh() && self.mesh_mode == MeshMode::Detached {
            return self.run_detached(job);
        }
        self.run_awaited(job).await
    }
}
