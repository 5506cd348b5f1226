//! The transform step as seen by the Supervisor.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use cipherq_core::transform::{
    run_transform, ProcessError, TransformArgs, TransformCommand, TransformOutcome,
};

use crate::config::WorkerConfig;

/// Runs the cryptographic transform for one job inside `workspace`.
#[async_trait]
pub trait Transform: Send + Sync {
    async fn run(
        &self,
        job_id: &str,
        workspace: &Path,
        args: TransformArgs,
    ) -> Result<TransformOutcome, ProcessError>;
}

/// Spawns the external transform program for every job.
#[derive(Debug, Clone)]
pub struct ProcessTransform {
    launcher: Vec<String>,
    program: PathBuf,
    timeout: Duration,
}

impl ProcessTransform {
    pub fn new(launcher: Vec<String>, program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            launcher,
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &WorkerConfig) -> Self {
        Self::new(
            config.transform_launcher.clone(),
            config.transform_program.clone(),
            config.transform_timeout,
        )
    }

    pub fn command(&self, workspace: &Path, args: TransformArgs) -> TransformCommand {
        TransformCommand {
            launcher: self.launcher.clone(),
            program: self.program.clone(),
            working_directory: workspace.to_path_buf(),
            timeout: self.timeout,
            args,
        }
    }
}

#[async_trait]
impl Transform for ProcessTransform {
    async fn run(
        &self,
        job_id: &str,
        workspace: &Path,
        args: TransformArgs,
    ) -> Result<TransformOutcome, ProcessError> {
        run_transform(&self.command(workspace, args), job_id).await
    }
}
