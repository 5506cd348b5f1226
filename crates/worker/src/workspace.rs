//! Per-job working directories under the artifact root.

use std::path::{Path, PathBuf};

use cipherq_core::naming;

/// A job's private directory. Removed with [`Workspace::remove`].
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
}

impl Workspace {
    /// Create a fresh, empty workspace for `job_id` under `root`.
    ///
    /// Leftovers from an earlier attempt with the same id are discarded.
    pub async fn create(root: &Path, job_id: &str) -> std::io::Result<Self> {
        let path = root.join(naming::workspace_dir_name(job_id));
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => tracing::debug!(job_id, path = %path.display(), "Removed stale workspace"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        tokio::fs::create_dir_all(&path).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the workspace and everything in it. Failures are logged.
    pub async fn remove(self) {
        if let Err(e) = tokio::fs::remove_dir_all(&self.path).await {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove workspace");
        }
    }
}
