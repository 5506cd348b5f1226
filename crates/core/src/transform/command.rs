//! Transform command description, outcome and error types.

use std::path::PathBuf;
use std::time::Duration;

/// Per-job arguments handed to the transform program.
#[derive(Clone, PartialEq, Eq)]
pub struct TransformArgs {
    pub file: String,
    pub operation: String,
    pub mode: String,
    pub key: String,
    /// Hex IV, empty for modes that take none.
    pub iv: String,
    pub keylen: u32,
}

impl TransformArgs {
    /// Render the flag contract in its fixed order.
    pub fn to_argv(&self) -> Vec<String> {
        vec![
            "--file".into(),
            self.file.clone(),
            "--operation".into(),
            self.operation.clone(),
            "--mode".into(),
            self.mode.clone(),
            "--key".into(),
            self.key.clone(),
            "--iv".into(),
            self.iv.clone(),
            "--keylen".into(),
            self.keylen.to_string(),
        ]
    }
}

impl std::fmt::Debug for TransformArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformArgs")
            .field("file", &self.file)
            .field("operation", &self.operation)
            .field("mode", &self.mode)
            .field("key", &"<redacted>")
            .field("iv", &self.iv)
            .field("keylen", &self.keylen)
            .finish()
    }
}

/// Everything needed to run the transform once.
#[derive(Debug, Clone)]
pub struct TransformCommand {
    /// Optional launcher prefix (e.g. `mpirun -np 2`), spawned in place of
    /// the program with the program path as its first trailing argument.
    pub launcher: Vec<String>,
    /// Path (or `PATH` name) of the transform executable.
    pub program: PathBuf,
    /// Directory holding the job's source artifact.
    pub working_directory: PathBuf,
    /// Wall-clock limit before the process is killed.
    pub timeout: Duration,
    pub args: TransformArgs,
}

impl TransformCommand {
    /// Executable actually spawned and the full argument list.
    pub fn argv(&self) -> (String, Vec<String>) {
        let program = self.program.to_string_lossy().into_owned();
        match self.launcher.split_first() {
            Some((launcher, rest)) => {
                let mut args = rest.to_vec();
                args.push(program);
                args.extend(self.args.to_argv());
                (launcher.clone(), args)
            }
            None => (program, self.args.to_argv()),
        }
    }
}

/// Process termination details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOutcome {
    /// Exit code (`-1` if killed by a signal).
    pub exit_code: i32,
    pub duration_ms: u64,
}

impl TransformOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Promote a non-zero exit into [`ProcessError::NonZeroExit`].
    pub fn into_result(self) -> Result<Self, ProcessError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ProcessError::NonZeroExit {
                exit_code: self.exit_code,
            })
        }
    }
}

/// The transform failed to start or did not finish cleanly.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Transform executable not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Transform timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Transform exited with code {exit_code}")]
    NonZeroExit { exit_code: i32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
