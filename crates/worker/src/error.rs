use cipherq_core::transform::ProcessError;
use cipherq_core::validation::ValidationError;
use cipherq_relay::TransferError;

/// A job failed after it entered the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Source fetch failed: {0}")]
    Fetch(TransferError),

    #[error("Workspace error: {0}")]
    Workspace(std::io::Error),

    #[error(transparent)]
    Transform(#[from] ProcessError),

    #[error("Upload failed: {0}")]
    Upload(TransferError),
}

impl JobError {
    /// Text placed in `errorDetail` of the failure Result Message.
    ///
    /// Every timeout, whether of the transform or of a transfer, is
    /// reported as exactly `"timeout"`.
    pub fn detail(&self) -> String {
        match self {
            Self::Transform(ProcessError::Timeout { .. }) => "timeout".into(),
            Self::Fetch(TransferError::Request(e)) | Self::Upload(TransferError::Request(e))
                if e.is_timeout() =>
            {
                "timeout".into()
            }
            Self::Transform(ProcessError::NonZeroExit { exit_code }) => {
                format!("transform exited with code {exit_code}")
            }
            Self::Transform(ProcessError::NotFound(exe)) => {
                format!("transform program not found: {exe}")
            }
            Self::Transform(ProcessError::PermissionDenied(exe)) => {
                format!("transform program not executable: {exe}")
            }
            other => other.to_string(),
        }
    }
}
