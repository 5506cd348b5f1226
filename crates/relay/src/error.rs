use std::path::PathBuf;

/// Failure to move a file to or from the record store.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// The HTTP request itself failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Record store returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// The processed artifact to upload does not exist.
    #[error("Artifact not found: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("Invalid record store URL: {0}")]
    InvalidUrl(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    /// Whether another attempt could succeed.
    ///
    /// Network failures, server errors, 408 and 429 are transient. Client
    /// errors and local faults are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Request(e) => !e.is_builder(),
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 408 || *status == 429,
            Self::MissingArtifact(_) | Self::InvalidUrl(_) | Self::Io(_) => false,
        }
    }
}

/// Failure to record a generated IV against its job.
#[derive(Debug, thiserror::Error)]
pub enum StoreUpdateError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Record store returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },
}
