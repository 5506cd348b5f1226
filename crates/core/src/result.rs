//! The Result Message published when a job reaches a terminal state.

use serde::{Deserialize, Serialize};

use crate::job::{Operation, ValidatedJob};
use crate::types::JobId;

/// Terminal outcome of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Failure,
}

/// Outcome record published on the result topic.
///
/// The serialized text is relayed verbatim to every connected observer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMessage {
    pub job_id: JobId,
    pub file_name: String,
    pub operation: Operation,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl ResultMessage {
    pub fn success(job: &ValidatedJob) -> Self {
        Self {
            job_id: job.job_id.clone(),
            file_name: job.file_name.clone(),
            operation: job.operation,
            status: JobStatus::Success,
            error_detail: None,
        }
    }

    pub fn failure(job: &ValidatedJob, detail: impl Into<String>) -> Self {
        Self {
            job_id: job.job_id.clone(),
            file_name: job.file_name.clone(),
            operation: job.operation,
            status: JobStatus::Failure,
            error_detail: Some(detail.into()),
        }
    }

    /// Encode as the flat JSON text carried on the bus.
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_payload(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
