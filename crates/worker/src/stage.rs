//! Per-job state machine and the report produced for each delivery.

use std::fmt;

use cipherq_core::result::ResultMessage;
use cipherq_core::types::JobId;
use cipherq_core::validation::ValidationError;

use crate::error::JobError;

/// Stage of a job inside the Supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStage {
    Received,
    Validating,
    Resolving,
    Fetching,
    Transforming,
    Uploading,
    Completed,
    Failed,
}

impl JobStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `next` may directly follow `self`.
    ///
    /// The happy path is strictly linear; `Failed` is reachable from every
    /// non-terminal stage.
    pub fn can_transition_to(self, next: JobStage) -> bool {
        use JobStage::*;

        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }
        matches!(
            (self, next),
            (Received, Validating)
                | (Validating, Resolving)
                | (Resolving, Fetching)
                | (Fetching, Transforming)
                | (Transforming, Uploading)
                | (Uploading, Completed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Validating => "validating",
            Self::Resolving => "resolving",
            Self::Fetching => "fetching",
            Self::Transforming => "transforming",
            Self::Uploading => "uploading",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered record of the stages one job went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageTrail {
    stages: Vec<JobStage>,
}

impl StageTrail {
    pub fn new() -> Self {
        Self {
            stages: vec![JobStage::Received],
        }
    }

    pub fn current(&self) -> JobStage {
        self.stages.last().copied().unwrap_or(JobStage::Received)
    }

    /// Move to `next`. Illegal transitions are logged and ignored.
    pub fn advance(&mut self, next: JobStage) {
        let current = self.current();
        if !current.can_transition_to(next) {
            tracing::error!(from = %current, to = %next, "Illegal job stage transition");
            return;
        }
        tracing::debug!(from = %current, to = %next, "Job stage");
        self.stages.push(next);
    }

    pub fn stages(&self) -> &[JobStage] {
        &self.stages
    }
}

impl Default for StageTrail {
    fn default() -> Self {
        Self::new()
    }
}

/// How a delivery ended.
#[derive(Debug)]
pub enum JobOutcome {
    /// The transform ran and the artifact was published.
    Completed(ResultMessage),
    /// The job failed after validation; `result` was published.
    Failed {
        result: ResultMessage,
        error: JobError,
    },
    /// Validation failed; nothing was published.
    Rejected(ValidationError),
    /// The job id is already in flight or recently completed; dropped.
    Duplicate,
}

/// Summary of one processed delivery.
#[derive(Debug)]
pub struct JobReport {
    /// `None` when the payload could not be validated.
    pub job_id: Option<JobId>,
    pub trail: StageTrail,
    pub outcome: JobOutcome,
}

impl JobReport {
    pub fn stages(&self) -> &[JobStage] {
        self.trail.stages()
    }

    /// The Result Message published for this job, if any.
    pub fn result(&self) -> Option<&ResultMessage> {
        match &self.outcome {
            JobOutcome::Completed(result) | JobOutcome::Failed { result, .. } => Some(result),
            JobOutcome::Rejected(_) | JobOutcome::Duplicate => None,
        }
    }
}
