//! Completion Publisher.
//!
//! Encodes a [`ResultMessage`] and publishes it on the result topic.
//! Publishing is fire-and-forget from the worker's point of view: a failed
//! publish is logged and the result is lost.

use std::sync::Arc;

use cipherq_core::result::ResultMessage;

use crate::bus::{BusError, MessageBus};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to encode result message: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Publishes Result Messages to a fixed topic.
#[derive(Clone)]
pub struct CompletionPublisher {
    bus: Arc<dyn MessageBus>,
    topic: String,
}

impl CompletionPublisher {
    pub fn new(bus: Arc<dyn MessageBus>, topic: impl Into<String>) -> Self {
        Self {
            bus,
            topic: topic.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Encode and publish `result`, reporting any failure to the caller.
    pub async fn try_publish(&self, result: &ResultMessage) -> Result<(), PublishError> {
        let payload = result.to_payload()?;
        self.bus.publish(&self.topic, payload).await?;
        Ok(())
    }

    /// Publish `result`, logging instead of returning a failure.
    pub async fn publish(&self, result: &ResultMessage) {
        match self.try_publish(result).await {
            Ok(()) => tracing::info!(
                job_id = %result.job_id,
                status = ?result.status,
                topic = %self.topic,
                "Result published",
            ),
            Err(e) => tracing::error!(
                job_id = %result.job_id,
                topic = %self.topic,
                error = %e,
                "Failed to publish result",
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
