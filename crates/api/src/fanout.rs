//! Status Fan-out.
//!
//! [`StatusFanout`] subscribes once to the result topic and relays each
//! Result Message text verbatim to every registered observer.

use std::sync::Arc;

use cipherq_core::result::ResultMessage;
use cipherq_events::Subscription;

use crate::ws::ObserverRegistry;

pub struct StatusFanout {
    observers: Arc<ObserverRegistry>,
}

impl StatusFanout {
    pub fn new(observers: Arc<ObserverRegistry>) -> Self {
        Self { observers }
    }

    /// Relay results until the subscription ends (the bus is closed).
    pub async fn run(self, mut subscription: Subscription) {
        tracing::info!(topic = %subscription.topic(), "Status fan-out started");

        while let Some(payload) = subscription.recv().await {
            let delivered = self.observers.broadcast(&payload).await;
            match ResultMessage::from_payload(&payload) {
                Ok(result) => tracing::debug!(
                    job_id = %result.job_id,
                    status = ?result.status,
                    delivered,
                    "Result relayed to observers",
                ),
                Err(e) => tracing::warn!(
                    error = %e,
                    delivered,
                    "Relayed a result payload that does not decode",
                ),
            }
        }

        tracing::info!("Result topic closed, status fan-out shutting down");
    }
}
