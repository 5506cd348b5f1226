use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::ws::registry::ObserverRegistry;

/// Spawn a task that pings every observer each `interval` until `cancel`
/// fires. Observers whose channel has closed are dropped on the way.
pub fn start_heartbeat(
    observers: Arc<ObserverRegistry>,
    interval: Duration,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Heartbeat stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let reached = observers.ping_all().await;
                    tracing::debug!(reached, "Observer heartbeat ping");
                }
            }
        }
    })
}
