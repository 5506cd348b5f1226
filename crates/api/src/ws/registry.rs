use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, RwLock};

/// Outbound frames buffered per observer before it counts as stalled.
pub const OBSERVER_BUFFER: usize = 256;

/// Channel sender half for pushing frames to an observer connection.
pub type ObserverSender = mpsc::Sender<Message>;

/// Registry of connected status observers.
///
/// Thread-safe via interior `RwLock`; shared as `Arc<ObserverRegistry>`.
/// Sends never wait on an observer: a full or closed channel removes that
/// observer and delivery to the others continues.
pub struct ObserverRegistry {
    observers: RwLock<HashMap<String, ObserverSender>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a connection and return the receiver its socket task drains.
    pub async fn register(&self, conn_id: String) -> mpsc::Receiver<Message> {
        let (tx, rx) = mpsc::channel(OBSERVER_BUFFER);
        self.observers.write().await.insert(conn_id, tx);
        rx
    }

    pub async fn unregister(&self, conn_id: &str) {
        self.observers.write().await.remove(conn_id);
    }

    /// Send `text` to every observer. Returns how many accepted it.
    pub async fn broadcast(&self, text: &str) -> usize {
        self.send_all(Message::Text(text.into())).await
    }

    /// Send a Ping frame to every observer.
    pub async fn ping_all(&self) -> usize {
        self.send_all(Message::Ping(Bytes::new())).await
    }

    pub async fn connection_count(&self) -> usize {
        self.observers.read().await.len()
    }

    /// Send a Close frame to every observer, then clear the registry.
    pub async fn shutdown_all(&self) {
        let mut observers = self.observers.write().await;
        let count = observers.len();
        for sender in observers.values() {
            let _ = sender.try_send(Message::Close(None));
        }
        observers.clear();
        tracing::info!(count, "Closed all observer connections");
    }

    /// Snapshot-send under the read lock, then drop failed observers under
    /// the write lock.
    async fn send_all(&self, message: Message) -> usize {
        let mut delivered = 0;
        let mut failed = Vec::new();
        {
            let observers = self.observers.read().await;
            for (id, sender) in observers.iter() {
                match sender.try_send(message.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(conn_id = %id, "Observer stalled, disconnecting");
                        failed.push(id.clone());
                    }
                    Err(TrySendError::Closed(_)) => failed.push(id.clone()),
                }
            }
        }

        if !failed.is_empty() {
            let mut observers = self.observers.write().await;
            for id in &failed {
                observers.remove(id);
            }
            tracing::debug!(removed = failed.len(), "Removed dead observers");
        }
        delivered
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
