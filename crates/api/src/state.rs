use std::sync::Arc;

use cipherq_events::MessageBus;
use cipherq_worker::Supervisor;

use crate::config::ServerConfig;
use crate::ws::ObserverRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Bus the dispatch bridge publishes to.
    pub bus: Arc<dyn MessageBus>,
    /// Connected status observers.
    pub observers: Arc<ObserverRegistry>,
    /// Worker pool, for health reporting.
    pub supervisor: Supervisor,
}
