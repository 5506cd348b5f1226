//! Observer channel over WebSocket.
//!
//! Provides the observer registry, heartbeat task and the HTTP upgrade
//! handler mounted at `/ws-status`.

mod handler;
mod heartbeat;
pub mod registry;

pub use handler::ws_status_handler;
pub use heartbeat::start_heartbeat;
pub use registry::ObserverRegistry;
