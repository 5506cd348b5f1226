//! cipherq API server library.
//!
//! Hosts the observer channel and the status fan-out, and exposes the
//! building blocks (config, state, routes, WebSocket registry) so the
//! binary entrypoint and integration tests share them.

pub mod config;
pub mod error;
pub mod fanout;
pub mod router;
pub mod routes;
pub mod state;
pub mod ws;
