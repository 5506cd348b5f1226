//! File Relay: transfers between the worker and the record store.
//!
//! - [`RecordStoreClient::fetch`] downloads a job's input file.
//! - [`RecordStoreClient::publish`] uploads a processed artifact.
//! - [`RecordStoreClient::update_iv`] records a generated IV.
//!
//! Fetch and publish are retried with exponential backoff per
//! [`RetryPolicy`]; the IV update is a single attempt.

pub mod client;
pub mod error;
pub mod retry;

pub use client::RecordStoreClient;
pub use error::{StoreUpdateError, TransferError};
pub use retry::RetryPolicy;
