//! Domain types and pure logic for the cipherq job pipeline.
//!
//! Everything here is free of network I/O so it can be shared by the
//! worker, the API process and their tests:
//!
//! - [`job`] / [`result`]: the Job and Result messages carried on the bus.
//! - [`validation`]: the Job Validator.
//! - [`iv`]: initialization vector generation and checks.
//! - [`naming`]: artifact and workspace naming rules.
//! - [`transform`]: invocation of the external transform program.

pub mod iv;
pub mod job;
pub mod naming;
pub mod result;
pub mod topics;
pub mod transform;
pub mod types;
pub mod validation;

pub use job::{CipherMode, JobMessage, KeyLength, Operation, ValidatedJob};
pub use result::{JobStatus, ResultMessage};
pub use validation::{ValidationError, Validator};
