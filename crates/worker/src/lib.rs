//! Worker side of the cipherq pipeline.
//!
//! The [`Supervisor`] consumes Job Messages from the dispatch topic and runs
//! each one through a fixed state machine on a bounded pool:
//!
//! ```text
//! Received -> Validating -> Resolving -> Fetching -> Transforming -> Uploading -> Completed
//!                 \______________\___________\____________\______________\____> Failed
//! ```
//!
//! Jobs that reach `Resolving` or beyond end with exactly one Result Message
//! on the result topic.

pub mod config;
pub mod dedup;
pub mod error;
pub mod iv;
pub mod stage;
pub mod store;
pub mod supervisor;
pub mod transform;
pub mod workspace;

pub use config::{ConfigError, WorkerConfig};
pub use error::JobError;
pub use iv::IvResolver;
pub use stage::{JobOutcome, JobReport, JobStage};
pub use store::ArtifactStore;
pub use supervisor::Supervisor;
pub use transform::{ProcessTransform, Transform};
