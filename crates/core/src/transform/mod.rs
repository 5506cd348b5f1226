//! Invocation of the external transform program.
//!
//! The transform is an opaque executable called once per job with a fixed
//! flag contract (`--file --operation --mode --key --iv --keylen`). Only
//! its exit code decides success; its output is streamed to the log.

pub mod command;
pub mod process;

pub use command::{ProcessError, TransformArgs, TransformCommand, TransformOutcome};
pub use process::run_transform;
