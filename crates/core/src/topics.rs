//! Default topic names on the message bus.
//!
//! These match the topics the intake layer publishes to and the status
//! front end listens on. Both can be overridden through configuration.

/// Topic carrying Job Messages from the intake layer to the workers.
pub const DISPATCH_TOPIC: &str = "aesTopic";

/// Topic carrying Result Messages from the workers to the status fan-out.
pub const RESULT_TOPIC: &str = "aesResultTopic";
