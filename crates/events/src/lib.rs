//! Message bus and completion notices for the cipherq pipeline.
//!
//! - [`MessageBus`]: pub/sub transport with named topics.
//! - [`LocalBus`]: in-process implementation backed by one
//!   `tokio::sync::broadcast` channel per topic.
//! - [`CompletionPublisher`]: emits Result Messages on the result topic.

pub mod bus;
pub mod publisher;

pub use bus::{BusError, LocalBus, MessageBus, Subscription};
pub use publisher::{CompletionPublisher, PublishError};
