/// Common error types: duplicate topics, type mismatches, empty queues.
pub mod error;
/// Tracing-based logging setup.
pub mod logging;
/// Pub/Sub: Registry, typed topic handles, Publisher, Subscriber.
pub mod pubsub;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Operation errors and result alias.
pub use error::{BusError, BusResult};
/// Pub/Sub API.
pub use pubsub::{Message, PublishResult, Publisher, Registry, Subscriber, TopicHandle};
