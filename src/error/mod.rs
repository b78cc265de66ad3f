pub mod pubsub;

pub use pubsub::{BusError, BusResult};
