//! Test support: an in-memory broker standing in for RabbitMQ.

mod mocks;

pub use mocks::{FailPoint, MemoryBroker, PublishedMessage, SessionEvent};
