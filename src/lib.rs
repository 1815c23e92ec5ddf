//! Command-line client for the CNP back office.
//!
//! Commands are published to topic exchanges on RabbitMQ. Some are
//! fire-and-forget, others block for a reply matched by correlation id.

pub mod commands;
pub mod config;
pub mod env;
pub mod logging;
pub mod rabbitmq;
pub mod testing;
