// src/rabbitmq/errors.rs

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RabbitMQError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("RabbitMQ connection error: {0}")]
    ConnectionError(String),

    #[error("RabbitMQ channel error: {0}")]
    ChannelError(String),

    #[error("Reply queue error: {0}")]
    ReplyQueueError(String),

    #[error("RabbitMQ consume error: {0}")]
    ConsumeError(String),

    #[error("RabbitMQ publish error: {0}")]
    PublishError(String),

    #[error("Message to exchange '{exchange}' with routing key '{routing_key}' was returned as unroutable")]
    Unroutable { exchange: String, routing_key: String },

    #[error("No reply received within {0:?}")]
    Timeout(Duration),

    #[error("Request cancelled while waiting for a reply")]
    Cancelled,

    #[error("Reply stream closed before a matching reply arrived")]
    ReplyStreamClosed,

    #[error("RabbitMQ close error: {0}")]
    CloseError(String),
}

impl RabbitMQError {
    /// True for failures raised by the broker or the network rather than by
    /// the caller's input or the bounded wait.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            RabbitMQError::ConnectionError(_)
                | RabbitMQError::ChannelError(_)
                | RabbitMQError::ReplyQueueError(_)
                | RabbitMQError::ConsumeError(_)
                | RabbitMQError::PublishError(_)
                | RabbitMQError::Unroutable { .. }
                | RabbitMQError::ReplyStreamClosed
                | RabbitMQError::CloseError(_)
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RabbitMQError::Timeout(_))
    }
}

// Custom Result type for RabbitMQ operations
pub type Result<T> = std::result::Result<T, RabbitMQError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_not_a_transport_error() {
        let error = RabbitMQError::Timeout(Duration::from_millis(500));
        assert!(error.is_timeout());
        assert!(!error.is_transport());
        assert_eq!(error.to_string(), "No reply received within 500ms");
    }

    #[test]
    fn stage_is_part_of_the_message() {
        let error = RabbitMQError::PublishError("channel closed".to_string());
        assert!(error.is_transport());
        assert_eq!(error.to_string(), "RabbitMQ publish error: channel closed");
    }

    #[test]
    fn configuration_errors_are_not_transport_errors() {
        assert!(!RabbitMQError::ConfigError("empty".into()).is_transport());
        assert!(!RabbitMQError::InvalidMessage("empty".into()).is_transport());
        assert!(!RabbitMQError::Cancelled.is_transport());
    }
}
