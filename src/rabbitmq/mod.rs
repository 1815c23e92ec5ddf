// src/rabbitmq/mod.rs
// Broker messaging core: fire-and-forget publish and request/reply

pub mod errors;

mod amqp_client;
mod channel_manager;
mod correlation;
mod message;
mod publisher;
mod request_response;

// Re-export specific items to simplify imports elsewhere
pub use amqp_client::{redact_uri, AmqpSession, AmqpTransport, DeliveryStream, LapinTransport};
pub use channel_manager::ChannelManager;
pub use correlation::{CorrelationId, CORRELATION_ID_LEN};
pub use errors::{RabbitMQError, Result};
pub use message::{OutboundMessage, ReplyDelivery, ReplyRoute, CONTENT_TYPE};
pub use publisher::Publisher;
pub use request_response::{await_reply, RpcClient};
