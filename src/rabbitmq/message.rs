// src/rabbitmq/message.rs
use std::collections::BTreeMap;

use super::correlation::CorrelationId;
use super::errors::{RabbitMQError, Result};

/// Content type stamped on every outbound message.
pub const CONTENT_TYPE: &str = "text/plain";

/// AMQP delivery mode for messages the broker should keep across restarts.
pub const PERSISTENT_DELIVERY_MODE: u8 = 2;

/// A message to hand to the broker. The body is opaque bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    exchange: String,
    routing_key: String,
    body: Vec<u8>,
    headers: BTreeMap<String, String>,
    persistent: bool,
    mandatory: bool,
}

impl OutboundMessage {
    pub fn new(
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            body: body.into(),
            headers: BTreeMap::new(),
            persistent: false,
            mandatory: false,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Ask the broker to store the message on disk (delivery mode 2).
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Ask the broker to return the message instead of dropping it when no
    /// queue is bound for the routing key.
    pub fn mandatory(mut self, mandatory: bool) -> Self {
        self.mandatory = mandatory;
        self
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn is_mandatory(&self) -> bool {
        self.mandatory
    }

    /// Checks the fields that must be present before any connection is made.
    pub fn validate(&self) -> Result<()> {
        if self.exchange.trim().is_empty() {
            return Err(RabbitMQError::InvalidMessage(
                "exchange name cannot be empty".to_string(),
            ));
        }
        if self.routing_key.trim().is_empty() {
            return Err(RabbitMQError::InvalidMessage(
                "routing key cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where the remote side should send its answer, and how it is tagged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRoute {
    pub correlation_id: CorrelationId,
    pub reply_to: String,
}

/// A message delivered on a reply queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyDelivery {
    pub correlation_id: Option<String>,
    pub body: Vec<u8>,
}

impl ReplyDelivery {
    pub fn new(correlation_id: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            correlation_id: Some(correlation_id.into()),
            body: body.into(),
        }
    }

    pub fn matches(&self, correlation_id: &CorrelationId) -> bool {
        self.correlation_id.as_deref() == Some(correlation_id.as_str())
    }
}
