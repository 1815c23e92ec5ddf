use std::sync::Arc;
use tracing::{debug, warn};

use super::amqp_client::{AmqpSession, AmqpTransport, LapinTransport};
use super::errors::Result;
use crate::config::BrokerConfig;

/// Hands out one broker session per call and releases it afterwards.
///
/// Sessions are never pooled: every publish or request/reply exchange gets its
/// own connection and channel so concurrent calls cannot see each other's
/// deliveries.
#[derive(Clone)]
pub struct ChannelManager {
    transport: Arc<dyn AmqpTransport>,
}

impl ChannelManager {
    /// Create a manager over any transport (the in-memory broker in tests)
    pub fn new(transport: Arc<dyn AmqpTransport>) -> Self {
        Self { transport }
    }

    /// Create a manager talking to RabbitMQ through lapin
    pub fn connect(config: &BrokerConfig) -> Result<Self> {
        let uri = config.amqp_uri()?;
        let transport = LapinTransport::new(uri, config.connect_timeout());
        Ok(Self::new(Arc::new(transport)))
    }

    pub async fn open(&self) -> Result<Box<dyn AmqpSession>> {
        let session = self.transport.open().await?;
        debug!(session_id = %session.id(), "Session opened");
        Ok(session)
    }

    /// Closes the session. A close failure is logged rather than returned so
    /// it never hides the outcome of the call itself.
    pub async fn release(&self, mut session: Box<dyn AmqpSession>) {
        match session.close().await {
            Ok(()) => debug!(session_id = %session.id(), "Session closed"),
            Err(e) => warn!(session_id = %session.id(), error = %e, "Failed to close session"),
        }
    }
}
