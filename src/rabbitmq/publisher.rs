use tracing::{debug, info};

use super::channel_manager::ChannelManager;
use super::errors::Result;
use super::message::OutboundMessage;

/// Fire-and-forget publishing: one message, no reply expected.
#[derive(Clone)]
pub struct Publisher {
    channels: ChannelManager,
}

impl Publisher {
    pub fn new(channels: ChannelManager) -> Self {
        Self { channels }
    }

    /// Sends `message` on a fresh session and closes it again, whatever the
    /// outcome. Returns once the broker has accepted the message.
    pub async fn publish(&self, message: &OutboundMessage) -> Result<()> {
        message.validate()?;

        let mut session = self.channels.open().await?;
        debug!(
            session_id = %session.id(),
            body = %String::from_utf8_lossy(message.body()),
            "Sending message"
        );
        let outcome = session.publish(message, None).await;
        self.channels.release(session).await;
        outcome?;

        info!(
            exchange = %message.exchange(),
            routing_key = %message.routing_key(),
            "Published message"
        );
        Ok(())
    }
}
