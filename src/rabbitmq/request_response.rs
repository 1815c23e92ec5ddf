use futures::stream::{Stream, StreamExt};
use std::future::{self, Future};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::amqp_client::AmqpSession;
use super::channel_manager::ChannelManager;
use super::correlation::CorrelationId;
use super::errors::{RabbitMQError, Result};
use super::message::{OutboundMessage, ReplyDelivery, ReplyRoute};

/// Synchronous calls over the broker: publish a request, block until the
/// reply tagged with the same correlation id shows up on a private queue.
#[derive(Clone)]
pub struct RpcClient {
    channels: ChannelManager,
    timeout: Duration,
}

impl RpcClient {
    pub fn new(channels: ChannelManager, timeout: Duration) -> Self {
        Self { channels, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends `request` and returns the body of the matching reply, or
    /// [`RabbitMQError::Timeout`] once the configured wait is over.
    pub async fn call(&self, request: &OutboundMessage) -> Result<Vec<u8>> {
        self.call_until(request, future::pending::<()>()).await
    }

    /// Like [`call`](Self::call), but gives up with
    /// [`RabbitMQError::Cancelled`] as soon as `cancel` completes. The timeout
    /// and `cancel` cover the whole exchange, setup steps included, and the
    /// session is closed on every path.
    pub async fn call_until<C>(&self, request: &OutboundMessage, cancel: C) -> Result<Vec<u8>>
    where
        C: Future<Output = ()> + Send,
    {
        request.validate()?;

        let mut session = self.channels.open().await?;
        let correlation_id = CorrelationId::generate();
        let outcome = {
            let exchange = tokio::time::timeout(
                self.timeout,
                self.exchange(session.as_mut(), request, &correlation_id),
            );
            tokio::select! {
                outcome = exchange => match outcome {
                    Ok(reply) => reply,
                    Err(_) => {
                        warn!(correlation_id = %correlation_id, timeout = ?self.timeout, "Reply timed out");
                        Err(RabbitMQError::Timeout(self.timeout))
                    }
                },
                _ = cancel => {
                    warn!(correlation_id = %correlation_id, "Request cancelled");
                    Err(RabbitMQError::Cancelled)
                }
            }
        };
        self.channels.release(session).await;
        outcome
    }

    async fn exchange(
        &self,
        session: &mut dyn AmqpSession,
        request: &OutboundMessage,
        correlation_id: &CorrelationId,
    ) -> Result<Vec<u8>> {
        // The consumer must exist before the request goes out, otherwise a
        // fast responder can reply into a queue nobody reads yet.
        let reply_to = session.declare_reply_queue().await?;
        let mut replies = session.consume(&reply_to).await?;

        let route = ReplyRoute {
            correlation_id: correlation_id.clone(),
            reply_to,
        };
        debug!(
            session_id = %session.id(),
            correlation_id = %route.correlation_id,
            reply_to = %route.reply_to,
            body = %String::from_utf8_lossy(request.body()),
            "Sending request"
        );
        session.publish(request, Some(&route)).await?;
        info!(
            exchange = %request.exchange(),
            routing_key = %request.routing_key(),
            correlation_id = %route.correlation_id,
            "Request published, waiting for reply"
        );

        await_reply(&mut replies, correlation_id).await
    }
}

/// Reads `replies` until a delivery tagged with `correlation_id` arrives and
/// returns its body. Deliveries for other correlation ids are discarded.
pub async fn await_reply<S>(replies: &mut S, correlation_id: &CorrelationId) -> Result<Vec<u8>>
where
    S: Stream<Item = Result<ReplyDelivery>> + Unpin,
{
    while let Some(delivery) = replies.next().await {
        let delivery = delivery?;
        if delivery.matches(correlation_id) {
            debug!(correlation_id = %correlation_id, "Matching reply received");
            return Ok(delivery.body);
        }
        debug!(
            expected = %correlation_id,
            received = ?delivery.correlation_id,
            "Discarding unrelated reply"
        );
    }
    Err(RabbitMQError::ReplyStreamClosed)
}
