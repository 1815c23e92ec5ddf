//! In-memory broker for tests
//!
//! Implements [`AmqpTransport`] without a network. It counts opened and closed
//! sessions, records every published message and session event, and models
//! exclusive auto-delete reply queues: a queue lives until the session that
//! declared it closes, and replies routed to a queue with no consumer are
//! counted as lost.

use async_trait::async_trait;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::stream::StreamExt;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::rabbitmq::{
    AmqpSession, AmqpTransport, DeliveryStream, OutboundMessage, RabbitMQError, ReplyDelivery,
    ReplyRoute, Result,
};

/// A message as the broker received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub body: Vec<u8>,
    pub headers: BTreeMap<String, String>,
    pub persistent: bool,
    pub mandatory: bool,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
}

impl PublishedMessage {
    /// Builds the reply a well-behaved consumer would send for this request.
    pub fn reply(&self, body: impl Into<Vec<u8>>) -> ReplyDelivery {
        ReplyDelivery {
            correlation_id: self.correlation_id.clone(),
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Opened,
    ReplyQueueDeclared(String),
    Consumed(String),
    Published,
    Closed,
}

/// Stage at which the broker should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Connect,
    DeclareReplyQueue,
    Consume,
    Publish,
}

type Responder = Arc<dyn Fn(&PublishedMessage) -> Vec<ReplyDelivery> + Send + Sync>;

#[derive(Default)]
struct BrokerState {
    opened: usize,
    closed: usize,
    next_queue: usize,
    published: Vec<PublishedMessage>,
    events: Vec<SessionEvent>,
    dropped: usize,
    lost: usize,
    // reply queue name -> consumer, None until someone consumes
    queues: HashMap<String, Option<UnboundedSender<Result<ReplyDelivery>>>>,
    unroutable: HashSet<String>,
}

/// Cheap to clone; clones share the same broker state.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    responder: Option<Responder>,
    reply_delay: Option<Duration>,
    fail_at: Option<FailPoint>,
    stall_at: Option<FailPoint>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request that carries a reply-to with the returned
    /// deliveries, in order.
    pub fn respond_with<F>(mut self, responder: F) -> Self
    where
        F: Fn(&PublishedMessage) -> Vec<ReplyDelivery> + Send + Sync + 'static,
    {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// Send responder output after `delay` instead of during the publish.
    pub fn reply_after(mut self, delay: Duration) -> Self {
        self.reply_delay = Some(delay);
        self
    }

    pub fn fail_at(mut self, fail_point: FailPoint) -> Self {
        self.fail_at = Some(fail_point);
        self
    }

    /// The broker stops answering at `fail_point`: that step never completes.
    pub fn stall_at(mut self, fail_point: FailPoint) -> Self {
        self.stall_at = Some(fail_point);
        self
    }

    /// Messages to `exchange` have no binding: dropped, or returned when mandatory.
    pub fn unroutable_exchange(self, exchange: &str) -> Self {
        self.lock().unroutable.insert(exchange.to_string());
        self
    }

    pub fn opened(&self) -> usize {
        self.lock().opened
    }

    pub fn closed(&self) -> usize {
        self.lock().closed
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.lock().published.clone()
    }

    pub fn events(&self) -> Vec<SessionEvent> {
        self.lock().events.clone()
    }

    /// Unroutable messages the broker discarded.
    pub fn dropped(&self) -> usize {
        self.lock().dropped
    }

    /// Replies that reached a reply queue nobody was consuming.
    pub fn lost(&self) -> usize {
        self.lock().lost
    }

    pub fn open_reply_queues(&self) -> usize {
        self.lock().queues.len()
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        // A panicking test thread must not hide the state from the others.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn fails_at(&self, fail_point: FailPoint) -> bool {
        self.fail_at == Some(fail_point)
    }

    async fn stall_if(&self, fail_point: FailPoint) {
        if self.stall_at == Some(fail_point) {
            future::pending::<()>().await;
        }
    }

    fn deliver(&self, queue: &str, replies: Vec<ReplyDelivery>) {
        let mut state = self.lock();
        for reply in replies {
            let delivered = match state.queues.get(queue) {
                Some(Some(consumer)) => consumer.unbounded_send(Ok(reply)).is_ok(),
                _ => false,
            };
            if !delivered {
                state.lost += 1;
            }
        }
    }
}

#[async_trait]
impl AmqpTransport for MemoryBroker {
    async fn open(&self) -> Result<Box<dyn AmqpSession>> {
        if self.fails_at(FailPoint::Connect) {
            return Err(RabbitMQError::ConnectionError(
                "Failed to connect: connection refused".to_string(),
            ));
        }

        let id = {
            let mut state = self.lock();
            state.opened += 1;
            state.events.push(SessionEvent::Opened);
            format!("memory-{}", state.opened)
        };

        Ok(Box::new(MemorySession {
            id,
            broker: self.clone(),
            queues: Vec::new(),
            closed: false,
        }))
    }
}

struct MemorySession {
    id: String,
    broker: MemoryBroker,
    queues: Vec<String>,
    closed: bool,
}

impl MemorySession {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(RabbitMQError::ChannelError(
                "Channel already closed".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl AmqpSession for MemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn declare_reply_queue(&mut self) -> Result<String> {
        self.ensure_open()?;
        self.broker.stall_if(FailPoint::DeclareReplyQueue).await;
        if self.broker.fails_at(FailPoint::DeclareReplyQueue) {
            return Err(RabbitMQError::ReplyQueueError(
                "ACCESS_REFUSED".to_string(),
            ));
        }

        let mut state = self.broker.lock();
        state.next_queue += 1;
        let name = format!("amq.gen-{:06}", state.next_queue);
        state.queues.insert(name.clone(), None);
        state.events.push(SessionEvent::ReplyQueueDeclared(name.clone()));
        self.queues.push(name.clone());
        Ok(name)
    }

    async fn consume(&mut self, queue: &str) -> Result<DeliveryStream> {
        self.ensure_open()?;
        self.broker.stall_if(FailPoint::Consume).await;
        if self.broker.fails_at(FailPoint::Consume) {
            return Err(RabbitMQError::ConsumeError(
                "NOT_FOUND - no queue".to_string(),
            ));
        }

        let mut state = self.broker.lock();
        let slot = state.queues.get_mut(queue).ok_or_else(|| {
            RabbitMQError::ConsumeError(format!("NOT_FOUND - no queue '{}'", queue))
        })?;
        let (sender, receiver) = mpsc::unbounded();
        *slot = Some(sender);
        state.events.push(SessionEvent::Consumed(queue.to_string()));
        Ok(receiver.boxed())
    }

    async fn publish(
        &mut self,
        message: &OutboundMessage,
        reply: Option<&ReplyRoute>,
    ) -> Result<()> {
        self.ensure_open()?;
        self.broker.stall_if(FailPoint::Publish).await;
        if self.broker.fails_at(FailPoint::Publish) {
            return Err(RabbitMQError::PublishError(
                "connection reset by peer".to_string(),
            ));
        }
        if !is_valid_routing_key(message.routing_key()) {
            return Err(RabbitMQError::PublishError(format!(
                "malformed routing key '{}'",
                message.routing_key()
            )));
        }

        let published = PublishedMessage {
            exchange: message.exchange().to_string(),
            routing_key: message.routing_key().to_string(),
            body: message.body().to_vec(),
            headers: message.headers().clone(),
            persistent: message.is_persistent(),
            mandatory: message.is_mandatory(),
            correlation_id: reply.map(|r| r.correlation_id.as_str().to_string()),
            reply_to: reply.map(|r| r.reply_to.clone()),
        };

        {
            let mut state = self.broker.lock();
            if state.unroutable.contains(message.exchange()) {
                if message.is_mandatory() {
                    return Err(RabbitMQError::Unroutable {
                        exchange: published.exchange,
                        routing_key: published.routing_key,
                    });
                }
                state.dropped += 1;
                return Ok(());
            }
            state.published.push(published.clone());
            state.events.push(SessionEvent::Published);
        }

        let (Some(responder), Some(reply_to)) = (&self.broker.responder, &published.reply_to)
        else {
            return Ok(());
        };
        let replies = (**responder)(&published);
        match self.broker.reply_delay {
            None => self.broker.deliver(reply_to, replies),
            Some(delay) => {
                let broker = self.broker.clone();
                let reply_to = reply_to.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    broker.deliver(&reply_to, replies);
                });
            }
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let mut state = self.broker.lock();
        // exclusive auto-delete queues go away with their channel
        for queue in self.queues.drain(..) {
            state.queues.remove(&queue);
        }
        state.closed += 1;
        state.events.push(SessionEvent::Closed);
        Ok(())
    }
}

/// Topic routing keys: dot-separated non-empty words of `[A-Za-z0-9_-]`, or
/// the `*`/`#` wildcards.
fn is_valid_routing_key(routing_key: &str) -> bool {
    routing_key.len() <= 255
        && routing_key.split('.').all(|word| {
            !word.is_empty()
                && (word == "*"
                    || word == "#"
                    || word
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_key_validation() {
        assert!(is_valid_routing_key("iban.validation"));
        assert!(is_valid_routing_key("process"));
        assert!(is_valid_routing_key("customer.*"));
        assert!(!is_valid_routing_key("country..pull"));
        assert!(!is_valid_routing_key("country pull"));
        assert!(!is_valid_routing_key(".pull"));
    }

    #[tokio::test]
    async fn replies_to_unconsumed_queue_are_lost() {
        let broker = MemoryBroker::new();
        let mut session = broker.open().await.unwrap();
        let queue = session.declare_reply_queue().await.unwrap();

        broker.deliver(&queue, vec![ReplyDelivery::new("abc", "late")]);

        assert_eq!(broker.lost(), 1);
        session.close().await.unwrap();
        assert_eq!(broker.open_reply_queues(), 0);
    }

    #[tokio::test]
    async fn closing_twice_counts_once() {
        let broker = MemoryBroker::new();
        let mut session = broker.open().await.unwrap();
        session.close().await.unwrap();
        session.close().await.unwrap();
        assert_eq!(broker.closed(), 1);
    }
}
