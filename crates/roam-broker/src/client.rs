//! Broker client abstraction.
//!
//! The session manager and consumption loop are written against these
//! traits rather than a concrete client, so the whole failover and
//! gating machinery runs unmodified against the in-process stub broker
//! the tests use. The production implementation lives in [`crate::amqp`].

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::Stream;
use roam_core::{BrokerError, Endpoint};

/// One delivery handed to the consumer.
///
/// The tag identifies the delivery in the broker's unacknowledged
/// window; it is only meaningful on the channel that produced it.
#[derive(Clone, Debug)]
pub struct Delivery {
    /// Broker-assigned acknowledgment handle.
    pub delivery_tag: u64,
    /// Raw message payload.
    pub payload: Vec<u8>,
    /// Whether the broker marked this delivery as a redelivery.
    pub redelivered: bool,
}

/// Stream of deliveries for one consumer registration.
///
/// An `Err` item or the end of the stream both mean the session is gone.
pub type DeliveryStream = Pin<Box<dyn Stream<Item = Result<Delivery, BrokerError>> + Send>>;

/// One open channel on a live broker connection.
#[async_trait]
pub trait BrokerChannel: Send + Sync {
    /// Declare a queue, optionally durable.
    async fn declare_queue(&self, queue: &str, durable: bool) -> Result<(), BrokerError>;

    /// Bind a queue to an exchange.
    async fn bind_queue(
        &self,
        queue: &str,
        exchange: &str,
        routing_key: &str,
    ) -> Result<(), BrokerError>;

    /// Bound the unacknowledged-delivery window for this channel.
    async fn set_prefetch(&self, count: u16) -> Result<(), BrokerError>;

    /// Register a consumer and return its delivery stream.
    async fn consume(&self, queue: &str, consumer_tag: &str) -> Result<DeliveryStream, BrokerError>;

    /// Acknowledge one delivery by tag.
    async fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError>;

    /// Publish a payload, optionally persistent.
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &[u8],
        persistent: bool,
    ) -> Result<(), BrokerError>;
}

/// Factory for channels, one per connect attempt.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Open a connection and channel against one endpoint.
    async fn connect(&self, endpoint: &Endpoint) -> Result<Arc<dyn BrokerChannel>, BrokerError>;
}

/// Publish capability the response handler needs.
///
/// Implemented by [`crate::session::SessionManager`]; tests substitute a
/// recording stub.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish to the default exchange under `routing_key`.
    async fn publish(
        &self,
        routing_key: &str,
        payload: &[u8],
        persistent: bool,
    ) -> Result<(), BrokerError>;
}
