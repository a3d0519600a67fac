//! Session lifecycle: connect, failover, retry, publish.
//!
//! One [`SessionManager`] owns at most one live session. `connect()`
//! walks the endpoint ring until something answers — there is no retry
//! cap and no "give up" state; shutdown is the only early exit. Any
//! error while using a session invalidates it, and the consumption loop
//! responds by calling `connect()` again.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use roam_core::{BrokerError, ConfigError, Endpoint};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{BrokerChannel, BrokerConnector, DeliveryStream, Publisher};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Queue topology and retry timing for one session manager.
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Exchange the consumer queue is bound to.
    pub exchange: String,
    /// Durable per-host consumer queue.
    pub queue: String,
    /// Durable queue responses are published to.
    pub response_queue: String,
    /// Consumer tag presented to the broker.
    pub consumer_tag: String,
    /// Flat delay between connect attempts.
    pub connect_delay: Duration,
    /// Unacknowledged-delivery window per channel.
    pub prefetch: u16,
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of the manager.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// No session and none being established.
    Disconnected,
    /// Walking the endpoint ring.
    Connecting,
    /// Live session available.
    Ready,
    /// Session was invalidated; next `connect()` leaves this state.
    Failed,
}

/// A live connection + channel with the queue topology applied.
///
/// Invalidated (and discarded, never reused) on any channel or
/// connection error.
struct Session {
    channel: Arc<dyn BrokerChannel>,
    queue: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// SessionManager
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the broker session and drives endpoint failover.
pub struct SessionManager {
    connector: Arc<dyn BrokerConnector>,
    endpoints: Vec<Endpoint>,
    cursor: usize,
    config: SessionConfig,
    session: Option<Session>,
    state: SessionState,
}

impl SessionManager {
    /// Create a manager over an ordered, non-empty endpoint list.
    ///
    /// An empty list is the one fatal configuration error.
    pub fn new(
        connector: Arc<dyn BrokerConnector>,
        endpoints: Vec<Endpoint>,
        config: SessionConfig,
    ) -> Result<Self, ConfigError> {
        if endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }
        Ok(Self {
            connector,
            endpoints,
            cursor: 0,
            config,
            session: None,
            state: SessionState::Disconnected,
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a live session is held.
    #[must_use]
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// Topology this manager declares.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Discard the session after an error. The broker will redeliver
    /// whatever was left unacknowledged on it.
    pub fn invalidate(&mut self) {
        if self.session.take().is_some() {
            warn!("session invalidated");
        }
        self.state = SessionState::Failed;
    }

    /// Block until a session is established or shutdown fires.
    ///
    /// Walks the endpoint ring from the top: connect, declare both
    /// durable queues, bind the consumer queue, apply the prefetch
    /// window. The first endpoint that completes the sequence wins; each
    /// failure advances to the next candidate after the configured
    /// delay, wrapping forever.
    ///
    /// Returns [`BrokerError::Cancelled`] only when `shutdown` fires.
    pub async fn connect(&mut self, shutdown: &CancellationToken) -> Result<(), BrokerError> {
        if self.session.is_some() {
            return Ok(());
        }
        self.state = SessionState::Connecting;
        self.cursor = 0;

        loop {
            if shutdown.is_cancelled() {
                self.state = SessionState::Disconnected;
                return Err(BrokerError::Cancelled);
            }

            let endpoint = self.endpoints[self.cursor % self.endpoints.len()].clone();
            debug!(endpoint = %endpoint.authority(), "connect attempt");

            match self.attempt(&endpoint).await {
                Ok(session) => {
                    info!(
                        endpoint = %endpoint.authority(),
                        queue = %session.queue,
                        "session established"
                    );
                    self.session = Some(session);
                    self.state = SessionState::Ready;
                    return Ok(());
                }
                Err(error) => {
                    warn!(
                        endpoint = %endpoint.authority(),
                        %error,
                        delay_secs = self.config.connect_delay.as_secs(),
                        "connect attempt failed — trying next endpoint"
                    );
                    self.cursor = (self.cursor + 1) % self.endpoints.len();
                    tokio::select! {
                        () = shutdown.cancelled() => {
                            self.state = SessionState::Disconnected;
                            return Err(BrokerError::Cancelled);
                        }
                        () = tokio::time::sleep(self.config.connect_delay) => {}
                    }
                }
            }
        }
    }

    /// One full connect + topology sequence against one endpoint.
    async fn attempt(&self, endpoint: &Endpoint) -> Result<Session, BrokerError> {
        let channel = self.connector.connect(endpoint).await?;
        channel.declare_queue(&self.config.queue, true).await?;
        channel
            .declare_queue(&self.config.response_queue, true)
            .await?;
        channel
            .bind_queue(&self.config.queue, &self.config.exchange, "")
            .await?;
        channel.set_prefetch(self.config.prefetch).await?;
        Ok(Session {
            channel,
            queue: self.config.queue.clone(),
        })
    }

    /// Register the consumer on the bound queue.
    pub async fn consume(&self) -> Result<DeliveryStream, BrokerError> {
        let session = self.live("consume")?;
        session
            .channel
            .consume(&session.queue, &self.config.consumer_tag)
            .await
    }

    /// Acknowledge one delivery on the live session.
    pub async fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError> {
        let session = self.live("ack")?;
        session.channel.ack(delivery_tag).await
    }

    fn live(&self, operation: &str) -> Result<&Session, BrokerError> {
        self.session.as_ref().ok_or_else(|| {
            BrokerError::SessionInvalid(format!("{operation} attempted with no live session"))
        })
    }
}

#[async_trait]
impl Publisher for SessionManager {
    /// Publish on the live session's channel via the default exchange.
    ///
    /// Fails with `SessionInvalid` when nothing is `Ready`; the caller
    /// reconnects rather than retrying the publish.
    async fn publish(
        &self,
        routing_key: &str,
        payload: &[u8],
        persistent: bool,
    ) -> Result<(), BrokerError> {
        let session = self.live("publish")?;
        session
            .channel
            .publish("", routing_key, payload, persistent)
            .await
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
