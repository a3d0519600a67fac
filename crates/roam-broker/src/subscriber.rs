//! The consumption loop.
//!
//! Top-level driver: obtain a session, register the consumer, dispatch
//! deliveries until the session dies, reconnect, repeat. The loop never
//! returns on error — shutdown is the only normal exit, honored between
//! delivery iterations.
//!
//! Gate discipline: a delivery that arrives while the gate is closed is
//! neither acked nor nacked. It stays in the broker's unacknowledged
//! window; a long down period fills the prefetch window and the broker
//! stops delivering until the consumer reconnects or something is acked.

use futures::StreamExt;
use roam_core::{BrokerError, HandlerError};
use roam_link::Gate;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::{Delivery, DeliveryStream};
use crate::responder::Responder;
use crate::session::SessionManager;

/// Why the dispatch loop ended.
enum LoopExit {
    /// Shutdown token fired.
    Shutdown,
    /// Session-level error; reconnect.
    SessionLost(BrokerError),
}

/// Long-lived subscriber over one session manager.
pub struct Subscriber {
    manager: SessionManager,
    gate: Gate,
    responder: Responder,
    shutdown: CancellationToken,
}

impl Subscriber {
    /// Wire the loop together.
    #[must_use]
    pub fn new(
        manager: SessionManager,
        gate: Gate,
        responder: Responder,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            manager,
            gate,
            responder,
            shutdown,
        }
    }

    /// Run until shutdown. Every session-level failure loops back to
    /// `connect()`; nothing short of the token stops the subscriber.
    pub async fn run(mut self) {
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            match self.manager.connect(&self.shutdown).await {
                Ok(()) => {}
                Err(BrokerError::Cancelled) => break,
                Err(error) => {
                    // connect() retries internally; anything else here is
                    // unexpected but still not a reason to stop.
                    warn!(%error, "connect failed outside retry loop");
                    continue;
                }
            }

            let deliveries = match self.manager.consume().await {
                Ok(stream) => stream,
                Err(error) => {
                    warn!(%error, "consumer registration failed");
                    self.manager.invalidate();
                    continue;
                }
            };
            info!(
                queue = %self.manager.config().queue,
                "waiting for deliveries"
            );

            match self.dispatch_loop(deliveries).await {
                LoopExit::Shutdown => break,
                LoopExit::SessionLost(error) => {
                    warn!(%error, "session lost — reconnecting");
                    self.manager.invalidate();
                }
            }
        }
        info!("subscriber stopped");
    }

    /// Dispatch deliveries until shutdown or session loss.
    async fn dispatch_loop(&self, mut deliveries: DeliveryStream) -> LoopExit {
        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => return LoopExit::Shutdown,
                next = deliveries.next() => {
                    let result = match next {
                        None => Err(BrokerError::Consume("delivery stream ended".into())),
                        Some(Err(error)) => Err(error),
                        Some(Ok(delivery)) => self.handle_delivery(delivery).await,
                    };
                    if let Err(error) = result {
                        return LoopExit::SessionLost(error);
                    }
                }
            }
        }
    }

    /// One delivery: consult the gate, dispatch, ack on success.
    ///
    /// Gate closed → skip without acking; the delivery stays pending
    /// against the broker. Handler failure → leave unacked, broker
    /// redelivery is the retry mechanism. Ack strictly follows the
    /// response publish.
    async fn handle_delivery(&self, delivery: Delivery) -> Result<(), BrokerError> {
        if !self.gate.is_open() {
            debug!(
                tag = delivery.delivery_tag,
                "gate closed — delivery left unacknowledged"
            );
            return Ok(());
        }
        if delivery.redelivered {
            debug!(tag = delivery.delivery_tag, "processing redelivery");
        }

        match self
            .responder
            .respond(&self.manager, &delivery.payload)
            .await
        {
            Ok(()) => self.manager.ack(delivery.delivery_tag).await,
            Err(HandlerError::Publish(error)) => Err(error),
            Err(error) => {
                warn!(
                    tag = delivery.delivery_tag,
                    %error,
                    "handler failed — delivery left unacknowledged"
                );
                Ok(())
            }
        }
    }
}
