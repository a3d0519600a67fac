//! Decode, measure, respond.
//!
//! Each accepted delivery becomes exactly one correlated response:
//! the echoed id and timestamp, this consumer's tag, and the measured
//! latency in seconds. The response is published persistently *before*
//! the caller acknowledges the delivery, so a crash between the two
//! redelivers the message instead of losing the response.

use chrono::{DateTime, Utc};
use roam_core::messages::latency_seconds;
use roam_core::{HandlerError, Notification, Response};
use tracing::debug;

use crate::client::Publisher;

/// Builds and publishes correlated responses.
pub struct Responder {
    tag: String,
    response_queue: String,
}

impl Responder {
    /// Create a responder with this consumer's identity.
    #[must_use]
    pub fn new(tag: impl Into<String>, response_queue: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            response_queue: response_queue.into(),
        }
    }

    /// Consumer identity echoed in every response.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Handle one payload against the wall clock.
    pub async fn respond<P: Publisher + ?Sized>(
        &self,
        publisher: &P,
        payload: &[u8],
    ) -> Result<(), HandlerError> {
        self.respond_at(publisher, payload, Utc::now()).await
    }

    /// Handle one payload with an explicit "now" (tests inject it).
    ///
    /// Decode failures and unparseable timestamps surface as handler
    /// errors — the caller decides the ack outcome; publish failures
    /// mean the session is gone.
    pub async fn respond_at<P: Publisher + ?Sized>(
        &self,
        publisher: &P,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), HandlerError> {
        let notification = Notification::decode(payload)?;
        let sent_at = notification.sent_at()?;
        let time_diff = latency_seconds(sent_at, now);

        let response = Response {
            id: notification.id.clone(),
            tag: self.tag.clone(),
            time_diff,
            time_sent: notification.time_sent.clone(),
        };
        let encoded = response.encode()?;

        publisher
            .publish(&self.response_queue, &encoded, true)
            .await?;
        debug!(id = %notification.id, time_diff, "response published");
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
