//! Wire payloads.
//!
//! Inbound notifications arrive as JSON `{"id", "time_sent"}`; the
//! correlated response echoes the id and timestamp and adds the consumer
//! tag and the measured latency in seconds.
//!
//! `time_sent` is accepted both as RFC 3339 and as a naive
//! `YYYY-MM-DDTHH:MM:SS[.ffffff]` local-less timestamp (what the
//! publisher's `datetime.isoformat()` emits); naive values are read as
//! UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::HandlerError;

/// Format matching `datetime.isoformat()` output without an offset.
const NAIVE_ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

// ─────────────────────────────────────────────────────────────────────────────
// Notification (inbound)
// ─────────────────────────────────────────────────────────────────────────────

/// One inbound notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Publisher-assigned message identifier.
    pub id: String,
    /// Publish timestamp, ISO-8601.
    pub time_sent: String,
}

impl Notification {
    /// Decode a notification from a raw payload.
    pub fn decode(payload: &[u8]) -> Result<Self, HandlerError> {
        serde_json::from_slice(payload).map_err(|e| HandlerError::malformed(e.to_string()))
    }

    /// Parse `time_sent` into a UTC instant.
    pub fn sent_at(&self) -> Result<DateTime<Utc>, HandlerError> {
        parse_time_sent(&self.time_sent)
    }
}

/// Parse an ISO-8601 timestamp, RFC 3339 or naive.
pub fn parse_time_sent(value: &str) -> Result<DateTime<Utc>, HandlerError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, NAIVE_ISO_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| HandlerError::Timestamp {
            value: value.to_owned(),
        })
}

/// Signed latency in seconds between publish and receipt.
///
/// May be negative or zero under clock skew; the raw value is
/// propagated unclamped so skew stays observable downstream.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn latency_seconds(sent_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let diff = now.signed_duration_since(sent_at);
    diff.num_microseconds()
        .map_or_else(|| diff.num_milliseconds() as f64 / 1e3, |us| us as f64 / 1e6)
}

// ─────────────────────────────────────────────────────────────────────────────
// Response (outbound)
// ─────────────────────────────────────────────────────────────────────────────

/// Correlated response, published once per accepted notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Echoed message identifier.
    pub id: String,
    /// Consumer identity.
    pub tag: String,
    /// Measured latency in seconds, signed.
    pub time_diff: f64,
    /// Echoed publish timestamp.
    pub time_sent: String,
}

impl Response {
    /// Serialize to the wire encoding.
    pub fn encode(&self) -> Result<Vec<u8>, HandlerError> {
        serde_json::to_vec(self).map_err(HandlerError::Encode)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
