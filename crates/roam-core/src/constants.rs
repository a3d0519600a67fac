//! Topology and timing defaults.
//!
//! These are compiled fallbacks only — every one of them is overridable
//! through `roam-settings` (file or environment).

/// Exchange the consumer queue is bound to.
pub const DEFAULT_EXCHANGE: &str = "notifications";

/// Queue correlated responses are published to.
pub const DEFAULT_RESPONSE_QUEUE: &str = "response_queue";

/// Prefix for the per-host durable consumer queue.
pub const DEFAULT_QUEUE_PREFIX: &str = "subscriber_queue_";

/// Standard AMQP port.
pub const DEFAULT_PORT: u16 = 5672;

/// Delay between connect attempts against successive endpoints, seconds.
pub const DEFAULT_CONNECT_DELAY_SECS: u64 = 5;

/// Per-channel unacknowledged-delivery window.
///
/// Gate-closed deliveries accumulate against this limit; once it is
/// reached the broker stops delivering on the channel until something
/// is acked or the consumer disconnects.
pub const DEFAULT_PREFETCH: u16 = 50;
