//! Error hierarchy for the roam subscriber.
//!
//! Built on [`thiserror`]:
//!
//! - [`RoamError`]: top-level enum covering all error domains
//! - [`BrokerError`]: endpoint and session failures (connect, consume,
//!   publish, broker-initiated channel closure)
//! - [`HandlerError`]: message decode/respond failures
//! - [`ConfigError`]: startup configuration failures — the only class
//!   that is allowed to terminate the process
//!
//! Everything else is recovered locally: endpoint errors roll over to
//! the next candidate, session errors trigger a reconnect, malformed
//! messages are reported and left unacknowledged.

use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// RoamError — top-level error enum
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level error type for the roam subscriber.
#[derive(Debug, Error)]
pub enum RoamError {
    /// Broker endpoint or session error.
    #[error("{0}")]
    Broker(#[from] BrokerError),

    /// Message handling error.
    #[error("{0}")]
    Handler(#[from] HandlerError),

    /// Startup configuration error.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl RoamError {
    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Broker(e) => e.code(),
            Self::Handler(e) => e.code(),
            Self::Config(e) => e.code(),
        }
    }

    /// Whether this error is fatal at startup.
    ///
    /// Only configuration errors are; the subscriber's contract once the
    /// main loop is running is "never stop trying".
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// BrokerError
// ─────────────────────────────────────────────────────────────────────────────

/// Broker endpoint or session error.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Transport or auth failure at one endpoint. Retried against the
    /// next candidate, never fatal.
    #[error("broker unreachable at {endpoint}: {message}")]
    Unreachable {
        /// Endpoint that failed, as `host:port`.
        endpoint: String,
        /// Human-readable failure description.
        message: String,
        /// Original cause.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Publish or consume attempted with no live session. The caller
    /// must reconnect, not retry the operation.
    #[error("no live session: {0}")]
    SessionInvalid(String),

    /// Broker-initiated channel closure (quota, protocol violation).
    /// Treated identically to connection loss: full reconnect.
    #[error("channel closed by broker: {0}")]
    ChannelClosed(String),

    /// The delivery stream failed or ended unexpectedly.
    #[error("consume stream failed: {0}")]
    Consume(String),

    /// Shutdown was requested while blocked in a broker operation.
    #[error("shutdown requested")]
    Cancelled,
}

impl BrokerError {
    /// Transport failure at `endpoint` with an underlying cause.
    #[must_use]
    pub fn unreachable(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Unreachable {
            endpoint: endpoint.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unreachable { .. } => "BROKER_UNREACHABLE",
            Self::SessionInvalid(_) => "SESSION_INVALID",
            Self::ChannelClosed(_) => "CHANNEL_CLOSED_BY_BROKER",
            Self::Consume(_) => "CONSUME_FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Whether this error invalidates the current session.
    ///
    /// Session-loss errors send the consumption loop back to `connect()`;
    /// endpoint-level errors are handled inside `connect()` itself.
    #[must_use]
    pub fn is_session_loss(&self) -> bool {
        matches!(
            self,
            Self::SessionInvalid(_) | Self::ChannelClosed(_) | Self::Consume(_)
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HandlerError
// ─────────────────────────────────────────────────────────────────────────────

/// Message handling error.
///
/// Decode failures leave the delivery unacknowledged (broker redelivery
/// is the retry mechanism); publish failures propagate as session loss.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Payload is not valid JSON or misses a required field.
    #[error("malformed message: {reason}")]
    Malformed {
        /// What was wrong with the payload.
        reason: String,
    },

    /// `time_sent` could not be parsed as a timestamp.
    #[error("unparseable timestamp {value:?}")]
    Timestamp {
        /// The offending value.
        value: String,
    },

    /// Response could not be serialized.
    #[error("failed to encode response: {0}")]
    Encode(#[source] serde_json::Error),

    /// Publishing the response failed; the session is gone.
    #[error("response publish failed: {0}")]
    Publish(#[from] BrokerError),
}

impl HandlerError {
    /// Malformed-payload error with a reason.
    #[must_use]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "MALFORMED_MESSAGE",
            Self::Timestamp { .. } => "MALFORMED_TIMESTAMP",
            Self::Encode(_) => "RESPONSE_ENCODE_ERROR",
            Self::Publish(e) => e.code(),
        }
    }

    /// Whether the underlying session was lost while handling.
    #[must_use]
    pub fn is_session_loss(&self) -> bool {
        matches!(self, Self::Publish(e) if e.is_session_loss())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ConfigError
// ─────────────────────────────────────────────────────────────────────────────

/// Startup configuration error. Fatal — nothing here is retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The broker endpoint list resolved to nothing.
    #[error("broker endpoint list is empty")]
    NoEndpoints,

    /// Settings file exists but could not be read.
    #[error("failed to read settings file {path}: {source}")]
    Io {
        /// Offending path.
        path: std::path::PathBuf,
        /// Original cause.
        #[source]
        source: std::io::Error,
    },

    /// Settings file contains invalid JSON.
    #[error("invalid settings JSON in {path}: {source}")]
    Parse {
        /// Offending path.
        path: std::path::PathBuf,
        /// Original cause.
        #[source]
        source: serde_json::Error,
    },

    /// A settings value is out of its valid range.
    #[error("invalid setting {name}: {reason}")]
    Invalid {
        /// Dotted settings key.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Out-of-range or inconsistent settings value.
    #[must_use]
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoEndpoints => "CONFIG_NO_ENDPOINTS",
            Self::Io { .. } => "CONFIG_IO_ERROR",
            Self::Parse { .. } => "CONFIG_PARSE_ERROR",
            Self::Invalid { .. } => "CONFIG_INVALID_VALUE",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
