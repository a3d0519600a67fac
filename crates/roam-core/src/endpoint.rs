//! Broker endpoint candidates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Username/password pair presented to the broker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Create a credentials pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// One broker failover candidate.
///
/// Endpoints are immutable; the session manager holds an ordered,
/// non-empty list of them and cycles round-robin on failure.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Broker hostname or address.
    pub host: String,
    /// Broker port.
    pub port: u16,
    /// Credentials for this endpoint.
    pub credentials: Credentials,
}

impl Endpoint {
    /// Create an endpoint.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, credentials: Credentials) -> Self {
        Self {
            host: host.into(),
            port,
            credentials,
        }
    }

    /// `host:port` without credentials, for logs.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// Display never includes the password.
impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.credentials.username, self.host, self.port)
    }
}
