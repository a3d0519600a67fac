//! Settings types.

use std::time::Duration;

use roam_core::{ConfigError, Credentials, Endpoint, constants};
use roam_link::LinkProfile;
use serde::{Deserialize, Serialize};

/// Full settings tree.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoamSettings {
    /// Broker connection and topology.
    pub broker: BrokerSettings,
    /// Connectivity simulation.
    pub link: LinkSettings,
    /// Logging output.
    pub logging: LoggingSettings,
}

impl RoamSettings {
    /// Validate the whole tree. Called once at startup; failures here
    /// are the only fatal errors in the system.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.broker.hosts.iter().all(|h| h.trim().is_empty()) {
            return Err(ConfigError::NoEndpoints);
        }
        if self.broker.port == 0 {
            return Err(ConfigError::invalid("broker.port", "must be nonzero"));
        }
        if self.broker.connect_delay_secs == 0 {
            return Err(ConfigError::invalid(
                "broker.connectDelaySecs",
                "must be at least 1",
            ));
        }
        self.link
            .profile
            .validate()
            .map_err(|e| ConfigError::invalid("link.profile", e.to_string()))?;
        Ok(())
    }
}

/// Broker connection and topology settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BrokerSettings {
    /// Ordered failover candidates.
    pub hosts: Vec<String>,
    /// Port shared by all candidates.
    pub port: u16,
    /// Broker account name.
    pub username: String,
    /// Broker account password.
    pub password: String,
    /// Exchange the consumer queue is bound to.
    pub exchange: String,
    /// Queue correlated responses are published to.
    pub response_queue: String,
    /// Prefix for the per-host consumer queue.
    pub queue_prefix: String,
    /// Consumer tag override; defaults to the derived queue name.
    pub consumer_tag: Option<String>,
    /// Flat delay between connect attempts, seconds.
    pub connect_delay_secs: u64,
    /// Unacknowledged-delivery window per channel.
    pub prefetch: u16,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            hosts: vec!["rabbitmq1".to_owned()],
            port: constants::DEFAULT_PORT,
            username: "myuser".to_owned(),
            password: "mypassword".to_owned(),
            exchange: constants::DEFAULT_EXCHANGE.to_owned(),
            response_queue: constants::DEFAULT_RESPONSE_QUEUE.to_owned(),
            queue_prefix: constants::DEFAULT_QUEUE_PREFIX.to_owned(),
            consumer_tag: None,
            connect_delay_secs: constants::DEFAULT_CONNECT_DELAY_SECS,
            prefetch: constants::DEFAULT_PREFETCH,
        }
    }
}

impl BrokerSettings {
    /// Resolve the ordered endpoint list.
    pub fn endpoints(&self) -> Result<Vec<Endpoint>, ConfigError> {
        let endpoints: Vec<Endpoint> = self
            .hosts
            .iter()
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .map(|host| {
                Endpoint::new(
                    host,
                    self.port,
                    Credentials::new(self.username.clone(), self.password.clone()),
                )
            })
            .collect();
        if endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }
        Ok(endpoints)
    }

    /// Delay between connect attempts.
    #[must_use]
    pub fn connect_delay(&self) -> Duration {
        Duration::from_secs(self.connect_delay_secs)
    }
}

/// Connectivity simulation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LinkSettings {
    /// Whether the simulator runs at all. Off means the gate stays open.
    pub enabled: bool,
    /// Sojourn ranges and up-probabilities per mobility state.
    pub profile: LinkProfile,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            profile: LinkProfile::default(),
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive (`error`..`trace`, or a full env-filter).
    pub level: String,
    /// Emit JSON lines instead of the human format.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}
