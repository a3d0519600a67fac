//! # roam-broker
//!
//! Everything between the wire and the gate:
//!
//! - [`client`]: the broker client abstraction ([`BrokerConnector`] /
//!   [`BrokerChannel`]) the session machinery is written against
//! - [`amqp`]: the `lapin`-backed AMQP 0.9.1 implementation
//! - [`session`]: [`SessionManager`] — endpoint failover, retry, queue
//!   topology, publish
//! - [`subscriber`]: the consumption loop that never exits on error
//! - [`responder`]: decode, latency measurement, correlated response
//!
//! [`BrokerConnector`]: client::BrokerConnector
//! [`BrokerChannel`]: client::BrokerChannel
//! [`SessionManager`]: session::SessionManager

#![deny(unsafe_code)]

pub mod amqp;
pub mod client;
pub mod responder;
pub mod session;
pub mod subscriber;

pub use amqp::AmqpConnector;
pub use client::{BrokerChannel, BrokerConnector, Delivery, DeliveryStream, Publisher};
pub use responder::Responder;
pub use session::{SessionConfig, SessionManager, SessionState};
pub use subscriber::Subscriber;
