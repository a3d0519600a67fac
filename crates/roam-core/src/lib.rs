//! # roam-core
//!
//! Foundation types and errors shared by every roam crate.
//!
//! This crate provides the vocabulary the broker, link, and settings
//! crates build on:
//!
//! - **Endpoints**: broker failover candidates with credentials
//! - **Wire payloads**: `Notification` (inbound) and `Response` (outbound)
//!   with the timestamp parsing the latency computation depends on
//! - **Identity**: host-derived consumer queue name and consumer tag
//! - **Errors**: `RoamError` hierarchy via `thiserror`

#![deny(unsafe_code)]

pub mod constants;
pub mod endpoint;
pub mod errors;
pub mod identity;
pub mod messages;

pub use endpoint::{Credentials, Endpoint};
pub use errors::{BrokerError, ConfigError, HandlerError, RoamError};
pub use messages::{Notification, Response};
