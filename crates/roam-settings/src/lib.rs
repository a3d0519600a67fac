//! # roam-settings
//!
//! Layered configuration for the subscriber.
//!
//! Loading flow:
//! 1. Start with compiled [`RoamSettings::default()`]
//! 2. If `~/.roam/settings.json` exists, deep-merge user values over
//!    defaults
//! 3. Apply `ROAM_*` environment variable overrides (highest priority)
//! 4. Validate — a bad endpoint list or link profile is fatal here,
//!    before anything connects

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::Result;
pub use loader::{load_settings, load_settings_from_path, settings_path};
pub use types::{BrokerSettings, LinkSettings, LoggingSettings, RoamSettings};
