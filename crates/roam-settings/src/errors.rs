//! Settings errors.
//!
//! Configuration is the one domain where failure is fatal; everything
//! maps onto [`ConfigError`] from `roam-core`.

pub use roam_core::ConfigError;

/// Result alias for settings operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
