//! Consumer identity.
//!
//! Each subscriber instance owns one durable queue named after the host
//! it runs on, so restarts land on the same queue and pending deliveries
//! survive.

/// Fallback when the hostname cannot be resolved.
const UNKNOWN_HOST: &str = "unknown-host";

/// Host identity used in the queue name and the response `tag`.
#[must_use]
pub fn host_identity() -> String {
    let name = gethostname::gethostname();
    let name = name.to_string_lossy();
    if name.is_empty() {
        UNKNOWN_HOST.to_owned()
    } else {
        name.into_owned()
    }
}

/// Durable consumer queue name for `host` under `prefix`.
#[must_use]
pub fn consumer_queue_name(prefix: &str, host: &str) -> String {
    format!("{prefix}{host}")
}
