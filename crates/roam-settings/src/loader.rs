//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RoamSettings::default()`]
//! 2. If the settings file exists, deep-merge user values over defaults
//! 3. Apply `ROAM_*` environment overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)
//!
//! Env overrides have strict parsing rules; invalid values are silently
//! ignored and the file/default value stands.

use std::path::{Path, PathBuf};

use roam_core::ConfigError;
use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::RoamSettings;

/// Resolve the path to the settings file (`~/.roam/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".roam").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<RoamSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; an unreadable or invalid file is a
/// fatal configuration error.
pub fn load_settings_from_path(path: &Path) -> Result<RoamSettings> {
    let defaults = serde_json::to_value(RoamSettings::default()).map_err(|source| {
        ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let user: Value = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: RoamSettings =
        serde_json::from_value(merged).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut RoamSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Override application against an injected lookup, so tests never have
/// to mutate the process environment.
pub fn apply_overrides(
    settings: &mut RoamSettings,
    lookup: impl Fn(&str) -> Option<String>,
) {
    // ── Broker ──────────────────────────────────────────────────────
    if let Some(hosts) = lookup("ROAM_BROKER_HOSTS").map(|v| parse_hosts(&v)) {
        if !hosts.is_empty() {
            settings.broker.hosts = hosts;
        }
    }
    if let Some(v) = lookup("ROAM_BROKER_PORT").and_then(|v| parse_u16(&v, 1, 65535)) {
        settings.broker.port = v;
    }
    if let Some(v) = lookup("ROAM_BROKER_USERNAME") {
        settings.broker.username = v;
    }
    if let Some(v) = lookup("ROAM_BROKER_PASSWORD") {
        settings.broker.password = v;
    }
    if let Some(v) = lookup("ROAM_EXCHANGE") {
        settings.broker.exchange = v;
    }
    if let Some(v) = lookup("ROAM_RESPONSE_QUEUE") {
        settings.broker.response_queue = v;
    }
    if let Some(v) = lookup("ROAM_QUEUE_PREFIX") {
        settings.broker.queue_prefix = v;
    }
    if let Some(v) = lookup("ROAM_CONSUMER_TAG") {
        settings.broker.consumer_tag = Some(v);
    }
    if let Some(v) = lookup("ROAM_CONNECT_DELAY_SECS").and_then(|v| parse_u64(&v, 1, 3600)) {
        settings.broker.connect_delay_secs = v;
    }
    if let Some(v) = lookup("ROAM_PREFETCH").and_then(|v| parse_u16(&v, 1, 65535)) {
        settings.broker.prefetch = v;
    }

    // ── Link simulation ─────────────────────────────────────────────
    if let Some(v) = lookup("ROAM_LINK_SIM").and_then(|v| parse_bool(&v)) {
        settings.link.enabled = v;
    }
    let sojourns = [
        ("ROAM_IDLE_MIN_SECS", "ROAM_IDLE_MAX_SECS"),
        ("ROAM_WALKING_MIN_SECS", "ROAM_WALKING_MAX_SECS"),
        ("ROAM_DRIVING_MIN_SECS", "ROAM_DRIVING_MAX_SECS"),
    ];
    for (i, (min_var, max_var)) in sojourns.iter().enumerate() {
        let sojourn = match i {
            0 => &mut settings.link.profile.idle.sojourn,
            1 => &mut settings.link.profile.walking.sojourn,
            _ => &mut settings.link.profile.driving.sojourn,
        };
        if let Some(v) = lookup(min_var).and_then(|v| parse_f64(&v, 0.001, 86_400.0)) {
            sojourn.min_secs = v;
        }
        if let Some(v) = lookup(max_var).and_then(|v| parse_f64(&v, 0.001, 86_400.0)) {
            sojourn.max_secs = v;
        }
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = lookup("ROAM_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = lookup("ROAM_LOG_JSON").and_then(|v| parse_bool(&v)) {
        settings.logging.json = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Split a comma-separated host list, dropping blanks.
pub fn parse_hosts(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Parse a `u16` within `[min, max]`.
pub fn parse_u16(val: &str, min: u16, max: u16) -> Option<u16> {
    val.trim()
        .parse::<u16>()
        .ok()
        .filter(|v| (min..=max).contains(v))
}

/// Parse a `u64` within `[min, max]`.
pub fn parse_u64(val: &str, min: u64, max: u64) -> Option<u64> {
    val.trim()
        .parse::<u64>()
        .ok()
        .filter(|v| (min..=max).contains(v))
}

/// Parse an `f64` within `[min, max]`.
pub fn parse_f64(val: &str, min: f64, max: f64) -> Option<f64> {
    val.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && (min..=max).contains(v))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
