//! # roam-logging
//!
//! `tracing` subscriber setup: env-filter with a configured default
//! level, human or JSON output. `RUST_LOG` always wins over the
//! configured level so field debugging needs no settings change.

#![deny(unsafe_code)]

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

/// Output format for log lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line format.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format {other:?}")),
        }
    }
}

/// Build the filter: `RUST_LOG` if set, else `default_level`, else `info`.
fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// Safe to call more than once; later calls are no-ops (first
/// initialization wins), which keeps tests that share a process happy.
pub fn init(default_level: &str, format: LogFormat) {
    let filter = build_filter(default_level);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if result.is_err() {
        tracing::debug!("logging already initialized, keeping existing subscriber");
    }
}
