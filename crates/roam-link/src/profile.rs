//! Mobility states and their timing/quality configuration.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the simulated subscriber is doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MobilityState {
    /// Stationary; link is always up.
    Idle,
    /// On foot; link is mostly up.
    Walking,
    /// In a vehicle; link is mostly down.
    Driving,
}

impl fmt::Display for MobilityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Walking => write!(f, "walking"),
            Self::Driving => write!(f, "driving"),
        }
    }
}

/// Bounds for the uniform sojourn draw, in seconds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SojournRange {
    /// Minimum sojourn, seconds.
    pub min_secs: f64,
    /// Maximum sojourn, seconds.
    pub max_secs: f64,
}

impl SojournRange {
    /// Create a range.
    #[must_use]
    pub fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }
}

/// Per-state timing and link quality.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateProfile {
    /// How long the machine stays in this state.
    pub sojourn: SojournRange,
    /// Probability the link samples "up" while in this state.
    pub up_probability: f64,
}

/// Timing and link quality for all three states.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkProfile {
    /// Stationary profile.
    pub idle: StateProfile,
    /// On-foot profile.
    pub walking: StateProfile,
    /// In-vehicle profile.
    pub driving: StateProfile,
}

impl Default for LinkProfile {
    fn default() -> Self {
        Self {
            idle: StateProfile {
                sojourn: SojournRange::new(30.0, 60.0),
                up_probability: 1.0,
            },
            walking: StateProfile {
                sojourn: SojournRange::new(10.0, 20.0),
                up_probability: 0.8,
            },
            driving: StateProfile {
                sojourn: SojournRange::new(10.0, 20.0),
                up_probability: 0.2,
            },
        }
    }
}

/// Rejected profile value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    /// `min_secs` exceeds `max_secs` or a bound is not positive.
    #[error("invalid sojourn range for {state}: {reason}")]
    Sojourn {
        /// Offending state.
        state: MobilityState,
        /// Why the range was rejected.
        reason: String,
    },

    /// `up_probability` outside `[0, 1]`.
    #[error("up probability for {state} must be within [0, 1]")]
    Probability {
        /// Offending state.
        state: MobilityState,
    },
}

impl LinkProfile {
    /// Look up the profile for one state.
    #[must_use]
    pub fn state(&self, state: MobilityState) -> &StateProfile {
        match state {
            MobilityState::Idle => &self.idle,
            MobilityState::Walking => &self.walking,
            MobilityState::Driving => &self.driving,
        }
    }

    /// Validate ranges and probabilities.
    pub fn validate(&self) -> Result<(), ProfileError> {
        for state in [
            MobilityState::Idle,
            MobilityState::Walking,
            MobilityState::Driving,
        ] {
            let profile = self.state(state);
            let range = profile.sojourn;
            if !(range.min_secs > 0.0) {
                return Err(ProfileError::Sojourn {
                    state,
                    reason: format!("min_secs {} must be positive", range.min_secs),
                });
            }
            if range.max_secs < range.min_secs {
                return Err(ProfileError::Sojourn {
                    state,
                    reason: format!(
                        "max_secs {} below min_secs {}",
                        range.max_secs, range.min_secs
                    ),
                });
            }
            if !(0.0..=1.0).contains(&profile.up_probability) {
                return Err(ProfileError::Probability { state });
            }
        }
        Ok(())
    }
}
