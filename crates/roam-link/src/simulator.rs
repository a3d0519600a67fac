//! The mobility state machine driving the gate.
//!
//! Transition table, applied once per sojourn:
//!
//! | from    | idle | walking | driving |
//! |---------|------|---------|---------|
//! | idle    | 0.60 | 0.30    | 0.10    |
//! | walking | 0.40 | 0.50    | 0.10    |
//! | driving | —    | 0.20    | 0.80    |
//!
//! After each transition a sojourn is drawn uniformly from the new
//! state's range and link availability is sampled once with the state's
//! up-probability. The sample goes into the [`Gate`]; its edge
//! discipline deduplicates repeated identical values.

use std::time::Duration;

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::gate::Gate;
use crate::profile::{LinkProfile, MobilityState};

/// Pick the next state from a uniform roll in `[0, 1)`.
///
/// Pure so the table is testable without an RNG.
#[must_use]
pub fn next_state(current: MobilityState, roll: f64) -> MobilityState {
    use MobilityState::{Driving, Idle, Walking};
    match current {
        Idle => {
            if roll < 0.60 {
                Idle
            } else if roll < 0.90 {
                Walking
            } else {
                Driving
            }
        }
        Walking => {
            if roll < 0.50 {
                Walking
            } else if roll < 0.90 {
                Idle
            } else {
                Driving
            }
        }
        Driving => {
            if roll < 0.80 {
                Driving
            } else {
                Walking
            }
        }
    }
}

/// Free-running mobility simulation.
///
/// Sole writer of its own state and of the gate. Runs until the
/// shutdown token fires; cancellation is honored between sojourns.
pub struct LinkSimulator<R: Rng> {
    profile: LinkProfile,
    state: MobilityState,
    gate: Gate,
    rng: R,
}

impl LinkSimulator<StdRng> {
    /// Create a simulator seeded from the OS.
    #[must_use]
    pub fn new(profile: LinkProfile, gate: Gate) -> Self {
        Self::with_rng(profile, gate, StdRng::from_os_rng())
    }
}

impl<R: Rng> LinkSimulator<R> {
    /// Create a simulator with an explicit RNG (tests use a seeded one).
    #[must_use]
    pub fn with_rng(profile: LinkProfile, gate: Gate, rng: R) -> Self {
        Self {
            profile,
            state: MobilityState::Idle,
            gate,
            rng,
        }
    }

    /// Current mobility state.
    #[must_use]
    pub fn state(&self) -> MobilityState {
        self.state
    }

    /// One transition: advance the state, draw the sojourn, sample the
    /// link, push the sample into the gate. Returns the sojourn to sleep.
    pub fn step(&mut self) -> Duration {
        let roll = self.rng.random_range(0.0..1.0);
        self.state = next_state(self.state, roll);

        let profile = *self.profile.state(self.state);
        let sojourn_secs = self
            .rng
            .random_range(profile.sojourn.min_secs..=profile.sojourn.max_secs);
        let up = self
            .rng
            .random_bool(profile.up_probability.clamp(0.0, 1.0));

        self.gate.set(up);
        debug!(state = %self.state, up, sojourn_secs, "mobility transition");
        Duration::from_secs_f64(sojourn_secs)
    }

    /// Drive the machine until shutdown.
    pub async fn run(mut self, shutdown: CancellationToken) {
        info!(state = %self.state, "link simulator started");
        loop {
            let sojourn = self.step();
            tokio::select! {
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(sojourn) => {}
            }
        }
        info!("link simulator stopped");
    }
}
