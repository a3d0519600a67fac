//! # roam-link
//!
//! The locally simulated network-quality process and the [`Gate`] it
//! drives.
//!
//! A [`LinkSimulator`] walks a three-state mobility machine (idle,
//! walking, driving), staying in each state for a randomly drawn sojourn
//! and sampling link availability once per sojourn. The sampled value is
//! pushed into the shared [`Gate`]; the consumption loop reads the gate
//! before dispatching each delivery. The two activities share nothing
//! else.

#![deny(unsafe_code)]

pub mod gate;
pub mod profile;
pub mod simulator;

pub use gate::Gate;
pub use profile::{LinkProfile, MobilityState, SojournRange, StateProfile};
pub use simulator::LinkSimulator;
