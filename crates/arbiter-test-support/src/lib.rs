//! Shared test doubles for the Arbiter rules-resolution engine.

mod rng;

pub use rng::{MaxRng, MockRng, SequenceRng};
