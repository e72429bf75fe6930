//! Arbiter Core: shared abstractions.
//!
//! This crate defines the error taxonomy, the deterministic RNG seam, engine
//! configuration and the command/event traits that the rules and content
//! crates build on. It contains no resolution logic.

pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod rng;
