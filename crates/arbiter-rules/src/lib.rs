//! Arbiter: rules resolution.
//!
//! Responsible for resolving content-authored actions (checks, attacks,
//! saving throws, contests, damage, healing and resource consumption),
//! letting in-scope modifiers intercept each action before it resolves.

pub mod application;
pub mod domain;
