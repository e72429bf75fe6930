//! Arbiter: scenario runner.
//!
//! Builds actors from a scenario document, resolves its steps in order
//! against a loaded content pack and reports every journal event.

pub mod error;
pub mod runner;
pub mod scenario;
