//! Content pack domain types.

pub mod commands;
pub mod errors;
pub mod pack;
