//! Domain layer: the resolution engine and its data model.

pub mod actions;
pub mod calculation;
pub mod commands;
pub mod context;
pub mod dice;
pub mod events;
pub mod modifiers;
pub mod objects;
pub mod operations;
pub mod pool;
pub mod resources;
pub mod roll;
