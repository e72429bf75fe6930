//! Command abstractions.
//!
//! A command is one request from outside the engine, such as loading a pack
//! or resolving an action. Its correlation ID stamps every journal entry it
//! produces.

use uuid::Uuid;

/// A request handled by an application layer.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Dotted name, e.g. `rules.resolve_action`, recorded on the handler span.
    fn command_type(&self) -> &'static str;

    /// Identifier shared by every event the command produces.
    fn correlation_id(&self) -> Uuid;
}
