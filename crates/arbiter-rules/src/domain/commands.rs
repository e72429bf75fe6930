//! Commands accepted by the rules engine.

use arbiter_core::command::Command;
use uuid::Uuid;

use super::actions::ActionSpec;

/// Command to resolve one authorable action against zero or more targets.
#[derive(Debug, Clone)]
pub struct ResolveAction {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The action to resolve.
    pub action: ActionSpec,
    /// The acting actor.
    pub source: Option<Uuid>,
    /// Each target gets its own copy of the prepared action.
    pub targets: Vec<Uuid>,
    /// Item whose use caused the action.
    pub origin_item: Option<Uuid>,
}

impl Command for ResolveAction {
    fn command_type(&self) -> &'static str {
        "rules.resolve_action"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
