//! Commands accepted by the content context.

use arbiter_core::command::Command;
use uuid::Uuid;

/// Command to load a content pack from its source text.
#[derive(Debug, Clone)]
pub struct LoadContentPack {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// YAML or JSON source of the pack.
    pub source: String,
}

impl Command for LoadContentPack {
    fn command_type(&self) -> &'static str {
        "content.load_pack"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
