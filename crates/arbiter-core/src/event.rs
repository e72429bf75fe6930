//! Journal entry abstractions.
//!
//! Every event a resolution records carries the same envelope: its own id,
//! its position in the journal and the correlation id of the command that
//! started the resolution.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Envelope of one journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event identifier.
    pub event_id: Uuid,
    /// Dotted journal type name, e.g. `rules.damage_delivered`.
    pub event_type: String,
    /// Position in the journal, starting at 1 and never reused.
    pub sequence_number: i64,
    /// Correlation ID of the command that started the resolution.
    pub correlation_id: Uuid,
    /// The command that caused the entry. Nested actions have no ids of
    /// their own, so this is always the correlation ID.
    pub causation_id: Uuid,
}

impl EventMetadata {
    /// Envelope for the entry at `sequence_number` of a resolution.
    #[must_use]
    pub fn for_resolution(event_type: &str, sequence_number: i64, correlation_id: Uuid) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.to_owned(),
            sequence_number,
            correlation_id,
            causation_id: correlation_id,
        }
    }
}

/// An entry of the resolution journal.
pub trait DomainEvent: Send + Sync + std::fmt::Debug {
    /// Dotted journal type name.
    fn event_type(&self) -> &'static str;

    /// The variant-specific payload as JSON.
    fn to_payload(&self) -> serde_json::Value;

    /// The envelope.
    fn metadata(&self) -> &EventMetadata;
}
