//! Query handlers for the content context.

use serde::Serialize;

use crate::domain::pack::{ContentIssue, ContentPack, DanglingReference};

/// Read-only overview of a loaded pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackSummary {
    /// Hex SHA-256 of the source.
    pub version_hash: String,
    /// Number of action templates.
    pub actions: usize,
    /// Number of effect templates.
    pub effects: usize,
    /// Number of resource templates.
    pub resources: usize,
    /// Units skipped while loading.
    pub issues: Vec<ContentIssue>,
    /// References that name no template.
    pub dangling: Vec<DanglingReference>,
}

/// Summarizes a pack for display or validation.
#[must_use]
pub fn get_pack_summary(pack: &ContentPack) -> PackSummary {
    let (actions, effects, resources) = pack.templates().counts();
    PackSummary {
        version_hash: pack.version_hash().to_owned(),
        actions,
        effects,
        resources,
        issues: pack.issues().to_vec(),
        dangling: pack.dangling_references(),
    }
}
