//! Command handlers for the content context.
//!
//! A pack is one YAML or JSON document with `actions`, `effects` and
//! `resources` mappings keyed by template id. Each unit is parsed on its
//! own: a malformed unit is logged, skipped and reported as an issue, while
//! the rest of the pack still loads.

use std::path::Path;

use arbiter_core::command::Command;
use arbiter_rules::domain::actions::ActionSpec;
use arbiter_rules::domain::context::Templates;
use arbiter_rules::domain::modifiers::ModifierTemplate;
use arbiter_rules::domain::resources::ResourceTemplate;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::commands::LoadContentPack;
use crate::domain::errors::ContentError;
use crate::domain::pack::{ContentCategory, ContentIssue, ContentPack};

/// Hex SHA-256 of a pack source.
#[must_use]
pub fn version_hash(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn section(
    document: &mut Map<String, Value>,
    category: ContentCategory,
) -> Result<Map<String, Value>, ContentError> {
    match document.remove(category.section()) {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(units)) => Ok(units),
        Some(_) => Err(ContentError::NotAMapping {
            section: category.section(),
        }),
    }
}

fn skipped(category: ContentCategory, id: String, reason: String) -> ContentIssue {
    warn!(section = category.section(), %id, %reason, "content unit skipped");
    ContentIssue {
        category,
        id,
        reason,
    }
}

/// Handles the `LoadContentPack` command: parses every unit of the pack
/// into typed templates.
///
/// # Errors
///
/// Returns `ContentError::Syntax` if the source is not YAML or JSON, or
/// `ContentError::NotAMapping` if the document or a section has the wrong
/// shape. Malformed units never fail the load.
#[instrument(
    skip(command),
    fields(command_type = command.command_type(), correlation_id = %command.correlation_id)
)]
pub fn handle_load_pack(command: &LoadContentPack) -> Result<ContentPack, ContentError> {
    let parsed = if command.source.trim().is_empty() {
        Value::Null
    } else {
        serde_yaml::from_str::<Value>(&command.source)?
    };
    let mut document = match parsed {
        Value::Null => Map::new(),
        Value::Object(document) => document,
        _ => return Err(ContentError::NotAMapping { section: "document" }),
    };

    let mut templates = Templates::new();
    let mut issues = Vec::new();

    for (id, unit) in section(&mut document, ContentCategory::Action)? {
        match ActionSpec::from_value(unit) {
            Ok(spec) => templates.insert_action(&id, spec),
            Err(e) => issues.push(skipped(ContentCategory::Action, id, e.to_string())),
        }
    }
    for (id, unit) in section(&mut document, ContentCategory::Effect)? {
        match serde_json::from_value::<ModifierTemplate>(unit) {
            Ok(effect) => templates.insert_effect(&id, effect),
            Err(e) => issues.push(skipped(ContentCategory::Effect, id, e.to_string())),
        }
    }
    for (id, unit) in section(&mut document, ContentCategory::Resource)? {
        match serde_json::from_value::<ResourceTemplate>(unit) {
            Ok(resource) => templates.insert_resource(&id, resource),
            Err(e) => issues.push(skipped(ContentCategory::Resource, id, e.to_string())),
        }
    }

    let pack = ContentPack::new(version_hash(&command.source), templates, issues);
    let (actions, effects, resources) = pack.templates().counts();
    info!(
        version_hash = %pack.version_hash(),
        actions,
        effects,
        resources,
        skipped = pack.issues().len(),
        "content pack loaded"
    );
    Ok(pack)
}

/// Reads a pack file and loads it.
///
/// # Errors
///
/// Returns `ContentError::Io` if the file cannot be read, or any error of
/// [`handle_load_pack`].
pub fn handle_load_pack_file(path: &Path, correlation_id: Uuid) -> Result<ContentPack, ContentError> {
    let source = std::fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    handle_load_pack(&LoadContentPack {
        correlation_id,
        source,
    })
}
