//! Resolves a scenario step by step.

use std::path::Path;

use arbiter_content::application::command_handlers::handle_load_pack_file;
use arbiter_content::application::query_handlers::get_pack_summary;
use arbiter_core::config::EngineConfig;
use arbiter_core::event::DomainEvent;
use arbiter_core::rng::DeterministicRng;
use arbiter_rules::application::command_handlers::handle_resolve_action;
use arbiter_rules::application::query_handlers::{ActorView, get_actor};
use arbiter_rules::domain::commands::ResolveAction;
use arbiter_rules::domain::context::{Context, Templates};
use arbiter_rules::domain::events::ResolutionEvent;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::SimError;
use crate::scenario::Scenario;

/// Path of the content pack to load.
pub const CONTENT_KEY: &str = "ARBITER_CONTENT";

/// Path of the scenario to run.
pub const SCENARIO_KEY: &str = "ARBITER_SCENARIO";

/// Seed for reproducible dice.
pub const SEED_KEY: &str = "ARBITER_SEED";

/// One journal event, tagged with the step that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct JournalLine {
    /// Zero-based step index.
    pub step: usize,
    /// Journal type name.
    pub event_type: &'static str,
    /// Position in the journal.
    pub sequence_number: i64,
    /// Correlation ID of the step's command.
    pub correlation_id: Uuid,
    /// Event payload.
    pub payload: serde_json::Value,
}

impl JournalLine {
    fn new(step: usize, event: &ResolutionEvent) -> Self {
        Self {
            step,
            event_type: event.event_type(),
            sequence_number: event.metadata.sequence_number,
            correlation_id: event.metadata.correlation_id,
            payload: event.to_payload(),
        }
    }
}

/// Everything a run produced.
#[derive(Debug)]
pub struct SimulationReport {
    /// Journal events across all steps, in order.
    pub journal: Vec<JournalLine>,
    /// Final state of the cast, in scenario order.
    pub actors: Vec<ActorView>,
}

/// Parses `ARBITER_SEED`.
///
/// # Errors
///
/// Returns `SimError::InvalidSeed` if the value is not a `u64`.
pub fn parse_seed(raw: &str) -> Result<u64, SimError> {
    raw.trim()
        .parse()
        .map_err(|_| SimError::InvalidSeed(raw.to_owned()))
}

/// Loads the templates of a content pack, or none without one.
///
/// Skipped units and dangling references are logged; neither stops the
/// run.
///
/// # Errors
///
/// Returns `SimError::Content` if the pack cannot be read or parsed.
pub fn load_templates(content: Option<&Path>) -> Result<Templates, SimError> {
    let Some(path) = content else {
        return Ok(Templates::new());
    };
    let pack = handle_load_pack_file(path, Uuid::new_v4())?;
    let summary = get_pack_summary(&pack);
    for reference in &summary.dangling {
        warn!(
            owner = %reference.owner,
            missing = %reference.id,
            category = reference.category.section(),
            "dangling template reference"
        );
    }
    info!(
        path = %path.display(),
        version_hash = %summary.version_hash,
        skipped = summary.issues.len(),
        "content ready"
    );
    Ok(pack.into_templates())
}

/// Builds the cast and resolves every step in order.
///
/// # Errors
///
/// Returns `SimError::Rules` if the cast cannot be built,
/// `SimError::UnknownActor` for a step naming an unknown actor, or
/// `SimError::Step` if a resolution fails. Steps resolved before the
/// failure keep their effects.
pub fn run_scenario(
    scenario: &Scenario,
    templates: Templates,
    config: EngineConfig,
    rng: Box<dyn DeterministicRng>,
) -> Result<SimulationReport, SimError> {
    let mut roster = scenario.build(&templates)?;
    let actor_ids = roster.ids().to_vec();

    let objects = std::mem::take(&mut roster.objects);
    let mut ctx = Context::new(objects, templates, config, rng);
    let mut journal = Vec::new();

    for (index, step) in scenario.steps.iter().enumerate() {
        let source = roster.id(index, &step.source)?;
        let targets = step
            .targets
            .iter()
            .map(|name| roster.id(index, name))
            .collect::<Result<Vec<_>, _>>()?;
        let action = step
            .action
            .resolve(&ctx.templates)
            .map_err(|source| SimError::Step { step: index, source })?;

        let command = ResolveAction {
            correlation_id: Uuid::new_v4(),
            action,
            source: Some(source),
            targets,
            origin_item: None,
        };
        let events = handle_resolve_action(&command, &mut ctx)
            .map_err(|source| SimError::Step { step: index, source })?;
        journal.extend(events.iter().map(|event| JournalLine::new(index, event)));
    }

    let actors = actor_ids
        .into_iter()
        .map(|id| get_actor(&ctx, id))
        .collect::<Result<Vec<_>, _>>()?;
    info!(
        steps = scenario.steps.len(),
        events = journal.len(),
        "scenario complete"
    );
    Ok(SimulationReport { journal, actors })
}

#[cfg(test)]
mod tests {
    use arbiter_test_support::SequenceRng;

    use super::*;

    // --- seed ---

    #[test]
    fn test_parse_seed_accepts_padded_integer() {
        assert_eq!(parse_seed(" 42\n").unwrap(), 42);
    }

    #[test]
    fn test_parse_seed_rejects_text() {
        assert!(matches!(parse_seed("abc"), Err(SimError::InvalidSeed(raw)) if raw == "abc"));
    }

    // --- running ---

    #[test]
    fn test_no_content_means_no_templates() {
        assert_eq!(load_templates(None).unwrap().counts(), (0, 0, 0));
    }

    #[test]
    fn test_steps_share_one_registry() {
        let scenario = Scenario::from_yaml(
            r"
actors:
  - name: Cleric
    hit_points: 10
  - name: Guard
    hit_points: 20
steps:
  - source: Cleric
    targets: [Guard]
    action:
      subevent: deal_damage
      damage: [{type: radiant, dice: [{size: 8, determined: [5]}]}]
  - source: Cleric
    targets: [Guard]
    action:
      subevent: give_healing
      healing: [{dice: [{size: 4, determined: [2]}]}]
",
        )
        .unwrap();

        let report = run_scenario(
            &scenario,
            Templates::new(),
            EngineConfig::default(),
            Box::new(SequenceRng::new(vec![])),
        )
        .unwrap();

        let steps: Vec<(usize, &str)> = report
            .journal
            .iter()
            .map(|line| (line.step, line.event_type))
            .collect();
        assert_eq!(
            steps,
            vec![(0, "rules.damage_delivered"), (1, "rules.healing_delivered")]
        );
        assert_eq!(report.actors[1].hit_points, 17);
    }

    #[test]
    fn test_failed_step_reports_its_index() {
        let scenario = Scenario::from_yaml(
            r"
actors:
  - name: Wizard
steps:
  - source: Wizard
    action: fireball
",
        )
        .unwrap();

        let result = run_scenario(
            &scenario,
            Templates::new(),
            EngineConfig::default(),
            Box::new(SequenceRng::new(vec![])),
        );

        assert!(matches!(result, Err(SimError::Step { step: 0, .. })));
    }
}
