#![allow(dead_code)]

use arbiter_core::config::EngineConfig;
use arbiter_core::error::RulesError;
use arbiter_core::event::DomainEvent;
use arbiter_core::rng::DeterministicRng;
use arbiter_rules::application::command_handlers::handle_resolve_action;
use arbiter_rules::domain::actions::ActionSpec;
use arbiter_rules::domain::commands::ResolveAction;
use arbiter_rules::domain::context::{Context, Templates};
use arbiter_rules::domain::events::ResolutionEvent;
use arbiter_rules::domain::modifiers::{Modifier, ModifierFilter};
use arbiter_rules::domain::objects::ObjectStore;
use uuid::Uuid;

/// Builds a context with default engine settings.
pub fn context(
    objects: ObjectStore,
    templates: Templates,
    rng: impl DeterministicRng + 'static,
) -> Context {
    Context::new(objects, templates, EngineConfig::default(), Box::new(rng))
}

/// Resolves a JSON-authored action from `source` against `targets`.
pub fn resolve(
    ctx: &mut Context,
    action: serde_json::Value,
    source: Uuid,
    targets: &[Uuid],
) -> Result<Vec<ResolutionEvent>, RulesError> {
    let command = ResolveAction {
        correlation_id: Uuid::new_v4(),
        action: ActionSpec::from_value(action)?,
        source: Some(source),
        targets: targets.to_vec(),
        origin_item: None,
    };
    handle_resolve_action(&command, ctx)
}

/// Parses one modifier filter from JSON.
pub fn filter(value: serde_json::Value) -> ModifierFilter {
    serde_json::from_value(value).unwrap()
}

/// A modifier with a single JSON-authored filter.
pub fn modifier(name: &str, value: serde_json::Value) -> Modifier {
    Modifier::new(name, vec![filter(value)])
}

/// Events of one journal type, in order.
pub fn of_type<'a>(events: &'a [ResolutionEvent], event_type: &str) -> Vec<&'a ResolutionEvent> {
    events
        .iter()
        .filter(|e| e.event_type() == event_type)
        .collect()
}

pub fn hit_points(ctx: &Context, actor: Uuid) -> i64 {
    ctx.objects.actor(actor).unwrap().hit_points.current
}
