//! Command handlers for the rules engine.
//!
//! A handler binds the command's objects, drives the action lifecycle and
//! hands back the journal events the resolution produced.

use arbiter_core::command::Command;
use arbiter_core::error::RulesError;
use tracing::{info, instrument};

use crate::domain::actions::{ActionExt, Binding};
use crate::domain::commands::ResolveAction;
use crate::domain::context::Context;
use crate::domain::events::ResolutionEvent;

/// Handles the `ResolveAction` command.
///
/// The action is prepared once with only its source bound, then cloned for
/// each target so target-agnostic work such as base damage is shared. With
/// no targets the action is invoked once, untargeted.
///
/// # Errors
///
/// Returns the first `RulesError` raised. Events and object changes
/// committed before the failure are kept in `ctx`.
#[instrument(
    skip(command, ctx),
    fields(
        command_type = command.command_type(),
        correlation_id = %command.correlation_id,
        kind = %command.action.kind()
    )
)]
pub fn handle_resolve_action(
    command: &ResolveAction,
    ctx: &mut Context,
) -> Result<Vec<ResolutionEvent>, RulesError> {
    ctx.set_correlation_id(command.correlation_id);

    let binding = Binding::new()
        .with_source(command.source)
        .with_origin_item(command.origin_item);
    let mut prepared = command.action.instantiate();
    binding.bind_before_prepare(prepared.header_mut());
    prepared.prepare(ctx)?;

    if command.targets.is_empty() {
        prepared.invoke(ctx)?;
    } else {
        for target in &command.targets {
            let mut action = prepared.clone();
            binding
                .clone()
                .with_target(Some(*target))
                .bind_target(action.header_mut());
            action.invoke(ctx)?;
        }
    }

    let events = ctx.drain_journal();
    info!(
        targets = command.targets.len(),
        events = events.len(),
        "action resolved"
    );
    Ok(events)
}
