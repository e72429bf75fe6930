//! Attaching and detaching effects.

use arbiter_core::error::RulesError;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Action, ActionHeader, ActionKind, Cancelable};
use crate::domain::context::Context;
use crate::domain::events::{EffectGiven, EffectRemoved, ResolutionEventKind};

/// Content payload of `give_effect` and `remove_effect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectRequest {
    /// Effect template id.
    pub effect: String,
}

/// Instantiates an effect template onto the target.
#[derive(Debug, Clone)]
pub struct GiveEffect {
    header: ActionHeader,
    request: EffectRequest,
    canceled: bool,
}

impl GiveEffect {
    /// Creates a fresh action.
    #[must_use]
    pub fn new(request: EffectRequest) -> Self {
        Self::with_header(ActionHeader::new(ActionKind::GiveEffect), request)
    }

    /// Creates the action around an existing header.
    #[must_use]
    pub fn with_header(header: ActionHeader, request: EffectRequest) -> Self {
        Self {
            header,
            request,
            canceled: false,
        }
    }
}

impl Action for GiveEffect {
    header_accessors!(ActionKind::GiveEffect);

    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        if self.canceled {
            ctx.record_canceled(&self.header);
            return Ok(());
        }
        let target = self.header.target()?;
        let modifier = ctx.templates.effect(&self.request.effect)?.instantiate(
            &self.request.effect,
            self.header.source,
            Some(target),
            self.header.origin_item,
        );
        let modifier_id = modifier.id;
        ctx.objects.actor_mut(target)?.modifiers.push(modifier);

        info!(%target, effect = %self.request.effect, "effect given");
        ctx.record(ResolutionEventKind::EffectGiven(EffectGiven {
            target,
            effect: self.request.effect.clone(),
            modifier_id,
        }));
        Ok(())
    }

    fn as_cancelable_mut(&mut self) -> Option<&mut dyn Cancelable> {
        Some(self)
    }
}

impl Cancelable for GiveEffect {
    fn is_canceled(&self) -> bool {
        self.canceled
    }

    fn cancel(&mut self) {
        self.canceled = true;
    }
}

/// Removes every modifier instantiated from an effect template.
#[derive(Debug, Clone)]
pub struct RemoveEffect {
    header: ActionHeader,
    request: EffectRequest,
    canceled: bool,
    removed: usize,
}

impl RemoveEffect {
    /// Creates a fresh action.
    #[must_use]
    pub fn new(request: EffectRequest) -> Self {
        Self::with_header(ActionHeader::new(ActionKind::RemoveEffect), request)
    }

    /// Creates the action around an existing header.
    #[must_use]
    pub fn with_header(header: ActionHeader, request: EffectRequest) -> Self {
        Self {
            header,
            request,
            canceled: false,
            removed: 0,
        }
    }

    /// Number of modifiers removed, once resolved.
    #[must_use]
    pub fn removed(&self) -> usize {
        self.removed
    }
}

impl Action for RemoveEffect {
    header_accessors!(ActionKind::RemoveEffect);

    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        if self.canceled {
            ctx.record_canceled(&self.header);
            return Ok(());
        }
        let target = self.header.target()?;
        let effect = self.request.effect.as_str();
        let modifiers = &mut ctx.objects.actor_mut(target)?.modifiers;
        let before = modifiers.len();
        modifiers.retain(|m| m.template.as_deref() != Some(effect));
        self.removed = before - modifiers.len();

        info!(%target, effect, removed = self.removed, "effect removed");
        ctx.record(ResolutionEventKind::EffectRemoved(EffectRemoved {
            target,
            effect: self.request.effect.clone(),
            removed: self.removed,
        }));
        Ok(())
    }

    fn as_cancelable_mut(&mut self) -> Option<&mut dyn Cancelable> {
        Some(self)
    }
}

impl Cancelable for RemoveEffect {
    fn is_canceled(&self) -> bool {
        self.canceled
    }

    fn cancel(&mut self) {
        self.canceled = true;
    }
}
