//! The resolution context.
//!
//! One [`Context`] is threaded explicitly through every `prepare` and
//! `invoke` of a call tree. It owns the object registry, the loaded
//! templates, the RNG, the nesting depth counter and the journal, and it
//! implements the modifier protocol: which modifiers are in scope for an
//! action, and running each of them at most once.

use std::collections::HashMap;

use arbiter_core::config::EngineConfig;
use arbiter_core::error::RulesError;
use arbiter_core::event::EventMetadata;
use arbiter_core::rng::DeterministicRng;
use tracing::{debug, info};
use uuid::Uuid;

use super::actions::{Action, ActionHeader, ActionSpec, Binding, resolve_nested};
use super::events::{ActionCanceled, ResolutionEvent, ResolutionEventKind};
use super::modifiers::{Modifier, ModifierTemplate};
use super::objects::ObjectStore;
use super::resources::ResourceTemplate;

/// Loaded content templates, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct Templates {
    actions: HashMap<String, ActionSpec>,
    effects: HashMap<String, ModifierTemplate>,
    resources: HashMap<String, ResourceTemplate>,
}

impl Templates {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action template, replacing any with the same id.
    pub fn insert_action(&mut self, id: &str, action: ActionSpec) {
        self.actions.insert(id.to_owned(), action);
    }

    /// Registers an effect template, replacing any with the same id.
    pub fn insert_effect(&mut self, id: &str, effect: ModifierTemplate) {
        self.effects.insert(id.to_owned(), effect);
    }

    /// Registers a resource template, replacing any with the same id.
    pub fn insert_resource(&mut self, id: &str, resource: ResourceTemplate) {
        self.resources.insert(id.to_owned(), resource);
    }

    /// Looks up an action template.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::UnknownTemplate` if no template has this id.
    pub fn action(&self, id: &str) -> Result<&ActionSpec, RulesError> {
        self.actions.get(id).ok_or_else(|| unknown("action", id))
    }

    /// Looks up an effect template.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::UnknownTemplate` if no template has this id.
    pub fn effect(&self, id: &str) -> Result<&ModifierTemplate, RulesError> {
        self.effects.get(id).ok_or_else(|| unknown("effect", id))
    }

    /// Looks up a resource template.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::UnknownTemplate` if no template has this id.
    pub fn resource(&self, id: &str) -> Result<&ResourceTemplate, RulesError> {
        self.resources.get(id).ok_or_else(|| unknown("resource", id))
    }

    /// True if an effect template has this id.
    #[must_use]
    pub fn has_effect(&self, id: &str) -> bool {
        self.effects.contains_key(id)
    }

    /// True if a resource template has this id.
    #[must_use]
    pub fn has_resource(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    /// Number of templates of each category: actions, effects, resources.
    #[must_use]
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.actions.len(), self.effects.len(), self.resources.len())
    }

    /// Action templates in no particular order.
    pub fn actions(&self) -> impl Iterator<Item = (&str, &ActionSpec)> {
        self.actions.iter().map(|(id, spec)| (id.as_str(), spec))
    }

    /// Effect templates in no particular order.
    pub fn effects(&self) -> impl Iterator<Item = (&str, &ModifierTemplate)> {
        self.effects.iter().map(|(id, effect)| (id.as_str(), effect))
    }
}

fn unknown(category: &'static str, id: &str) -> RulesError {
    RulesError::UnknownTemplate {
        category,
        id: id.to_owned(),
    }
}

/// State shared by one resolution call tree.
pub struct Context {
    /// Live actors and items.
    pub objects: ObjectStore,
    /// Loaded content.
    pub templates: Templates,
    config: EngineConfig,
    rng: Box<dyn DeterministicRng>,
    depth: usize,
    correlation_id: Uuid,
    sequence: i64,
    journal: Vec<ResolutionEvent>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("depth", &self.depth)
            .field("correlation_id", &self.correlation_id)
            .field("journal_len", &self.journal.len())
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Creates a context with a fresh correlation id.
    #[must_use]
    pub fn new(
        objects: ObjectStore,
        templates: Templates,
        config: EngineConfig,
        rng: Box<dyn DeterministicRng>,
    ) -> Self {
        Self {
            objects,
            templates,
            config,
            rng,
            depth: 0,
            correlation_id: Uuid::new_v4(),
            sequence: 0,
            journal: Vec::new(),
        }
    }

    /// Sets the correlation id stamped on journal events (builder pattern).
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Replaces the correlation id for subsequent events.
    pub fn set_correlation_id(&mut self, correlation_id: Uuid) {
        self.correlation_id = correlation_id;
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The RNG every die draws from once its determined queue is empty.
    pub fn rng(&mut self) -> &mut dyn DeterministicRng {
        self.rng.as_mut()
    }

    /// Current nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn enter(&mut self) -> Result<(), RulesError> {
        let limit = self.config.max_nesting_depth;
        if self.depth >= limit {
            return Err(RulesError::NestingTooDeep { limit });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Modifiers carried by the action's source and target, plus those
    /// supplied by items they have equipped. Each modifier appears once.
    fn modifiers_in_scope(&self, header: &ActionHeader) -> Vec<Modifier> {
        let mut owners = Vec::with_capacity(2);
        owners.extend(header.source);
        if header.target != header.source {
            owners.extend(header.target);
        }

        let mut scope: Vec<Modifier> = Vec::new();
        for owner in owners {
            let Some(actor) = self.objects.find_actor(owner) else {
                continue;
            };
            scope.extend(actor.modifiers.iter().cloned());
            for item_id in actor.equipped.values() {
                if let Ok(item) = self.objects.item(*item_id) {
                    scope.extend(
                        item.modifiers
                            .iter()
                            .map(|m| m.clone().bound_to(owner, item.id)),
                    );
                }
            }
        }

        let mut seen = Vec::with_capacity(scope.len());
        scope.retain(|m| {
            let fresh = !seen.contains(&m.id);
            seen.push(m.id);
            fresh
        });
        scope
    }

    /// Runs every in-scope modifier whose filters select `action`.
    ///
    /// A modifier's identity is recorded on the action before its
    /// operations run, and a modifier already recorded is skipped, so each
    /// modifier applies at most once per action.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by an operation.
    pub fn process_action<A: Action + ?Sized>(&mut self, action: &mut A) -> Result<(), RulesError> {
        for modifier in self.modifiers_in_scope(action.header()) {
            if action.header().has_applied(modifier.id) {
                debug!(modifier = %modifier.name, kind = %action.kind(), "modifier already applied, skipping");
                continue;
            }
            let matching: Vec<_> = modifier
                .filters
                .iter()
                .filter(|filter| filter.matches(&modifier, action, &self.objects))
                .collect();
            if matching.is_empty() {
                continue;
            }

            action.header_mut().applied_modifiers.push(modifier.id);
            debug!(modifier = %modifier.name, kind = %action.kind(), "modifier applies");
            for filter in matching {
                for operation in &filter.operations {
                    operation.apply(&modifier, action, self)?;
                }
            }
        }
        Ok(())
    }

    /// Instantiates and resolves a content action under `binding`.
    ///
    /// # Errors
    ///
    /// Returns any lifecycle or resolution error of the action.
    pub fn invoke_spec(&mut self, spec: &ActionSpec, binding: &Binding) -> Result<(), RulesError> {
        let mut action = spec.instantiate();
        resolve_nested(action.as_mut(), binding, self)
    }

    /// Appends an event to the journal.
    pub fn record(&mut self, kind: ResolutionEventKind) {
        self.sequence += 1;
        let metadata =
            EventMetadata::for_resolution(kind.event_type(), self.sequence, self.correlation_id);
        self.journal.push(ResolutionEvent { metadata, kind });
    }

    /// Records that a modifier canceled the action.
    pub fn record_canceled(&mut self, header: &ActionHeader) {
        info!(kind = %header.declared_kind, "action canceled");
        self.record(ResolutionEventKind::ActionCanceled(ActionCanceled {
            kind: header.declared_kind,
            source: header.source,
            target: header.target,
        }));
    }

    /// Events recorded so far.
    #[must_use]
    pub fn journal(&self) -> &[ResolutionEvent] {
        &self.journal
    }

    /// Takes the recorded events, leaving the journal empty. Sequence
    /// numbers keep counting.
    pub fn drain_journal(&mut self) -> Vec<ResolutionEvent> {
        std::mem::take(&mut self.journal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actions::{ActionKind, HealingDelivery};
    use crate::domain::modifiers::ModifierFilter;
    use crate::domain::objects::{Actor, Item};
    use crate::domain::operations::{Formula, Operation};
    use arbiter_test_support::MockRng;

    fn context(objects: ObjectStore) -> Context {
        Context::new(
            objects,
            Templates::new(),
            EngineConfig::default(),
            Box::new(MockRng),
        )
    }

    fn bonus_on_healing(value: i64) -> ModifierFilter {
        ModifierFilter {
            subevent: ActionKind::HealingDelivery,
            tags: vec![],
            conditions: vec![],
            operations: vec![Operation::AddBonus {
                value: Formula::Flat(value),
            }],
        }
    }

    // --- modifier protocol ---

    #[test]
    fn test_modifier_applies_at_most_once_per_action() {
        let mut objects = ObjectStore::new();
        let modifier = Modifier::new("blessing", vec![bonus_on_healing(2)]);
        let healer = objects.insert_actor(Actor::new("Cleric").with_modifier(modifier.clone()));
        let mut ctx = context(objects);

        let mut action = HealingDelivery::new(5);
        action.header_mut().source = Some(healer);
        ctx.process_action(&mut action).unwrap();
        ctx.process_action(&mut action).unwrap();

        assert_eq!(action.header().applied_modifiers, vec![modifier.id]);
        assert_eq!(action.calculation_mut().unwrap().get().unwrap(), 7);
    }

    #[test]
    fn test_every_matching_filter_of_a_modifier_runs() {
        let mut objects = ObjectStore::new();
        let modifier = Modifier::new("double", vec![bonus_on_healing(1), bonus_on_healing(3)]);
        let healer = objects.insert_actor(Actor::new("Druid").with_modifier(modifier));
        let mut ctx = context(objects);

        let mut action = HealingDelivery::new(0);
        action.header_mut().source = Some(healer);
        ctx.process_action(&mut action).unwrap();

        assert_eq!(action.calculation_mut().unwrap().get().unwrap(), 4);
    }

    #[test]
    fn test_equipped_item_modifiers_are_in_scope_for_the_wearer() {
        let mut objects = ObjectStore::new();
        let amulet = Item::new("Amulet of Health").with_modifier(Modifier::new(
            "amulet",
            vec![bonus_on_healing(1)],
        ));
        let modifier_id = amulet.modifiers[0].id;
        let amulet_id = objects.insert_item(amulet);
        let wearer = objects.insert_actor(Actor::new("Paladin"));
        objects.equip(wearer, "neck", amulet_id).unwrap();
        let mut ctx = context(objects);

        let mut action = HealingDelivery::new(3);
        action.header_mut().target = Some(wearer);
        ctx.process_action(&mut action).unwrap();

        assert_eq!(action.header().applied_modifiers, vec![modifier_id]);
        assert_eq!(action.calculation_mut().unwrap().get().unwrap(), 4);
    }

    #[test]
    fn test_modifiers_of_unrelated_actors_are_out_of_scope() {
        let mut objects = ObjectStore::new();
        objects.insert_actor(
            Actor::new("Bystander").with_modifier(Modifier::new("aura", vec![bonus_on_healing(9)])),
        );
        let healer = objects.insert_actor(Actor::new("Cleric"));
        let mut ctx = context(objects);

        let mut action = HealingDelivery::new(5);
        action.header_mut().source = Some(healer);
        ctx.process_action(&mut action).unwrap();

        assert!(action.header().applied_modifiers.is_empty());
        assert_eq!(action.calculation_mut().unwrap().get().unwrap(), 5);
    }

    #[test]
    fn test_operation_on_incapable_action_is_a_mismatch() {
        let mut objects = ObjectStore::new();
        let filter = ModifierFilter {
            subevent: ActionKind::HealingDelivery,
            tags: vec![],
            conditions: vec![],
            operations: vec![Operation::GrantAdvantage],
        };
        let healer =
            objects.insert_actor(Actor::new("Cleric").with_modifier(Modifier::new("bad", vec![filter])));
        let mut ctx = context(objects);

        let mut action = HealingDelivery::new(5);
        action.header_mut().source = Some(healer);
        let err = ctx.process_action(&mut action).unwrap_err();

        assert_eq!(
            err,
            RulesError::OperationMismatch {
                operation: "grant_advantage",
                kind: "healing_delivery",
            }
        );
    }

    // --- depth and journal ---

    #[test]
    fn test_depth_is_bounded_by_config() {
        let mut ctx = Context::new(
            ObjectStore::new(),
            Templates::new(),
            EngineConfig {
                max_nesting_depth: 2,
                ..EngineConfig::default()
            },
            Box::new(MockRng),
        );
        ctx.enter().unwrap();
        ctx.enter().unwrap();
        assert_eq!(ctx.enter(), Err(RulesError::NestingTooDeep { limit: 2 }));
        ctx.leave();
        assert_eq!(ctx.depth(), 1);
    }

    #[test]
    fn test_journal_sequence_survives_drain() {
        let correlation = Uuid::new_v4();
        let mut ctx = context(ObjectStore::new()).with_correlation_id(correlation);
        let header = ActionHeader::new(ActionKind::DealDamage);

        ctx.record_canceled(&header);
        let first = ctx.drain_journal();
        ctx.record_canceled(&header);

        assert_eq!(first.len(), 1);
        assert_eq!(first[0].metadata.sequence_number, 1);
        assert_eq!(first[0].metadata.event_type, "rules.action_canceled");
        assert_eq!(first[0].metadata.correlation_id, correlation);
        assert_eq!(ctx.journal()[0].metadata.sequence_number, 2);
    }

    #[test]
    fn test_unknown_templates_name_their_category() {
        let templates = Templates::new();
        assert_eq!(
            templates.effect("bless").unwrap_err(),
            RulesError::UnknownTemplate {
                category: "effect",
                id: "bless".to_owned(),
            }
        );
    }
}
