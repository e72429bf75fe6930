//! Query handlers for the rules engine.
//!
//! Queries read the object registry of a context and return read-only view
//! DTOs.

use arbiter_core::error::RulesError;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::context::Context;

/// Read-only view of one resource.
#[derive(Debug, Serialize)]
pub struct ResourceView {
    /// The resource identifier.
    pub resource_id: Uuid,
    /// Resource kind.
    pub resource_type: String,
    /// Strength tier.
    pub potency: i64,
    /// True once spent.
    pub exhausted: bool,
    /// True if granted by `give_resource`.
    pub temporary: bool,
}

/// Read-only view of an actor's mutable state.
#[derive(Debug, Serialize)]
pub struct ActorView {
    /// The actor identifier.
    pub actor_id: Uuid,
    /// Display name.
    pub name: String,
    /// Current hit points.
    pub hit_points: i64,
    /// Maximum hit points.
    pub maximum_hit_points: i64,
    /// Temporary hit points.
    pub temporary_hit_points: i64,
    /// Names of the active modifiers, in attachment order.
    pub modifiers: Vec<String>,
    /// Resource pool.
    pub resources: Vec<ResourceView>,
    /// Actor tags.
    pub tags: Vec<String>,
}

/// Retrieves an actor by ID.
///
/// # Errors
///
/// Returns `RulesError::ObjectNotFound` if no actor has this ID.
pub fn get_actor(ctx: &Context, actor_id: Uuid) -> Result<ActorView, RulesError> {
    let actor = ctx.objects.actor(actor_id)?;
    Ok(ActorView {
        actor_id,
        name: actor.name.clone(),
        hit_points: actor.hit_points.current,
        maximum_hit_points: actor.hit_points.maximum,
        temporary_hit_points: actor.hit_points.temporary,
        modifiers: actor.modifiers.iter().map(|m| m.name.clone()).collect(),
        resources: actor
            .resources
            .iter()
            .map(|r| ResourceView {
                resource_id: r.id,
                resource_type: r.resource_type.clone(),
                potency: r.potency,
                exhausted: r.exhausted,
                temporary: r.is_temporary(),
            })
            .collect(),
        tags: actor.tags.clone(),
    })
}

#[cfg(test)]
mod tests {
    use arbiter_core::config::EngineConfig;
    use arbiter_test_support::MockRng;

    use super::*;
    use crate::domain::context::Templates;
    use crate::domain::objects::{Actor, ObjectStore};
    use crate::domain::resources::Resource;

    #[test]
    fn test_get_actor_returns_view() {
        let mut objects = ObjectStore::new();
        let id = objects.insert_actor(
            Actor::new("Wizard")
                .with_hit_points(18)
                .with_resource(Resource::new("spell_slot", 1))
                .with_tag("caster"),
        );
        let ctx = Context::new(objects, Templates::new(), EngineConfig::default(), Box::new(MockRng));

        let view = get_actor(&ctx, id).unwrap();
        assert_eq!(view.name, "Wizard");
        assert_eq!(view.hit_points, 18);
        assert_eq!(view.resources.len(), 1);
        assert!(!view.resources[0].temporary);
        assert_eq!(view.tags, vec!["caster"]);
    }

    #[test]
    fn test_get_actor_not_found() {
        let ctx = Context::new(
            ObjectStore::new(),
            Templates::new(),
            EngineConfig::default(),
            Box::new(MockRng),
        );
        let missing = Uuid::new_v4();
        assert_eq!(
            get_actor(&ctx, missing).unwrap_err(),
            RulesError::ObjectNotFound(missing)
        );
    }
}
