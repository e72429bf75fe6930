//! Passive modifiers and the filters that decide when they apply.
//!
//! A modifier is inert data: a list of filters, each naming an action kind,
//! a set of required tags, optional conditions and the operations to run
//! when everything matches. The [`Context`](super::context::Context) decides
//! which modifiers are in scope and enforces at-most-once application.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::actions::{Action, ActionHeader, ActionKind};
use super::objects::{Ability, ObjectStore};
use super::operations::Operation;

/// Which object a condition or formula refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectRole {
    /// The actor that created the modifier.
    #[default]
    ModifierSource,
    /// The actor the modifier is attached to.
    ModifierTarget,
    /// The source of the action being modified.
    ActionSource,
    /// The target of the action being modified.
    ActionTarget,
}

impl ObjectRole {
    /// Resolves the role to an identifier, if bound.
    #[must_use]
    pub fn resolve(self, modifier: &Modifier, header: &ActionHeader) -> Option<Uuid> {
        match self {
            Self::ModifierSource => modifier.source,
            Self::ModifierTarget => modifier.target,
            Self::ActionSource => header.source,
            Self::ActionTarget => header.target,
        }
    }
}

/// Extra applicability test on top of kind and tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "condition", rename_all = "snake_case")]
pub enum Condition {
    /// Every nested condition holds.
    All {
        /// Nested conditions.
        conditions: Vec<Condition>,
    },
    /// At least one nested condition holds.
    Any {
        /// Nested conditions.
        conditions: Vec<Condition>,
    },
    /// The nested condition does not hold.
    Not {
        /// Nested condition, authored as `of`.
        #[serde(rename = "of")]
        inner: Box<Condition>,
    },
    /// The action carries a tag.
    HasTag {
        /// The tag.
        tag: String,
    },
    /// Two roles resolve to the same object.
    ObjectsMatch {
        /// First role.
        left: ObjectRole,
        /// Second role.
        right: ObjectRole,
    },
    /// The object in a role carries a tag.
    ObjectHasTag {
        /// The role.
        object: ObjectRole,
        /// The tag.
        tag: String,
    },
    /// The action is made with a given ability.
    CheckAbility {
        /// The ability.
        ability: Ability,
    },
}

impl Condition {
    /// Evaluates the condition against an in-flight action.
    pub fn holds<A: Action + ?Sized>(
        &self,
        modifier: &Modifier,
        action: &A,
        objects: &ObjectStore,
    ) -> bool {
        let header = action.header();
        match self {
            Self::All { conditions } => conditions
                .iter()
                .all(|c| c.holds(modifier, action, objects)),
            Self::Any { conditions } => conditions
                .iter()
                .any(|c| c.holds(modifier, action, objects)),
            Self::Not { inner } => !inner.holds(modifier, action, objects),
            Self::HasTag { tag } => header.has_tag(tag),
            Self::ObjectsMatch { left, right } => {
                match (left.resolve(modifier, header), right.resolve(modifier, header)) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            Self::ObjectHasTag { object, tag } => object
                .resolve(modifier, header)
                .is_some_and(|id| objects.has_tag(id, tag)),
            Self::CheckAbility { ability } => action
                .as_has_ability()
                .is_some_and(|a| a.ability() == *ability),
        }
    }
}

/// One applicability rule and the operations it triggers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierFilter {
    /// Action kind this filter reacts to.
    pub subevent: ActionKind,
    /// Tags the action must all carry.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Extra conditions, all of which must hold.
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Operations run in order when the filter matches.
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl ModifierFilter {
    /// True if the filter selects `action`.
    pub fn matches<A: Action + ?Sized>(
        &self,
        modifier: &Modifier,
        action: &A,
        objects: &ObjectStore,
    ) -> bool {
        self.subevent == action.kind()
            && self.tags.iter().all(|tag| action.header().has_tag(tag))
            && self
                .conditions
                .iter()
                .all(|c| c.holds(modifier, action, objects))
    }
}

/// Content template for a modifier ("effect").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierTemplate {
    /// Display name; the template id is used when absent.
    #[serde(default)]
    pub name: Option<String>,
    /// Filters.
    #[serde(default)]
    pub filters: Vec<ModifierFilter>,
}

impl ModifierTemplate {
    /// Creates a live modifier with a fresh identity.
    #[must_use]
    pub fn instantiate(
        &self,
        template_id: &str,
        source: Option<Uuid>,
        target: Option<Uuid>,
        origin_item: Option<Uuid>,
    ) -> Modifier {
        Modifier {
            id: Uuid::new_v4(),
            name: self.name.clone().unwrap_or_else(|| template_id.to_owned()),
            template: Some(template_id.to_owned()),
            source,
            target,
            origin_item,
            filters: self.filters.clone(),
        }
    }
}

/// A live modifier attached to an actor or item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    /// Identity checked by the at-most-once guard.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Template this modifier was created from.
    #[serde(default)]
    pub template: Option<String>,
    /// Actor that created it.
    #[serde(default)]
    pub source: Option<Uuid>,
    /// Actor it is attached to.
    #[serde(default)]
    pub target: Option<Uuid>,
    /// Item that supplies it.
    #[serde(default)]
    pub origin_item: Option<Uuid>,
    /// Filters.
    #[serde(default)]
    pub filters: Vec<ModifierFilter>,
}

impl Modifier {
    /// Creates an unbound modifier with a fresh identity.
    #[must_use]
    pub fn new(name: &str, filters: Vec<ModifierFilter>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            template: None,
            source: None,
            target: None,
            origin_item: None,
            filters,
        }
    }

    /// Fills unbound source and target with `wearer`, keeping the identity.
    /// Used for modifiers supplied by equipped items.
    #[must_use]
    pub fn bound_to(mut self, wearer: Uuid, item: Uuid) -> Self {
        self.source.get_or_insert(wearer);
        self.target.get_or_insert(wearer);
        self.origin_item.get_or_insert(item);
        self
    }
}
