//! Scenario documents: the cast and the steps to resolve.

use std::collections::HashMap;
use std::path::Path;

use arbiter_core::error::RulesError;
use arbiter_rules::domain::actions::ActionSpec;
use arbiter_rules::domain::context::Templates;
use arbiter_rules::domain::objects::{
    ARMOR_SLOT, AbilityScores, Actor, Item, ObjectStore, ProficiencyBonus, ProficiencyLevel,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::SimError;

/// Worn armor.
#[derive(Debug, Clone, Deserialize)]
pub struct ArmorSpec {
    /// Item name.
    #[serde(default = "armor_name")]
    pub name: String,
    /// Armor class before dexterity.
    pub base: i64,
    /// Largest dexterity modifier added; unlimited when absent.
    #[serde(default)]
    pub dexterity_cap: Option<i64>,
}

fn armor_name() -> String {
    "Armor".to_owned()
}

/// One member of the cast.
#[derive(Debug, Clone, Deserialize)]
pub struct ActorSpec {
    /// Unique name, used by steps to refer to the actor.
    pub name: String,
    /// Ability scores.
    #[serde(default)]
    pub abilities: AbilityScores,
    /// Proficiency bonus derivation.
    #[serde(default)]
    pub proficiency_bonus: ProficiencyBonus,
    /// Proficiency level per subject.
    #[serde(default)]
    pub proficiencies: HashMap<String, ProficiencyLevel>,
    /// Maximum hit points; the actor starts at full.
    #[serde(default)]
    pub hit_points: i64,
    /// Worn armor.
    #[serde(default)]
    pub armor: Option<ArmorSpec>,
    /// Resource template ids, one instance each.
    #[serde(default)]
    pub resources: Vec<String>,
    /// Effect template ids attached at the start.
    #[serde(default)]
    pub effects: Vec<String>,
    /// Actor tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The action a step resolves.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StepAction {
    /// An action template id from the content pack.
    Template(String),
    /// An action written out in the scenario.
    Inline(ActionSpec),
}

impl StepAction {
    /// The concrete action for this step.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::UnknownTemplate` if a template id is not loaded.
    pub fn resolve(&self, templates: &Templates) -> Result<ActionSpec, RulesError> {
        match self {
            Self::Template(id) => templates.action(id).cloned(),
            Self::Inline(spec) => Ok(spec.clone()),
        }
    }
}

/// One resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Name of the acting actor.
    pub source: String,
    /// Names of the targets; none for self-contained actions.
    #[serde(default)]
    pub targets: Vec<String>,
    /// What to resolve.
    pub action: StepAction,
}

/// A cast and the steps they take, in order.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// The cast.
    #[serde(default)]
    pub actors: Vec<ActorSpec>,
    /// Steps in resolution order.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Actors built from a scenario, addressable by name.
#[derive(Debug)]
pub struct Roster {
    /// The object registry holding the cast.
    pub objects: ObjectStore,
    ids: HashMap<String, Uuid>,
    order: Vec<Uuid>,
}

impl Roster {
    /// Identifier of the actor called `name`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::UnknownActor` if the scenario has no such actor.
    pub fn id(&self, step: usize, name: &str) -> Result<Uuid, SimError> {
        self.ids
            .get(name)
            .copied()
            .ok_or_else(|| SimError::UnknownActor {
                step,
                name: name.to_owned(),
            })
    }

    /// Actor identifiers in scenario order.
    #[must_use]
    pub fn ids(&self) -> &[Uuid] {
        &self.order
    }
}

impl Scenario {
    /// Parses a YAML or JSON scenario.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Scenario` if the document is malformed.
    pub fn from_yaml(source: &str) -> Result<Self, SimError> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Reads and parses a scenario file.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Io` if the file cannot be read, or
    /// `SimError::Scenario` if it is malformed.
    pub fn from_file(path: &Path) -> Result<Self, SimError> {
        let source = std::fs::read_to_string(path).map_err(|source| SimError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&source)
    }

    /// Creates every actor, equips armor, grants resources and attaches
    /// starting effects.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Rules` if a resource or effect template is not
    /// loaded.
    pub fn build(&self, templates: &Templates) -> Result<Roster, SimError> {
        let mut objects = ObjectStore::new();
        let mut ids = HashMap::new();
        let mut order = Vec::with_capacity(self.actors.len());

        for spec in &self.actors {
            let mut actor = Actor::new(&spec.name).with_hit_points(spec.hit_points);
            actor.abilities = spec.abilities;
            actor.proficiency_bonus = spec.proficiency_bonus;
            actor.proficiencies.clone_from(&spec.proficiencies);
            actor.tags.clone_from(&spec.tags);
            for id in &spec.resources {
                actor.resources.push(templates.resource(id)?.instantiate(None));
            }
            let actor_id = objects.insert_actor(actor);

            if let Some(armor) = &spec.armor {
                let item = objects
                    .insert_item(Item::new(&armor.name).with_armor(armor.base, armor.dexterity_cap));
                objects.equip(actor_id, ARMOR_SLOT, item)?;
            }
            for id in &spec.effects {
                let modifier =
                    templates
                        .effect(id)?
                        .instantiate(id, Some(actor_id), Some(actor_id), None);
                objects.actor_mut(actor_id)?.modifiers.push(modifier);
            }

            ids.insert(spec.name.clone(), actor_id);
            order.push(actor_id);
        }

        Ok(Roster {
            objects,
            ids,
            order,
        })
    }
}

#[cfg(test)]
mod tests {
    use arbiter_rules::domain::modifiers::ModifierTemplate;
    use arbiter_rules::domain::resources::ResourceTemplate;

    use super::*;

    const SCENARIO: &str = r"
actors:
  - name: Mira
    abilities: {dex: 16}
    hit_points: 24
    armor: {base: 12}
    resources: [ki]
    effects: [alert]
  - name: Bandit
    hit_points: 11
steps:
  - source: Mira
    targets: [Bandit]
    action: flurry
  - source: Bandit
    action:
      subevent: ability_check
      ability: wis
";

    fn templates() -> Templates {
        let mut templates = Templates::new();
        templates.insert_effect("alert", ModifierTemplate::default());
        templates.insert_resource(
            "ki",
            ResourceTemplate {
                resource_type: "ki".to_owned(),
                potency: 1,
                refresh: Some("short_rest".to_owned()),
                tags: Vec::new(),
            },
        );
        templates
    }

    // --- parsing ---

    #[test]
    fn test_steps_accept_template_ids_and_inline_actions() {
        let scenario = Scenario::from_yaml(SCENARIO).unwrap();

        assert_eq!(scenario.actors.len(), 2);
        assert!(matches!(&scenario.steps[0].action, StepAction::Template(id) if id == "flurry"));
        assert!(matches!(&scenario.steps[1].action, StepAction::Inline(_)));
        assert!(scenario.steps[1].targets.is_empty());
    }

    // --- building ---

    #[test]
    fn test_build_equips_armor_and_attaches_templates() {
        let scenario = Scenario::from_yaml(SCENARIO).unwrap();
        let roster = scenario.build(&templates()).unwrap();

        let mira = roster.id(0, "Mira").unwrap();
        let actor = roster.objects.actor(mira).unwrap();
        assert_eq!(actor.abilities.dexterity, 16);
        assert_eq!(actor.hit_points.current, 24);
        assert_eq!(actor.resources.len(), 1);
        assert_eq!(actor.modifiers[0].template.as_deref(), Some("alert"));
        assert_eq!(roster.objects.equipped_items(mira).unwrap().len(), 1);
        assert_eq!(roster.ids().len(), 2);
    }

    #[test]
    fn test_unknown_actor_names_the_step() {
        let scenario = Scenario::from_yaml(SCENARIO).unwrap();
        let roster = scenario.build(&templates()).unwrap();

        let result = roster.id(3, "Nobody");
        assert!(matches!(result, Err(SimError::UnknownActor { step: 3, .. })));
    }

    #[test]
    fn test_missing_effect_template_fails_the_build() {
        let scenario = Scenario::from_yaml(SCENARIO).unwrap();
        let result = scenario.build(&Templates::new());
        assert!(matches!(result, Err(SimError::Rules(_))));
    }
}
