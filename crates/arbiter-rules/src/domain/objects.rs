//! Actors, items and the in-memory object registry.

use std::collections::{BTreeMap, HashMap};

use arbiter_core::error::RulesError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::modifiers::Modifier;
use super::resources::Resource;

/// The six ability scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Ability {
    /// Strength.
    #[serde(rename = "str", alias = "strength")]
    Strength,
    /// Dexterity.
    #[serde(rename = "dex", alias = "dexterity")]
    Dexterity,
    /// Constitution.
    #[serde(rename = "con", alias = "constitution")]
    Constitution,
    /// Intelligence.
    #[serde(rename = "int", alias = "intelligence")]
    Intelligence,
    /// Wisdom.
    #[serde(rename = "wis", alias = "wisdom")]
    Wisdom,
    /// Charisma.
    #[serde(rename = "cha", alias = "charisma")]
    Charisma,
}

impl Ability {
    /// Short content key.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::Strength => "str",
            Self::Dexterity => "dex",
            Self::Constitution => "con",
            Self::Intelligence => "int",
            Self::Wisdom => "wis",
            Self::Charisma => "cha",
        }
    }

    /// Proficiency subject for saving throws of this ability, e.g. `dex_save`.
    #[must_use]
    pub fn save_subject(self) -> String {
        format!("{}_save", self.key())
    }
}

/// Modifier derived from an ability score: `floor((score - 10) / 2)`.
#[must_use]
pub fn ability_modifier(score: i64) -> i64 {
    (score - 10).div_euclid(2)
}

/// Ability scores, each defaulting to 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbilityScores {
    /// Strength.
    #[serde(rename = "str")]
    pub strength: i64,
    /// Dexterity.
    #[serde(rename = "dex")]
    pub dexterity: i64,
    /// Constitution.
    #[serde(rename = "con")]
    pub constitution: i64,
    /// Intelligence.
    #[serde(rename = "int")]
    pub intelligence: i64,
    /// Wisdom.
    #[serde(rename = "wis")]
    pub wisdom: i64,
    /// Charisma.
    #[serde(rename = "cha")]
    pub charisma: i64,
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

impl AbilityScores {
    /// Score for one ability.
    #[must_use]
    pub fn get(&self, ability: Ability) -> i64 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }

    /// Overwrites one score.
    pub fn set(&mut self, ability: Ability, score: i64) {
        let slot = match ability {
            Ability::Strength => &mut self.strength,
            Ability::Dexterity => &mut self.dexterity,
            Ability::Constitution => &mut self.constitution,
            Ability::Intelligence => &mut self.intelligence,
            Ability::Wisdom => &mut self.wisdom,
            Ability::Charisma => &mut self.charisma,
        };
        *slot = score;
    }
}

/// How much of the proficiency bonus applies to a subject.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ProficiencyLevel {
    /// No bonus.
    #[default]
    None,
    /// Half the bonus, rounded down.
    Half,
    /// The bonus.
    Full,
    /// Twice the bonus.
    Double,
}

impl ProficiencyLevel {
    /// Scales a proficiency bonus by this level.
    #[must_use]
    pub fn apply(self, bonus: i64) -> i64 {
        match self {
            Self::None => 0,
            Self::Half => bonus.div_euclid(2),
            Self::Full => bonus,
            Self::Double => bonus * 2,
        }
    }
}

/// How an actor's proficiency bonus is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ProficiencyBonus {
    /// A fixed value.
    Flat {
        /// The bonus.
        value: i64,
    },
    /// Derived from character level: `2 + (level - 1) / 4`.
    ByLevel {
        /// Character level, at least 1.
        level: i64,
    },
}

impl Default for ProficiencyBonus {
    fn default() -> Self {
        Self::Flat { value: 2 }
    }
}

impl ProficiencyBonus {
    /// The bonus value.
    #[must_use]
    pub fn value(self) -> i64 {
        match self {
            Self::Flat { value } => value,
            Self::ByLevel { level } => 2 + (level.max(1) - 1) / 4,
        }
    }
}

/// Hit point state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitPoints {
    /// Current hit points, never negative.
    pub current: i64,
    /// Maximum hit points.
    pub maximum: i64,
    /// Temporary hit points, absorbed before current.
    pub temporary: i64,
}

impl HitPoints {
    /// Full hit points with no temporary buffer.
    #[must_use]
    pub fn full(maximum: i64) -> Self {
        Self {
            current: maximum,
            maximum,
            temporary: 0,
        }
    }

    /// Applies damage, draining temporary hit points first. Returns the
    /// amount taken from current hit points.
    pub fn take_damage(&mut self, amount: i64) -> i64 {
        let amount = amount.max(0);
        let absorbed = amount.min(self.temporary);
        self.temporary -= absorbed;
        let remaining = amount - absorbed;
        let before = self.current;
        self.current = (self.current - remaining).max(0);
        before - self.current
    }

    /// Restores hit points up to the maximum. Returns the amount restored.
    pub fn heal(&mut self, amount: i64) -> i64 {
        let before = self.current;
        self.current = (self.current + amount.max(0)).min(self.maximum).max(before);
        self.current - before
    }

    /// Grants temporary hit points. They do not stack: the larger value is
    /// kept. Returns true if the grant replaced the previous buffer.
    pub fn give_temporary(&mut self, amount: i64) -> bool {
        if amount > self.temporary {
            self.temporary = amount;
            true
        } else {
            false
        }
    }
}

/// A grid position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: i64,
    /// Vertical coordinate.
    pub y: i64,
}

/// Body armor worn in the `armor` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Armor {
    /// Armor class before dexterity.
    pub base: i64,
    /// Cap on the dexterity modifier added to `base`; `None` means uncapped.
    #[serde(default)]
    pub dexterity_cap: Option<i64>,
}

/// An item that can be equipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// Identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Armor properties, if this item is armor.
    #[serde(default)]
    pub armor: Option<Armor>,
    /// Modifiers active while the item is equipped.
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
}

impl Item {
    /// Creates an item with a fresh identifier.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            tags: Vec::new(),
            armor: None,
            modifiers: Vec::new(),
        }
    }

    /// Makes the item armor (builder pattern).
    #[must_use]
    pub fn with_armor(mut self, base: i64, dexterity_cap: Option<i64>) -> Self {
        self.armor = Some(Armor {
            base,
            dexterity_cap,
        });
        self
    }

    /// Adds a modifier active while equipped (builder pattern).
    #[must_use]
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }
}

/// Equipment slot that supplies body armor.
pub const ARMOR_SLOT: &str = "armor";

/// A creature taking part in resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    /// Identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Ability scores.
    #[serde(default)]
    pub abilities: AbilityScores,
    /// Proficiency bonus derivation.
    #[serde(default)]
    pub proficiency_bonus: ProficiencyBonus,
    /// Proficiency level per subject (skills, saves, weapon groups).
    #[serde(default)]
    pub proficiencies: HashMap<String, ProficiencyLevel>,
    /// Hit points.
    #[serde(default)]
    pub hit_points: HitPoints,
    /// Equipped item identifiers keyed by slot.
    #[serde(default)]
    pub equipped: BTreeMap<String, Uuid>,
    /// Consumable resources.
    #[serde(default)]
    pub resources: Vec<Resource>,
    /// Active modifiers.
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Grid position, if placed.
    #[serde(default)]
    pub position: Option<Position>,
}

impl Actor {
    /// Creates an actor with default scores and no hit points.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            abilities: AbilityScores::default(),
            proficiency_bonus: ProficiencyBonus::default(),
            proficiencies: HashMap::new(),
            hit_points: HitPoints::default(),
            equipped: BTreeMap::new(),
            resources: Vec::new(),
            modifiers: Vec::new(),
            tags: Vec::new(),
            position: None,
        }
    }

    /// Sets one ability score (builder pattern).
    #[must_use]
    pub fn with_ability(mut self, ability: Ability, score: i64) -> Self {
        self.abilities.set(ability, score);
        self
    }

    /// Sets a flat proficiency bonus (builder pattern).
    #[must_use]
    pub fn with_proficiency_bonus(mut self, value: i64) -> Self {
        self.proficiency_bonus = ProficiencyBonus::Flat { value };
        self
    }

    /// Sets the proficiency level for a subject (builder pattern).
    #[must_use]
    pub fn with_proficiency(mut self, subject: &str, level: ProficiencyLevel) -> Self {
        self.proficiencies.insert(subject.to_owned(), level);
        self
    }

    /// Sets full hit points (builder pattern).
    #[must_use]
    pub fn with_hit_points(mut self, maximum: i64) -> Self {
        self.hit_points = HitPoints::full(maximum);
        self
    }

    /// Adds a resource (builder pattern).
    #[must_use]
    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    /// Adds an active modifier (builder pattern).
    #[must_use]
    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    /// Adds a tag (builder pattern).
    #[must_use]
    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_owned());
        self
    }

    /// Raw ability score.
    #[must_use]
    pub fn ability_score(&self, ability: Ability) -> i64 {
        self.abilities.get(ability)
    }

    /// Ability modifier derived from the raw score.
    #[must_use]
    pub fn ability_modifier(&self, ability: Ability) -> i64 {
        ability_modifier(self.ability_score(ability))
    }

    /// Proficiency level for a subject, `None` when unlisted.
    #[must_use]
    pub fn proficiency_level(&self, subject: &str) -> ProficiencyLevel {
        self.proficiencies.get(subject).copied().unwrap_or_default()
    }

    /// True if the actor carries `tag`.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Registry resolving identifiers to live actors and items.
#[derive(Debug, Clone, Default)]
pub struct ObjectStore {
    actors: HashMap<Uuid, Actor>,
    items: HashMap<Uuid, Item>,
}

impl ObjectStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an actor, returning its identifier.
    pub fn insert_actor(&mut self, actor: Actor) -> Uuid {
        let id = actor.id;
        self.actors.insert(id, actor);
        id
    }

    /// Registers an item, returning its identifier.
    pub fn insert_item(&mut self, item: Item) -> Uuid {
        let id = item.id;
        self.items.insert(id, item);
        id
    }

    /// Looks up an actor.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::ObjectNotFound` if no actor has this identifier.
    pub fn actor(&self, id: Uuid) -> Result<&Actor, RulesError> {
        self.actors.get(&id).ok_or(RulesError::ObjectNotFound(id))
    }

    /// Looks up an actor for mutation.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::ObjectNotFound` if no actor has this identifier.
    pub fn actor_mut(&mut self, id: Uuid) -> Result<&mut Actor, RulesError> {
        self.actors.get_mut(&id).ok_or(RulesError::ObjectNotFound(id))
    }

    /// Looks up an actor without failing.
    #[must_use]
    pub fn find_actor(&self, id: Uuid) -> Option<&Actor> {
        self.actors.get(&id)
    }

    /// Looks up an item.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::ObjectNotFound` if no item has this identifier.
    pub fn item(&self, id: Uuid) -> Result<&Item, RulesError> {
        self.items.get(&id).ok_or(RulesError::ObjectNotFound(id))
    }

    /// Equips an item into a slot, replacing whatever was there.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::ObjectNotFound` if either object is missing.
    pub fn equip(&mut self, actor_id: Uuid, slot: &str, item_id: Uuid) -> Result<(), RulesError> {
        self.item(item_id)?;
        self.actor_mut(actor_id)?
            .equipped
            .insert(slot.to_owned(), item_id);
        Ok(())
    }

    /// Items an actor has equipped, in slot order. Dangling slots are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::ObjectNotFound` if the actor is missing.
    pub fn equipped_items(&self, actor_id: Uuid) -> Result<Vec<&Item>, RulesError> {
        Ok(self
            .actor(actor_id)?
            .equipped
            .values()
            .filter_map(|id| self.items.get(id))
            .collect())
    }

    /// True if the actor or item with this identifier carries `tag`.
    #[must_use]
    pub fn has_tag(&self, id: Uuid, tag: &str) -> bool {
        if let Some(actor) = self.actors.get(&id) {
            return actor.has_tag(tag);
        }
        self.items
            .get(&id)
            .is_some_and(|item| item.tags.iter().any(|t| t == tag))
    }
}
