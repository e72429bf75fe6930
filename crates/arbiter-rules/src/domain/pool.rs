//! Typed dice pools for damage, healing and temporary hit points.
//!
//! A collection is an ordered list of entries keyed loosely by type: adding
//! an entry whose type is already present merges into it (dice concatenated,
//! bonus summed). Rolling assigns every die a face value; delivery reduces a
//! roll to one integer per type.

use arbiter_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};

use super::dice::{self, DiceDescriptor, Die, RolledDie};

/// A rational scale with an explicit rounding direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScaleDocument")]
pub struct Scale {
    /// Multiplier numerator.
    pub numerator: i64,
    /// Multiplier denominator, never zero.
    pub denominator: i64,
    /// Round toward positive infinity instead of negative infinity.
    pub round_up: bool,
}

#[derive(Deserialize)]
struct ScaleDocument {
    #[serde(default = "one")]
    numerator: i64,
    #[serde(default = "one")]
    denominator: i64,
    #[serde(default)]
    round_up: bool,
}

fn one() -> i64 {
    1
}

impl TryFrom<ScaleDocument> for Scale {
    type Error = String;

    fn try_from(document: ScaleDocument) -> Result<Self, Self::Error> {
        if document.denominator == 0 {
            return Err("scale denominator must not be zero".to_owned());
        }
        Ok(Self {
            numerator: document.numerator,
            denominator: document.denominator,
            round_up: document.round_up,
        })
    }
}

impl Scale {
    /// One half, rounded down.
    pub const HALF: Self = Self {
        numerator: 1,
        denominator: 2,
        round_up: false,
    };

    /// Applies the scale to `value`.
    #[must_use]
    pub fn apply(&self, value: i64) -> i64 {
        let scaled = value * self.numerator;
        if self.round_up {
            -((-scaled).div_euclid(self.denominator))
        } else {
            scaled.div_euclid(self.denominator)
        }
    }
}

/// Content-facing pool entry, e.g.
/// `{type: fire, dice: [{count: 2, size: 6}], bonus: 3}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolDescriptor {
    /// Damage type; absent for untyped pools such as healing.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Dice groups.
    #[serde(default)]
    pub dice: Vec<DiceDescriptor>,
    /// Flat bonus.
    #[serde(default)]
    pub bonus: i64,
    /// Optional scale applied at delivery.
    #[serde(default)]
    pub scale: Option<Scale>,
}

impl PoolDescriptor {
    /// A typed entry with dice and no bonus.
    #[must_use]
    pub fn typed(kind: &str, dice: Vec<DiceDescriptor>) -> Self {
        Self {
            kind: Some(kind.to_owned()),
            dice,
            ..Self::default()
        }
    }

    /// Adds a flat bonus (builder pattern).
    #[must_use]
    pub fn with_bonus(mut self, bonus: i64) -> Self {
        self.bonus = bonus;
        self
    }
}

/// One typed entry of a pool, generic over rolled and unrolled dice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypedEntry<D> {
    /// Damage type, `None` for untyped pools.
    pub kind: Option<String>,
    /// The dice.
    pub dice: Vec<D>,
    /// Flat bonus.
    pub bonus: i64,
    /// Scale applied when the entry is reduced to a number.
    pub scale: Option<Scale>,
}

impl<D> TypedEntry<D> {
    /// True if `filter` selects this entry. `None` and `""` are wildcards.
    #[must_use]
    pub fn matches(&self, filter: Option<&str>) -> bool {
        match filter {
            None | Some("") => true,
            Some(kind) => self.kind.as_deref() == Some(kind),
        }
    }
}

/// An unrolled pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypedCollection {
    entries: Vec<TypedEntry<Die>>,
}

impl TypedCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from content descriptors.
    #[must_use]
    pub fn from_descriptors(descriptors: &[PoolDescriptor]) -> Self {
        let mut collection = Self::new();
        for descriptor in descriptors {
            collection.add_descriptor(descriptor);
        }
        collection
    }

    /// Adds one content descriptor.
    pub fn add_descriptor(&mut self, descriptor: &PoolDescriptor) {
        self.add(TypedEntry {
            kind: descriptor.kind.clone(),
            dice: descriptor.dice.iter().flat_map(DiceDescriptor::expand).collect(),
            bonus: descriptor.bonus,
            scale: descriptor.scale,
        });
    }

    /// Adds an entry, merging into an existing entry of the same type. The
    /// existing entry keeps its scale unless it had none.
    pub fn add(&mut self, entry: TypedEntry<Die>) {
        match self.entries.iter_mut().find(|e| e.kind == entry.kind) {
            Some(existing) => {
                existing.dice.extend(entry.dice);
                existing.bonus += entry.bonus;
                existing.scale = existing.scale.or(entry.scale);
            }
            None => self.entries.push(entry),
        }
    }

    /// Merges every entry of `other` into this collection.
    pub fn merge(&mut self, other: &TypedCollection) {
        for entry in &other.entries {
            self.add(entry.clone());
        }
    }

    /// Adds a flat bonus to the first entry, creating an untyped entry if the
    /// collection is empty.
    pub fn add_bonus_to_first(&mut self, bonus: i64) {
        match self.entries.first_mut() {
            Some(entry) => entry.bonus += bonus,
            None => self.entries.push(TypedEntry {
                kind: None,
                dice: Vec::new(),
                bonus,
                scale: None,
            }),
        }
    }

    /// Doubles the dice of every entry. Bonuses are untouched.
    pub fn double_dice(&mut self) {
        for entry in &mut self.entries {
            let copies = entry.dice.clone();
            entry.dice.extend(copies);
        }
    }

    /// The entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[TypedEntry<Die>] {
        &self.entries
    }

    /// True when the collection holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rolls every die.
    pub fn roll(&self, rng: &mut dyn DeterministicRng) -> TypedRoll {
        TypedRoll {
            entries: self
                .entries
                .iter()
                .map(|entry| TypedEntry {
                    kind: entry.kind.clone(),
                    dice: entry.dice.iter().map(|d| d.roll(rng)).collect(),
                    bonus: entry.bonus,
                    scale: entry.scale,
                })
                .collect(),
        }
    }
}

/// A rolled pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypedRoll {
    entries: Vec<TypedEntry<RolledDie>>,
}

impl TypedRoll {
    /// The entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[TypedEntry<RolledDie>] {
        &self.entries
    }

    /// Rerolls matching dice of matching entries.
    pub fn reroll_if(
        &mut self,
        filter: Option<&str>,
        predicate: impl Fn(u32) -> bool,
        rng: &mut dyn DeterministicRng,
    ) {
        for entry in self.entries.iter_mut().filter(|e| e.matches(filter)) {
            dice::reroll_if(&mut entry.dice, &predicate, rng);
        }
    }

    /// Overwrites matching dice of matching entries.
    pub fn set_if(&mut self, filter: Option<&str>, predicate: impl Fn(u32) -> bool, value: u32) {
        for entry in self.entries.iter_mut().filter(|e| e.matches(filter)) {
            dice::set_if(&mut entry.dice, &predicate, value);
        }
    }

    /// Maximizes the dice of matching entries.
    pub fn maximize(&mut self, filter: Option<&str>) {
        for entry in self.entries.iter_mut().filter(|e| e.matches(filter)) {
            dice::maximize(&mut entry.dice);
        }
    }

    /// One total per entry: dice plus bonus, scaled, never below zero.
    #[must_use]
    pub fn totals(&self) -> Vec<(Option<String>, i64)> {
        self.entries
            .iter()
            .map(|entry| {
                let raw = dice::sum(&entry.dice) + entry.bonus;
                let scaled = entry.scale.map_or(raw, |scale| scale.apply(raw));
                (entry.kind.clone(), scaled.max(0))
            })
            .collect()
    }

    /// Sum of every entry total.
    #[must_use]
    pub fn total(&self) -> i64 {
        self.totals().iter().map(|(_, amount)| amount).sum()
    }
}

/// Portion of rolled damage that is delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageProportion {
    /// Everything.
    #[default]
    All,
    /// Half, rounded down.
    Half,
    /// Nothing.
    None,
}

impl DamageProportion {
    /// Applies the proportion to one amount.
    #[must_use]
    pub fn apply(self, amount: i64) -> i64 {
        match self {
            Self::All => amount,
            Self::Half => Scale::HALF.apply(amount),
            Self::None => 0,
        }
    }
}

/// Converts delivered damage into healing for the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vampirism {
    /// Damage type that feeds the healing; `None` or `""` means all types.
    #[serde(rename = "type", default)]
    pub damage_type: Option<String>,
    /// Fraction of the damage returned as healing.
    #[serde(default = "half")]
    pub scale: Scale,
}

fn half() -> Scale {
    Scale::HALF
}

impl Vampirism {
    /// Healing produced by a set of per-type delivered amounts.
    #[must_use]
    pub fn healing_from(&self, delivered: &[(Option<String>, i64)]) -> i64 {
        let filter = self.damage_type.as_deref();
        let fed: i64 = delivered
            .iter()
            .filter(|(kind, _)| match filter {
                None | Some("") => true,
                Some(wanted) => kind.as_deref() == Some(wanted),
            })
            .map(|(_, amount)| amount)
            .sum();
        self.scale.apply(fed)
    }
}
