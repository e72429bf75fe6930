//! Attack rolls.

use arbiter_core::error::RulesError;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::calculations::{ability_modifier, armor_class, critical_hit_threshold, subject_bonus};
use super::damage::{collect_damage, critical_damage, deliver_damage};
use super::{
    Action, ActionHeader, ActionKind, ActionSpec, BASE_DAMAGE_TAG, Binding, Cancelable,
    HasAbility, TARGET_DAMAGE_TAG, YieldsValue, run_branch,
};
use crate::domain::calculation::Calculation;
use crate::domain::context::Context;
use crate::domain::events::{AttackResolved, ResolutionEventKind};
use crate::domain::objects::Ability;
use crate::domain::pool::{DamageProportion, PoolDescriptor, TypedCollection, Vampirism};
use crate::domain::roll::Roll;

/// Delivery and source of an attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    /// Weapon attack in reach.
    MeleeWeapon,
    /// Weapon attack at range.
    RangedWeapon,
    /// Spell attack in reach.
    MeleeSpell,
    /// Spell attack at range.
    RangedSpell,
}

impl AttackType {
    /// Tag added to the attack and inherited by its nested actions.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::MeleeWeapon => "melee_weapon",
            Self::RangedWeapon => "ranged_weapon",
            Self::MeleeSpell => "melee_spell",
            Self::RangedSpell => "ranged_spell",
        }
    }
}

/// Content payload of an `attack_roll`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRollRequest {
    /// Kind of attack.
    pub attack_type: AttackType,
    /// Ability added to the roll and to the first damage entry.
    pub attack_ability: Ability,
    /// Proficiency subject, e.g. `simple_weapons`.
    #[serde(default)]
    pub proficiency: Option<String>,
    /// Base damage.
    #[serde(default)]
    pub damage: Vec<PoolDescriptor>,
    /// Keeps the ability modifier out of the damage (off-hand attacks).
    #[serde(default)]
    pub withhold_damage_modifier: bool,
    /// Heals the attacker from the damage dealt.
    #[serde(default)]
    pub vampirism: Option<Vampirism>,
    /// Determined d20 results.
    #[serde(default)]
    pub determined: Vec<u32>,
    /// Resolved after damage on a hit.
    #[serde(default)]
    pub hit: Vec<ActionSpec>,
    /// Resolved on a miss.
    #[serde(default)]
    pub miss: Vec<ActionSpec>,
}

/// How an attack landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackOutcome {
    /// Total met the armor class.
    Hit,
    /// Natural roll met the critical hit threshold.
    CriticalHit,
    /// Natural 1 or total below the armor class.
    Miss,
}

impl AttackOutcome {
    /// True for both kinds of hit.
    #[must_use]
    pub fn is_hit(self) -> bool {
        !matches!(self, Self::Miss)
    }
}

/// A d20 roll against the target's armor class, dealing damage on a hit.
///
/// Base damage is assembled once during `prepare` and reused by every
/// per-target clone; target damage is collected again for each victim.
#[derive(Debug, Clone)]
pub struct AttackRoll {
    header: ActionHeader,
    request: AttackRollRequest,
    roll: Roll,
    canceled: bool,
    base_damage: TypedCollection,
    vampirism: Option<Vampirism>,
    outcome: Option<AttackOutcome>,
}

impl AttackRoll {
    /// Creates a fresh attack.
    #[must_use]
    pub fn new(request: AttackRollRequest) -> Self {
        Self::with_header(ActionHeader::new(ActionKind::AttackRoll), request)
    }

    /// Creates an attack around an existing header.
    #[must_use]
    pub fn with_header(header: ActionHeader, request: AttackRollRequest) -> Self {
        let roll = Roll::new(request.determined.iter().copied());
        let vampirism = request.vampirism.clone();
        Self {
            header,
            request,
            roll,
            canceled: false,
            base_damage: TypedCollection::new(),
            vampirism,
            outcome: None,
        }
    }

    /// The roll.
    #[must_use]
    pub fn roll(&self) -> &Roll {
        &self.roll
    }

    /// Base damage assembled during `prepare`.
    #[must_use]
    pub fn base_damage(&self) -> &TypedCollection {
        &self.base_damage
    }

    /// The outcome, once resolved.
    #[must_use]
    pub fn outcome(&self) -> Option<AttackOutcome> {
        self.outcome
    }
}

impl Action for AttackRoll {
    header_accessors!(ActionKind::AttackRoll);

    fn on_prepare(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        self.header.add_tag(ActionKind::AttackRoll.key());
        self.header.add_tag(self.request.attack_type.key());

        let source = self.header.source()?;
        let modifier = ability_modifier(ctx, &self.header, source, self.request.attack_ability)?;
        let proficiency =
            subject_bonus(ctx, &self.header, source, self.request.proficiency.as_deref())?;
        self.roll.calculation_mut().add_bonus(modifier + proficiency);

        let mut base = TypedCollection::from_descriptors(&self.request.damage);
        if !self.request.withhold_damage_modifier {
            base.add_bonus_to_first(modifier);
        }
        self.base_damage = collect_damage(ctx, &Binding::inherit(&self.header), base, BASE_DAMAGE_TAG)?;
        Ok(())
    }

    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        if self.canceled {
            ctx.record_canceled(&self.header);
            return Ok(());
        }
        let target = self.header.target()?;

        let natural = self.roll.roll(ctx.rng());
        let total = self.roll.get()?;
        let armor = armor_class(ctx, &self.header, target, self.header.source)?;
        let threshold = critical_hit_threshold(ctx, &self.header)?;

        let outcome = if i64::from(natural) >= threshold {
            AttackOutcome::CriticalHit
        } else if natural == 1 || total < armor {
            AttackOutcome::Miss
        } else {
            AttackOutcome::Hit
        };
        self.outcome = Some(outcome);

        info!(%target, natural, total, armor_class = armor, ?outcome, "attack resolved");
        ctx.record(ResolutionEventKind::AttackResolved(AttackResolved {
            source: self.header.source,
            target,
            natural,
            total,
            armor_class: armor,
            critical_hit_threshold: threshold,
            outcome,
        }));

        if !outcome.is_hit() {
            return run_branch(ctx, &self.header, &self.request.miss);
        }

        let mut damage = if outcome == AttackOutcome::CriticalHit {
            critical_damage(ctx, &self.header, self.base_damage.clone())?
        } else {
            self.base_damage.clone()
        };
        damage.merge(&collect_damage(
            ctx,
            &Binding::inherit(&self.header),
            TypedCollection::new(),
            TARGET_DAMAGE_TAG,
        )?);
        if !damage.is_empty() {
            deliver_damage(
                ctx,
                &self.header,
                damage,
                DamageProportion::All,
                self.vampirism.clone(),
            )?;
        }
        run_branch(ctx, &self.header, &self.request.hit)
    }

    fn calculation_mut(&mut self) -> Option<&mut Calculation> {
        Some(self.roll.calculation_mut())
    }

    fn roll_mut(&mut self) -> Option<&mut Roll> {
        Some(&mut self.roll)
    }

    fn as_cancelable_mut(&mut self) -> Option<&mut dyn Cancelable> {
        Some(self)
    }

    fn as_has_ability(&self) -> Option<&dyn HasAbility> {
        Some(self)
    }

    fn vampirism_mut(&mut self) -> Option<&mut Option<Vampirism>> {
        Some(&mut self.vampirism)
    }
}

impl HasAbility for AttackRoll {
    fn ability(&self) -> Ability {
        self.request.attack_ability
    }
}

impl Cancelable for AttackRoll {
    fn is_canceled(&self) -> bool {
        self.canceled
    }

    fn cancel(&mut self) {
        self.canceled = true;
    }
}

impl YieldsValue for AttackRoll {
    fn value(&self) -> Result<i64, RulesError> {
        self.roll.get()
    }
}
