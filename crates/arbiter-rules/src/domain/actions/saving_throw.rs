//! Saving throws.

use arbiter_core::error::RulesError;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::calculations::{ability_modifier, difficulty_class, subject_bonus};
use super::damage::{collect_damage, deliver_damage};
use super::{
    Action, ActionHeader, ActionKind, ActionSpec, BASE_DAMAGE_TAG, Binding, Cancelable,
    HasAbility, TARGET_DAMAGE_TAG, YieldsValue, run_branch,
};
use crate::domain::calculation::Calculation;
use crate::domain::context::Context;
use crate::domain::events::{ResolutionEventKind, SavingThrowResolved};
use crate::domain::objects::Ability;
use crate::domain::pool::{DamageProportion, PoolDescriptor, TypedCollection, Vampirism};
use crate::domain::roll::Roll;

fn half() -> DamageProportion {
    DamageProportion::Half
}

/// Content payload of a `saving_throw`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavingThrowRequest {
    /// Ability the target saves with.
    pub ability: Ability,
    /// Explicit dc; derived from the source when absent.
    #[serde(default)]
    pub dc: Option<i64>,
    /// Source ability the default dc is derived from.
    #[serde(default)]
    pub dc_ability: Option<Ability>,
    /// Damage dealt to the target.
    #[serde(default)]
    pub damage: Vec<PoolDescriptor>,
    /// Portion of damage on a failed save.
    #[serde(default)]
    pub damage_on_fail: DamageProportion,
    /// Portion of damage on a successful save.
    #[serde(default = "half")]
    pub damage_on_pass: DamageProportion,
    /// Heals the source from the damage dealt.
    #[serde(default)]
    pub vampirism: Option<Vampirism>,
    /// Determined d20 results for the target's roll.
    #[serde(default)]
    pub determined: Vec<u32>,
    /// Resolved when the target saves.
    #[serde(default)]
    pub pass: Vec<ActionSpec>,
    /// Resolved when the target fails.
    #[serde(default)]
    pub fail: Vec<ActionSpec>,
}

/// The target rolls against a dc set by the source.
///
/// The d20 belongs to the saving throw itself, so modifiers filtered on
/// `saving_throw` adjust the target's roll. The target's ability modifier
/// and save proficiency join it once the target is bound.
#[derive(Debug, Clone)]
pub struct SavingThrow {
    header: ActionHeader,
    request: SavingThrowRequest,
    roll: Roll,
    canceled: bool,
    dc: Option<i64>,
    base_damage: TypedCollection,
    vampirism: Option<Vampirism>,
    passed: Option<bool>,
}

impl SavingThrow {
    /// Creates a fresh saving throw.
    #[must_use]
    pub fn new(request: SavingThrowRequest) -> Self {
        Self::with_header(ActionHeader::new(ActionKind::SavingThrow), request)
    }

    /// Creates a saving throw around an existing header.
    #[must_use]
    pub fn with_header(header: ActionHeader, request: SavingThrowRequest) -> Self {
        let roll = Roll::new(request.determined.iter().copied());
        let vampirism = request.vampirism.clone();
        Self {
            header,
            request,
            roll,
            canceled: false,
            dc: None,
            base_damage: TypedCollection::new(),
            vampirism,
            passed: None,
        }
    }

    /// The target's roll.
    #[must_use]
    pub fn roll(&self) -> &Roll {
        &self.roll
    }

    /// The dc, once prepared.
    #[must_use]
    pub fn dc(&self) -> Option<i64> {
        self.dc
    }

    /// True if the target saved, once resolved.
    #[must_use]
    pub fn passed(&self) -> Option<bool> {
        self.passed
    }
}

impl Action for SavingThrow {
    header_accessors!(ActionKind::SavingThrow);

    fn on_prepare(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        self.header.add_tag(ActionKind::SavingThrow.key());
        let dc = difficulty_class(
            ctx,
            &self.header,
            self.header.source,
            None,
            self.request.dc,
            self.request.dc_ability,
        )?;
        self.dc = Some(dc);
        self.base_damage = collect_damage(
            ctx,
            &Binding::inherit(&self.header),
            TypedCollection::from_descriptors(&self.request.damage),
            BASE_DAMAGE_TAG,
        )?;
        Ok(())
    }

    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        if self.canceled {
            ctx.record_canceled(&self.header);
            return Ok(());
        }
        let target = self.header.target()?;
        let dc = self.dc.ok_or(RulesError::MissingBase)?;

        let ability = self.request.ability;
        let modifier = ability_modifier(ctx, &self.header, target, ability)?;
        let subject = ability.save_subject();
        let proficiency = subject_bonus(ctx, &self.header, target, Some(&subject))?;
        self.roll.calculation_mut().add_bonus(modifier + proficiency);

        let natural = self.roll.roll(ctx.rng());
        let total = self.roll.get()?;
        let passed = total >= dc;
        self.passed = Some(passed);

        info!(%target, natural, total, dc, passed, "saving throw resolved");
        ctx.record(ResolutionEventKind::SavingThrowResolved(SavingThrowResolved {
            source: self.header.source,
            target,
            ability,
            dc,
            natural,
            total,
            passed,
        }));

        let proportion = if passed {
            self.request.damage_on_pass
        } else {
            self.request.damage_on_fail
        };
        if proportion != DamageProportion::None {
            let mut damage = self.base_damage.clone();
            damage.merge(&collect_damage(
                ctx,
                &Binding::inherit(&self.header),
                TypedCollection::new(),
                TARGET_DAMAGE_TAG,
            )?);
            if !damage.is_empty() {
                deliver_damage(ctx, &self.header, damage, proportion, self.vampirism.clone())?;
            }
        }

        if passed {
            run_branch(ctx, &self.header, &self.request.pass)
        } else {
            run_branch(ctx, &self.header, &self.request.fail)
        }
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

impl HasAbility for SavingThrow {
    fn ability(&self) -> Ability {
        self.request.ability
    }
}

impl Cancelable for SavingThrow {
    fn is_canceled(&self) -> bool {
        self.canceled
    }

    fn cancel(&mut self) {
        self.canceled = true;
    }
}

impl YieldsValue for SavingThrow {
    fn value(&self) -> Result<i64, RulesError> {
        self.roll.get()
    }
}
