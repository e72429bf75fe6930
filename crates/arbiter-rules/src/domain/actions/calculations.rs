//! Sub-query actions that compute one number for one actor.
//!
//! These are bound with source and target both set to the actor whose
//! statistic is computed, so modifiers carried by that actor see them.

use arbiter_core::error::RulesError;
use uuid::Uuid;

use super::{
    Action, ActionHeader, ActionKind, Binding, HasAbility, YieldsValue, resolve_nested,
};
use crate::domain::calculation::Calculation;
use crate::domain::context::Context;
use crate::domain::objects::{self, ARMOR_SLOT, Ability, ProficiencyLevel};

/// Raw ability score of the source.
#[derive(Debug, Clone)]
pub struct CalculateAbilityScore {
    header: ActionHeader,
    ability: Ability,
    calculation: Calculation,
}

impl CalculateAbilityScore {
    /// Creates the query.
    #[must_use]
    pub fn new(ability: Ability) -> Self {
        Self {
            header: ActionHeader::new(ActionKind::CalculateAbilityScore),
            ability,
            calculation: Calculation::new(),
        }
    }
}

impl Action for CalculateAbilityScore {
    header_accessors!(ActionKind::CalculateAbilityScore);

    fn on_prepare(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        let actor = ctx.objects.actor(self.header.source()?)?;
        self.calculation.set_base(actor.ability_score(self.ability));
        Ok(())
    }

    fn run(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        Ok(())
    }

    fn calculation_mut(&mut self) -> Option<&mut Calculation> {
        Some(&mut self.calculation)
    }

    fn as_has_ability(&self) -> Option<&dyn HasAbility> {
        Some(self)
    }
}

impl HasAbility for CalculateAbilityScore {
    fn ability(&self) -> Ability {
        self.ability
    }
}

impl YieldsValue for CalculateAbilityScore {
    fn value(&self) -> Result<i64, RulesError> {
        self.calculation.get()
    }
}

/// Proficiency bonus of the source.
#[derive(Debug, Clone)]
pub struct CalculateProficiencyBonus {
    header: ActionHeader,
    calculation: Calculation,
}

impl CalculateProficiencyBonus {
    /// Creates the query.
    #[must_use]
    pub fn new() -> Self {
        Self {
            header: ActionHeader::new(ActionKind::CalculateProficiencyBonus),
            calculation: Calculation::new(),
        }
    }
}

impl Default for CalculateProficiencyBonus {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for CalculateProficiencyBonus {
    header_accessors!(ActionKind::CalculateProficiencyBonus);

    fn on_prepare(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        let actor = ctx.objects.actor(self.header.source()?)?;
        self.calculation.set_base(actor.proficiency_bonus.value());
        Ok(())
    }

    fn run(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        Ok(())
    }

    fn calculation_mut(&mut self) -> Option<&mut Calculation> {
        Some(&mut self.calculation)
    }
}

impl YieldsValue for CalculateProficiencyBonus {
    fn value(&self) -> Result<i64, RulesError> {
        self.calculation.get()
    }
}

/// Proficiency level of the source in one subject.
#[derive(Debug, Clone)]
pub struct GetProficiency {
    header: ActionHeader,
    subject: Option<String>,
    level: ProficiencyLevel,
}

impl GetProficiency {
    /// Creates the query. No subject means no proficiency unless a modifier
    /// grants one.
    #[must_use]
    pub fn new(subject: Option<&str>) -> Self {
        Self {
            header: ActionHeader::new(ActionKind::GetProficiency),
            subject: subject.map(str::to_owned),
            level: ProficiencyLevel::None,
        }
    }

    /// The subject under query.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// The resolved level.
    #[must_use]
    pub fn level(&self) -> ProficiencyLevel {
        self.level
    }
}

impl Action for GetProficiency {
    header_accessors!(ActionKind::GetProficiency);

    fn on_prepare(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        if let Some(subject) = &self.subject {
            let actor = ctx.objects.actor(self.header.source()?)?;
            self.level = actor.proficiency_level(subject);
        }
        Ok(())
    }

    fn run(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        Ok(())
    }

    fn proficiency_mut(&mut self) -> Option<&mut ProficiencyLevel> {
        Some(&mut self.level)
    }
}

/// Difficulty class set by the source: explicit, or
/// `8 + proficiency bonus + ability modifier`.
#[derive(Debug, Clone)]
pub struct CalculateDifficultyClass {
    header: ActionHeader,
    explicit: Option<i64>,
    ability: Option<Ability>,
    calculation: Calculation,
}

impl CalculateDifficultyClass {
    /// Creates the query.
    #[must_use]
    pub fn new(explicit: Option<i64>, ability: Option<Ability>) -> Self {
        Self {
            header: ActionHeader::new(ActionKind::CalculateDifficultyClass),
            explicit,
            ability,
            calculation: Calculation::new(),
        }
    }
}

impl Action for CalculateDifficultyClass {
    header_accessors!(ActionKind::CalculateDifficultyClass);

    fn on_prepare(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        if let Some(dc) = self.explicit {
            self.calculation.set_base(dc);
            return Ok(());
        }
        let ability = self.ability.ok_or_else(|| RulesError::MalformedContent {
            kind: ActionKind::CalculateDifficultyClass.key().to_owned(),
            reason: "neither an explicit dc nor an ability to derive one".to_owned(),
        })?;
        let owner = self.header.source()?;
        let proficiency = proficiency_bonus(ctx, &self.header, owner)?;
        let modifier = ability_modifier(ctx, &self.header, owner, ability)?;
        self.calculation.set_base(8 + proficiency + modifier);
        Ok(())
    }

    fn run(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        Ok(())
    }

    fn calculation_mut(&mut self) -> Option<&mut Calculation> {
        Some(&mut self.calculation)
    }
}

impl YieldsValue for CalculateDifficultyClass {
    fn value(&self) -> Result<i64, RulesError> {
        self.calculation.get()
    }
}

/// Armor class of the source: worn armor base plus capped dexterity
/// modifier, or `10 + dexterity modifier` unarmored.
#[derive(Debug, Clone)]
pub struct CalculateArmorClass {
    header: ActionHeader,
    calculation: Calculation,
}

impl CalculateArmorClass {
    /// Creates the query.
    #[must_use]
    pub fn new() -> Self {
        Self {
            header: ActionHeader::new(ActionKind::CalculateArmorClass),
            calculation: Calculation::new(),
        }
    }
}

impl Default for CalculateArmorClass {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for CalculateArmorClass {
    header_accessors!(ActionKind::CalculateArmorClass);

    fn on_prepare(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        let wearer = self.header.source()?;
        let dexterity = ability_modifier(ctx, &self.header, wearer, Ability::Dexterity)?;
        let armor = match ctx.objects.actor(wearer)?.equipped.get(ARMOR_SLOT) {
            Some(item) => ctx.objects.item(*item)?.armor,
            None => None,
        };
        let base = match armor {
            Some(armor) => {
                armor.base + armor.dexterity_cap.map_or(dexterity, |cap| dexterity.min(cap))
            }
            None => 10 + dexterity,
        };
        self.calculation.set_base(base);
        Ok(())
    }

    fn run(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        Ok(())
    }

    fn calculation_mut(&mut self) -> Option<&mut Calculation> {
        Some(&mut self.calculation)
    }
}

impl YieldsValue for CalculateArmorClass {
    fn value(&self) -> Result<i64, RulesError> {
        self.calculation.get()
    }
}

/// Natural d20 result at or above which an attack is a critical hit.
#[derive(Debug, Clone)]
pub struct CalculateCriticalHitThreshold {
    header: ActionHeader,
    calculation: Calculation,
}

impl CalculateCriticalHitThreshold {
    /// Creates the query.
    #[must_use]
    pub fn new() -> Self {
        Self {
            header: ActionHeader::new(ActionKind::CalculateCriticalHitThreshold),
            calculation: Calculation::new(),
        }
    }
}

impl Default for CalculateCriticalHitThreshold {
    fn default() -> Self {
        Self::new()
    }
}

impl Action for CalculateCriticalHitThreshold {
    header_accessors!(ActionKind::CalculateCriticalHitThreshold);

    fn on_prepare(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        self.calculation
            .set_base(ctx.config().critical_hit_threshold);
        Ok(())
    }

    fn run(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        Ok(())
    }

    fn calculation_mut(&mut self) -> Option<&mut Calculation> {
        Some(&mut self.calculation)
    }
}

impl YieldsValue for CalculateCriticalHitThreshold {
    fn value(&self) -> Result<i64, RulesError> {
        self.calculation.get()
    }
}

fn about(parent: &ActionHeader, actor: Uuid) -> Binding {
    Binding::inherit(parent)
        .with_source(Some(actor))
        .with_target(Some(actor))
}

/// Ability modifier of `actor`, resolved through a nested score query.
pub(crate) fn ability_modifier(
    ctx: &mut Context,
    parent: &ActionHeader,
    actor: Uuid,
    ability: Ability,
) -> Result<i64, RulesError> {
    let mut query = CalculateAbilityScore::new(ability);
    resolve_nested(&mut query, &about(parent, actor), ctx)?;
    Ok(objects::ability_modifier(query.value()?))
}

/// Proficiency bonus of `actor`, resolved through a nested query.
pub(crate) fn proficiency_bonus(
    ctx: &mut Context,
    parent: &ActionHeader,
    actor: Uuid,
) -> Result<i64, RulesError> {
    let mut query = CalculateProficiencyBonus::new();
    resolve_nested(&mut query, &about(parent, actor), ctx)?;
    query.value()
}

/// Proficiency bonus `actor` adds for `subject`, scaled by the resolved
/// proficiency level.
pub(crate) fn subject_bonus(
    ctx: &mut Context,
    parent: &ActionHeader,
    actor: Uuid,
    subject: Option<&str>,
) -> Result<i64, RulesError> {
    let mut query = GetProficiency::new(subject);
    resolve_nested(&mut query, &about(parent, actor), ctx)?;
    match query.level() {
        ProficiencyLevel::None => Ok(0),
        level => Ok(level.apply(proficiency_bonus(ctx, parent, actor)?)),
    }
}

/// Armor class of `defender` against `attacker`.
pub(crate) fn armor_class(
    ctx: &mut Context,
    parent: &ActionHeader,
    defender: Uuid,
    attacker: Option<Uuid>,
) -> Result<i64, RulesError> {
    let mut query = CalculateArmorClass::new();
    let binding = Binding::inherit(parent)
        .with_source(Some(defender))
        .with_target(attacker);
    resolve_nested(&mut query, &binding, ctx)?;
    query.value()
}

/// Critical hit threshold for the attack described by `parent`.
pub(crate) fn critical_hit_threshold(
    ctx: &mut Context,
    parent: &ActionHeader,
) -> Result<i64, RulesError> {
    let mut query = CalculateCriticalHitThreshold::new();
    resolve_nested(&mut query, &Binding::inherit(parent), ctx)?;
    query.value()
}

/// Difficulty class owned by `owner`.
pub(crate) fn difficulty_class(
    ctx: &mut Context,
    parent: &ActionHeader,
    owner: Option<Uuid>,
    against: Option<Uuid>,
    explicit: Option<i64>,
    ability: Option<Ability>,
) -> Result<i64, RulesError> {
    let mut query = CalculateDifficultyClass::new(explicit, ability);
    let binding = Binding::inherit(parent)
        .with_source(owner)
        .with_target(against);
    resolve_nested(&mut query, &binding, ctx)?;
    query.value()
}
