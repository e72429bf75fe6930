//! Named operations modifiers run against an in-flight action.
//!
//! The operation table is closed: content names an operation with the
//! `function` key and the engine dispatches through an exhaustive match.
//! Applying an operation to an action that lacks the capability it needs is
//! an `OperationMismatch`.

use arbiter_core::error::RulesError;
use serde::{Deserialize, Serialize};

use super::actions::{Action, ActionSpec, Binding};
use super::context::Context;
use super::modifiers::{Modifier, ObjectRole};
use super::objects::{Ability, ProficiencyLevel};
use super::pool::{PoolDescriptor, Scale, Vampirism};

/// A number computed when the operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Formula {
    /// A literal.
    Flat(i64),
    /// A value derived from an object's statistics.
    Derived(DerivedValue),
}

/// Statistic-backed formula values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "formula", rename_all = "snake_case")]
pub enum DerivedValue {
    /// An ability modifier.
    AbilityModifier {
        /// The ability.
        ability: Ability,
        /// Whose ability.
        #[serde(default)]
        of: ObjectRole,
    },
    /// A proficiency bonus scaled by a level.
    ProficiencyBonus {
        /// Whose bonus.
        #[serde(default)]
        of: ObjectRole,
        /// Scale; full by default.
        #[serde(default = "full")]
        level: ProficiencyLevel,
    },
}

fn full() -> ProficiencyLevel {
    ProficiencyLevel::Full
}

impl Formula {
    /// Evaluates the formula.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::ObjectNotFound` if the referenced object is
    /// unbound or missing.
    pub fn evaluate<A: Action + ?Sized>(
        &self,
        modifier: &Modifier,
        action: &A,
        ctx: &Context,
    ) -> Result<i64, RulesError> {
        let derived = match self {
            Self::Flat(value) => return Ok(*value),
            Self::Derived(derived) => derived,
        };
        let role = match derived {
            DerivedValue::AbilityModifier { of, .. } | DerivedValue::ProficiencyBonus { of, .. } => {
                *of
            }
        };
        let id = role
            .resolve(modifier, action.header())
            .ok_or(RulesError::MissingBinding {
                kind: action.kind().key(),
                role: "formula object",
            })?;
        let actor = ctx.objects.actor(id)?;
        Ok(match derived {
            DerivedValue::AbilityModifier { ability, .. } => actor.ability_modifier(*ability),
            DerivedValue::ProficiencyBonus { level, .. } => {
                level.apply(actor.proficiency_bonus.value())
            }
        })
    }
}

/// Predicate over rolled die faces: `roll <= at_most`.
fn at_most(limit: u32) -> impl Fn(u32) -> bool {
    move |roll| roll <= limit
}

fn half() -> Scale {
    Scale::HALF
}

/// One named operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "snake_case")]
pub enum Operation {
    /// Adds to a calculation's bonus.
    AddBonus {
        /// Amount.
        value: Formula,
    },
    /// Raises a calculation's override.
    SetValue {
        /// Override.
        value: Formula,
    },
    /// Raises a calculation's floor.
    SetMinimum {
        /// Floor.
        value: Formula,
    },
    /// One advantage grant.
    GrantAdvantage,
    /// One disadvantage grant.
    GrantDisadvantage,
    /// Cancels a cancelable action.
    CancelAction,
    /// Appends a tag.
    AddTag {
        /// The tag.
        tag: String,
    },
    /// Adds entries to a damage collection.
    AddDamage {
        /// Entries.
        damage: Vec<PoolDescriptor>,
    },
    /// Adds entries to a healing collection.
    AddHealing {
        /// Entries.
        healing: Vec<PoolDescriptor>,
    },
    /// Adds entries to a temporary hit point collection.
    AddTemporaryHitPoints {
        /// Entries.
        temporary_hit_points: Vec<PoolDescriptor>,
    },
    /// Maximizes damage dice.
    MaximizeDamage {
        /// Type filter; wildcard when absent or empty.
        #[serde(rename = "type", default)]
        damage_type: Option<String>,
    },
    /// Maximizes healing dice.
    MaximizeHealing,
    /// Maximizes temporary hit point dice.
    MaximizeTemporaryHitPoints,
    /// Rerolls damage dice showing `at_most` or less.
    RerollDamageDice {
        /// Type filter.
        #[serde(rename = "type", default)]
        damage_type: Option<String>,
        /// Highest face that is rerolled.
        at_most: u32,
    },
    /// Overwrites damage dice showing `at_most` or less with `value`.
    SetDamageDice {
        /// Type filter.
        #[serde(rename = "type", default)]
        damage_type: Option<String>,
        /// Highest face that is overwritten.
        at_most: u32,
        /// New face.
        value: u32,
    },
    /// Reduces a damage type to zero.
    GrantImmunity {
        /// Damage type.
        #[serde(rename = "type")]
        damage_type: String,
    },
    /// Halves a damage type.
    GrantResistance {
        /// Damage type.
        #[serde(rename = "type")]
        damage_type: String,
    },
    /// Doubles a damage type.
    GrantVulnerability {
        /// Damage type.
        #[serde(rename = "type")]
        damage_type: String,
    },
    /// Raises the proficiency level used by a proficiency query.
    GrantProficiency {
        /// New level; lower levels are ignored.
        level: ProficiencyLevel,
    },
    /// Turns delivered damage into healing for the source.
    ApplyVampirism {
        /// Damage type feeding the healing; wildcard when absent.
        #[serde(rename = "type", default)]
        damage_type: Option<String>,
        /// Fraction returned.
        #[serde(default = "half")]
        scale: Scale,
    },
    /// Resolves a nested action.
    InvokeAction {
        /// The action.
        action: ActionSpec,
        /// Who acts.
        #[serde(default = "action_source")]
        source: ObjectRole,
        /// Who is acted upon.
        #[serde(default = "action_target")]
        target: ObjectRole,
    },
}

fn action_source() -> ObjectRole {
    ObjectRole::ActionSource
}

fn action_target() -> ObjectRole {
    ObjectRole::ActionTarget
}

impl Operation {
    /// The operation's content key.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::AddBonus { .. } => "add_bonus",
            Self::SetValue { .. } => "set_value",
            Self::SetMinimum { .. } => "set_minimum",
            Self::GrantAdvantage => "grant_advantage",
            Self::GrantDisadvantage => "grant_disadvantage",
            Self::CancelAction => "cancel_action",
            Self::AddTag { .. } => "add_tag",
            Self::AddDamage { .. } => "add_damage",
            Self::AddHealing { .. } => "add_healing",
            Self::AddTemporaryHitPoints { .. } => "add_temporary_hit_points",
            Self::MaximizeDamage { .. } => "maximize_damage",
            Self::MaximizeHealing => "maximize_healing",
            Self::MaximizeTemporaryHitPoints => "maximize_temporary_hit_points",
            Self::RerollDamageDice { .. } => "reroll_damage_dice",
            Self::SetDamageDice { .. } => "set_damage_dice",
            Self::GrantImmunity { .. } => "grant_immunity",
            Self::GrantResistance { .. } => "grant_resistance",
            Self::GrantVulnerability { .. } => "grant_vulnerability",
            Self::GrantProficiency { .. } => "grant_proficiency",
            Self::ApplyVampirism { .. } => "apply_vampirism",
            Self::InvokeAction { .. } => "invoke_action",
        }
    }

    /// Applies the operation on behalf of `modifier`.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::OperationMismatch` if the action lacks the
    /// capability the operation needs, or any error raised by a nested
    /// action.
    pub fn apply<A: Action + ?Sized>(
        &self,
        modifier: &Modifier,
        action: &mut A,
        ctx: &mut Context,
    ) -> Result<(), RulesError> {
        let mismatch = RulesError::OperationMismatch {
            operation: self.key(),
            kind: action.kind().key(),
        };
        match self {
            Self::AddBonus { value } => {
                let amount = value.evaluate(modifier, action, ctx)?;
                action
                    .calculation_mut()
                    .ok_or(mismatch)?
                    .add_bonus(amount);
            }
            Self::SetValue { value } => {
                let amount = value.evaluate(modifier, action, ctx)?;
                action
                    .calculation_mut()
                    .ok_or(mismatch)?
                    .set(amount);
            }
            Self::SetMinimum { value } => {
                let amount = value.evaluate(modifier, action, ctx)?;
                action
                    .calculation_mut()
                    .ok_or(mismatch)?
                    .set_minimum(amount);
            }
            Self::GrantAdvantage => action
                .roll_mut()
                .ok_or(mismatch)?
                .grant_advantage(),
            Self::GrantDisadvantage => action
                .roll_mut()
                .ok_or(mismatch)?
                .grant_disadvantage(),
            Self::CancelAction => action
                .as_cancelable_mut()
                .ok_or(mismatch)?
                .cancel(),
            Self::AddTag { tag } => action.header_mut().tags.push(tag.clone()),
            Self::AddDamage { damage } => {
                let collection = action
                    .damage_collection_mut()
                    .ok_or(mismatch)?;
                for entry in damage {
                    collection.add_descriptor(entry);
                }
            }
            Self::AddHealing { healing } => {
                let collection = action
                    .healing_collection_mut()
                    .ok_or(mismatch)?;
                for entry in healing {
                    collection.add_descriptor(entry);
                }
            }
            Self::AddTemporaryHitPoints {
                temporary_hit_points,
            } => {
                let collection = action
                    .temporary_hit_point_collection_mut()
                    .ok_or(mismatch)?;
                for entry in temporary_hit_points {
                    collection.add_descriptor(entry);
                }
            }
            Self::MaximizeDamage { damage_type } => action
                .damage_roll_mut()
                .ok_or(mismatch)?
                .maximize(damage_type.as_deref()),
            Self::MaximizeHealing => action
                .healing_roll_mut()
                .ok_or(mismatch)?
                .maximize(None),
            Self::MaximizeTemporaryHitPoints => action
                .temporary_hit_point_roll_mut()
                .ok_or(mismatch)?
                .maximize(None),
            Self::RerollDamageDice {
                damage_type,
                at_most: limit,
            } => action
                .damage_roll_mut()
                .ok_or(mismatch)?
                .reroll_if(damage_type.as_deref(), at_most(*limit), ctx.rng()),
            Self::SetDamageDice {
                damage_type,
                at_most: limit,
                value,
            } => action
                .damage_roll_mut()
                .ok_or(mismatch)?
                .set_if(damage_type.as_deref(), at_most(*limit), *value),
            Self::GrantImmunity { damage_type } => action
                .affinity_mut()
                .ok_or(mismatch)?
                .immunities
                .push(damage_type.clone()),
            Self::GrantResistance { damage_type } => action
                .affinity_mut()
                .ok_or(mismatch)?
                .resistances
                .push(damage_type.clone()),
            Self::GrantVulnerability { damage_type } => action
                .affinity_mut()
                .ok_or(mismatch)?
                .vulnerabilities
                .push(damage_type.clone()),
            Self::GrantProficiency { level } => {
                let current = action
                    .proficiency_mut()
                    .ok_or(mismatch)?;
                *current = (*current).max(*level);
            }
            Self::ApplyVampirism { damage_type, scale } => {
                *action
                    .vampirism_mut()
                    .ok_or(mismatch)? = Some(Vampirism {
                    damage_type: damage_type.clone(),
                    scale: *scale,
                });
            }
            Self::InvokeAction {
                action: spec,
                source,
                target,
            } => {
                let header = action.header();
                let binding = Binding::inherit(header)
                    .with_source(source.resolve(modifier, header))
                    .with_target(target.resolve(modifier, header));
                ctx.invoke_spec(spec, &binding)?;
            }
        }
        Ok(())
    }
}
