//! Ability checks and contests.

use std::cmp::Ordering;

use arbiter_core::error::RulesError;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::calculations::{ability_modifier, difficulty_class, subject_bonus};
use super::{
    Action, ActionHeader, ActionKind, ActionSpec, Binding, Cancelable, HasAbility, YieldsValue,
    resolve_nested, run_branch,
};
use crate::domain::calculation::Calculation;
use crate::domain::context::Context;
use crate::domain::events::{CheckResolved, ContestResolved, ResolutionEventKind};
use crate::domain::objects::Ability;
use crate::domain::roll::Roll;

/// Content payload of an `ability_check`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityCheckRequest {
    /// Ability rolled.
    pub ability: Ability,
    /// Proficiency subject, e.g. `athletics`.
    #[serde(default)]
    pub proficiency: Option<String>,
    /// Difficulty class to meet; without one the check only records a total.
    #[serde(default)]
    pub dc: Option<i64>,
    /// Determined d20 results.
    #[serde(default)]
    pub determined: Vec<u32>,
    /// Resolved when the total meets the dc.
    #[serde(default)]
    pub pass: Vec<ActionSpec>,
    /// Resolved when the total falls short of the dc.
    #[serde(default)]
    pub fail: Vec<ActionSpec>,
}

impl AbilityCheckRequest {
    /// A bare check with no dc and no branches.
    #[must_use]
    pub fn new(ability: Ability) -> Self {
        Self {
            ability,
            proficiency: None,
            dc: None,
            determined: Vec::new(),
            pass: Vec::new(),
            fail: Vec::new(),
        }
    }
}

/// A d20 roll plus the source's ability modifier and proficiency.
#[derive(Debug, Clone)]
pub struct AbilityCheck {
    header: ActionHeader,
    request: AbilityCheckRequest,
    roll: Roll,
    passed: Option<bool>,
}

impl AbilityCheck {
    /// Creates a fresh check.
    #[must_use]
    pub fn new(request: AbilityCheckRequest) -> Self {
        Self::with_header(ActionHeader::new(ActionKind::AbilityCheck), request)
    }

    /// Creates a check around an existing header.
    #[must_use]
    pub fn with_header(header: ActionHeader, request: AbilityCheckRequest) -> Self {
        let roll = Roll::new(request.determined.iter().copied());
        Self {
            header,
            request,
            roll,
            passed: None,
        }
    }

    /// The roll.
    #[must_use]
    pub fn roll(&self) -> &Roll {
        &self.roll
    }

    /// Outcome against the dc, when one was given.
    #[must_use]
    pub fn passed(&self) -> Option<bool> {
        self.passed
    }
}

impl Action for AbilityCheck {
    header_accessors!(ActionKind::AbilityCheck);

    fn on_prepare(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        self.header.add_tag(ActionKind::AbilityCheck.key());
        let source = self.header.source()?;
        let modifier = ability_modifier(ctx, &self.header, source, self.request.ability)?;
        let proficiency =
            subject_bonus(ctx, &self.header, source, self.request.proficiency.as_deref())?;
        self.roll.calculation_mut().add_bonus(modifier + proficiency);
        Ok(())
    }

    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        let natural = self.roll.roll(ctx.rng());
        let total = self.roll.get()?;
        self.passed = self.request.dc.map(|dc| total >= dc);
        info!(
            ability = self.request.ability.key(),
            natural,
            total,
            passed = ?self.passed,
            "check resolved"
        );

        ctx.record(ResolutionEventKind::CheckResolved(CheckResolved {
            source: self.header.source,
            ability: self.request.ability,
            natural,
            total,
            dc: self.request.dc,
            passed: self.passed,
        }));

        match self.passed {
            Some(true) => run_branch(ctx, &self.header, &self.request.pass),
            Some(false) => run_branch(ctx, &self.header, &self.request.fail),
            None => Ok(()),
        }
    }

    fn calculation_mut(&mut self) -> Option<&mut Calculation> {
        Some(self.roll.calculation_mut())
    }

    fn roll_mut(&mut self) -> Option<&mut Roll> {
        Some(&mut self.roll)
    }

    fn as_has_ability(&self) -> Option<&dyn HasAbility> {
        Some(self)
    }
}

impl HasAbility for AbilityCheck {
    fn ability(&self) -> Ability {
        self.request.ability
    }
}

impl YieldsValue for AbilityCheck {
    fn value(&self) -> Result<i64, RulesError> {
        self.roll.get()
    }
}

/// Which side of a contest won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestWinner {
    /// The acting side.
    Source,
    /// The opposing side.
    Target,
}

/// Decides a contest. Ties go to the acting side, except against a saving
/// throw dc, which must be exceeded: there a tie goes to the dc.
#[must_use]
pub fn decide(source_total: i64, opposition_total: i64, opposition_is_save_dc: bool) -> ContestWinner {
    match source_total.cmp(&opposition_total) {
        Ordering::Greater => ContestWinner::Source,
        Ordering::Less => ContestWinner::Target,
        Ordering::Equal if opposition_is_save_dc => ContestWinner::Target,
        Ordering::Equal => ContestWinner::Source,
    }
}

/// One side's check in a contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestSide {
    /// Ability rolled.
    pub ability: Ability,
    /// Proficiency subject.
    #[serde(default)]
    pub proficiency: Option<String>,
    /// Determined d20 results.
    #[serde(default)]
    pub determined: Vec<u32>,
}

impl ContestSide {
    /// A side rolling `ability` with no proficiency.
    #[must_use]
    pub fn new(ability: Ability) -> Self {
        Self {
            ability,
            proficiency: None,
            determined: Vec::new(),
        }
    }

    /// Pins the d20 results (builder pattern).
    #[must_use]
    pub fn determined(mut self, determined: Vec<u32>) -> Self {
        self.determined = determined;
        self
    }

    fn check(&self) -> AbilityCheck {
        AbilityCheck::new(AbilityCheckRequest {
            ability: self.ability,
            proficiency: self.proficiency.clone(),
            dc: None,
            determined: self.determined.clone(),
            pass: Vec::new(),
            fail: Vec::new(),
        })
    }
}

/// What the acting side is measured against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Opposition {
    /// The target rolls its own check.
    Check(ContestSide),
    /// A fixed number.
    DifficultyClass {
        /// The number.
        dc: i64,
    },
    /// The target's saving throw dc. Ties go to the dc.
    SaveDifficultyClass {
        /// Explicit dc.
        #[serde(default)]
        dc: Option<i64>,
        /// Ability the target derives its dc from.
        #[serde(default)]
        ability: Option<Ability>,
    },
}

/// Content payload of a generic `contest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContestRequest {
    /// The acting side's check.
    pub source: ContestSide,
    /// What it is measured against.
    pub opposition: Opposition,
    /// Resolved when the source wins.
    #[serde(default)]
    pub source_wins: Vec<ActionSpec>,
    /// Resolved when the target wins.
    #[serde(default)]
    pub target_wins: Vec<ActionSpec>,
}

/// Content payload of an `ability_contest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityContestRequest {
    /// The acting side's check.
    pub source: ContestSide,
    /// The target's check.
    pub target: ContestSide,
    /// Resolved when the source wins.
    #[serde(default)]
    pub source_wins: Vec<ActionSpec>,
    /// Resolved when the target wins.
    #[serde(default)]
    pub target_wins: Vec<ActionSpec>,
}

/// Rolls one side's check, returning its total.
fn side_total(
    ctx: &mut Context,
    parent: &ActionHeader,
    side: &ContestSide,
    actor: Uuid,
    opponent: Option<Uuid>,
) -> Result<i64, RulesError> {
    let mut check = side.check();
    let binding = Binding::inherit(parent)
        .with_source(Some(actor))
        .with_target(opponent);
    resolve_nested(&mut check, &binding, ctx)?;
    check.value()
}

/// Shared contest resolution for both contest kinds.
fn resolve_contest(
    ctx: &mut Context,
    header: &ActionHeader,
    source_side: &ContestSide,
    opposition: &Opposition,
    source_wins: &[ActionSpec],
    target_wins: &[ActionSpec],
) -> Result<ContestWinner, RulesError> {
    let source = header.source()?;
    let source_total = side_total(ctx, header, source_side, source, header.target)?;

    let (opposition_total, is_save_dc) = match opposition {
        Opposition::Check(side) => {
            let target = header.target()?;
            (side_total(ctx, header, side, target, Some(source))?, false)
        }
        Opposition::DifficultyClass { dc } => (*dc, false),
        Opposition::SaveDifficultyClass { dc, ability } => {
            let owner = match dc {
                Some(_) => header.target,
                None => Some(header.target()?),
            };
            let value = difficulty_class(ctx, header, owner, Some(source), *dc, *ability)?;
            (value, true)
        }
    };

    let winner = decide(source_total, opposition_total, is_save_dc);
    info!(
        source_total,
        opposition_total,
        winner = ?winner,
        "contest resolved"
    );
    ctx.record(ResolutionEventKind::ContestResolved(ContestResolved {
        source: header.source,
        target: header.target,
        source_total,
        opposition_total,
        winner,
    }));

    match winner {
        ContestWinner::Source => run_branch(ctx, header, source_wins)?,
        ContestWinner::Target => run_branch(ctx, header, target_wins)?,
    }
    Ok(winner)
}

/// Source check against an opposition of any shape.
#[derive(Debug, Clone)]
pub struct Contest {
    header: ActionHeader,
    request: ContestRequest,
    canceled: bool,
    winner: Option<ContestWinner>,
}

impl Contest {
    /// Creates a fresh contest.
    #[must_use]
    pub fn new(request: ContestRequest) -> Self {
        Self::with_header(ActionHeader::new(ActionKind::Contest), request)
    }

    /// Creates a contest around an existing header.
    #[must_use]
    pub fn with_header(header: ActionHeader, request: ContestRequest) -> Self {
        Self {
            header,
            request,
            canceled: false,
            winner: None,
        }
    }

    /// The winner, once resolved.
    #[must_use]
    pub fn winner(&self) -> Option<ContestWinner> {
        self.winner
    }
}

impl Action for Contest {
    header_accessors!(ActionKind::Contest);

    fn on_prepare(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        self.header.add_tag(ActionKind::Contest.key());
        Ok(())
    }

    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        if self.canceled {
            ctx.record_canceled(&self.header);
            return Ok(());
        }
        self.winner = Some(resolve_contest(
            ctx,
            &self.header,
            &self.request.source,
            &self.request.opposition,
            &self.request.source_wins,
            &self.request.target_wins,
        )?);
        Ok(())
    }

    fn as_cancelable_mut(&mut self) -> Option<&mut dyn Cancelable> {
        Some(self)
    }
}

impl Cancelable for Contest {
    fn is_canceled(&self) -> bool {
        self.canceled
    }

    fn cancel(&mut self) {
        self.canceled = true;
    }
}

/// Source check against the target's check.
#[derive(Debug, Clone)]
pub struct AbilityContest {
    header: ActionHeader,
    request: AbilityContestRequest,
    canceled: bool,
    winner: Option<ContestWinner>,
}

impl AbilityContest {
    /// Creates a fresh contest.
    #[must_use]
    pub fn new(request: AbilityContestRequest) -> Self {
        Self::with_header(ActionHeader::new(ActionKind::AbilityContest), request)
    }

    /// Creates a contest around an existing header.
    #[must_use]
    pub fn with_header(header: ActionHeader, request: AbilityContestRequest) -> Self {
        Self {
            header,
            request,
            canceled: false,
            winner: None,
        }
    }

    /// The winner, once resolved.
    #[must_use]
    pub fn winner(&self) -> Option<ContestWinner> {
        self.winner
    }
}

impl Action for AbilityContest {
    header_accessors!(ActionKind::AbilityContest);

    fn on_prepare(&mut self, _ctx: &mut Context) -> Result<(), RulesError> {
        self.header.add_tag(ActionKind::AbilityContest.key());
        Ok(())
    }

    fn run(&mut self, ctx: &mut Context) -> Result<(), RulesError> {
        if self.canceled {
            ctx.record_canceled(&self.header);
            return Ok(());
        }
        let opposition = Opposition::Check(self.request.target.clone());
        self.winner = Some(resolve_contest(
            ctx,
            &self.header,
            &self.request.source,
            &opposition,
            &self.request.source_wins,
            &self.request.target_wins,
        )?);
        Ok(())
    }

    fn as_cancelable_mut(&mut self) -> Option<&mut dyn Cancelable> {
        Some(self)
    }

    fn as_has_ability(&self) -> Option<&dyn HasAbility> {
        Some(self)
    }
}

impl HasAbility for AbilityContest {
    fn ability(&self) -> Ability {
        self.request.source.ability
    }
}

impl Cancelable for AbilityContest {
    fn is_canceled(&self) -> bool {
        self.canceled
    }

    fn cancel(&mut self) {
        self.canceled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // --- tie-break ---

    #[test]
    fn test_tie_against_check_favors_source() {
        assert_eq!(decide(14, 14, false), ContestWinner::Source);
    }

    #[test]
    fn test_tie_against_save_dc_favors_target() {
        assert_eq!(decide(14, 14, true), ContestWinner::Target);
    }

    #[test]
    fn test_strict_results_ignore_opposition_shape() {
        for save_dc in [false, true] {
            assert_eq!(decide(15, 14, save_dc), ContestWinner::Source);
            assert_eq!(decide(13, 14, save_dc), ContestWinner::Target);
        }
    }

    // --- content ---

    #[test]
    fn test_opposition_parses_each_shape() {
        let check: Opposition =
            serde_json::from_str(r#"{"type": "check", "ability": "str", "proficiency": "athletics"}"#)
                .unwrap();
        assert!(matches!(check, Opposition::Check(side) if side.ability == Ability::Strength));

        let fixed: Opposition =
            serde_json::from_str(r#"{"type": "difficulty_class", "dc": 15}"#).unwrap();
        assert_eq!(fixed, Opposition::DifficultyClass { dc: 15 });

        let save: Opposition =
            serde_json::from_str(r#"{"type": "save_difficulty_class", "ability": "wis"}"#).unwrap();
        assert_eq!(
            save,
            Opposition::SaveDifficultyClass {
                dc: None,
                ability: Some(Ability::Wisdom),
            }
        );
    }
}
