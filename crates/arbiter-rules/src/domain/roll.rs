//! d20 rolls with advantage and disadvantage.

use std::collections::VecDeque;

use arbiter_core::error::RulesError;
use arbiter_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};

use super::calculation::Calculation;
use super::dice;

/// Faces on the die every roll draws.
pub const D20: u32 = 20;

/// How a roll draws its dice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvantageState {
    /// One die.
    Normal,
    /// Two dice, keep the higher.
    Advantage,
    /// Two dice, keep the lower.
    Disadvantage,
}

impl AdvantageState {
    /// Resolves grant counts. Advantage only applies with at least one grant
    /// and no disadvantage grants, and vice versa; any other mix is normal.
    #[must_use]
    pub fn from_grants(advantage: u32, disadvantage: u32) -> Self {
        match (advantage > 0, disadvantage > 0) {
            (true, false) => Self::Advantage,
            (false, true) => Self::Disadvantage,
            _ => Self::Normal,
        }
    }
}

/// A calculation whose base is a d20 draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roll {
    calculation: Calculation,
    advantage_grants: u32,
    disadvantage_grants: u32,
    determined: VecDeque<u32>,
    natural: Option<u32>,
}

impl Roll {
    /// Creates an unrolled d20 with a determined queue.
    #[must_use]
    pub fn new(determined: impl IntoIterator<Item = u32>) -> Self {
        Self {
            calculation: Calculation::new(),
            advantage_grants: 0,
            disadvantage_grants: 0,
            determined: determined.into_iter().collect(),
            natural: None,
        }
    }

    /// Records one advantage grant.
    pub fn grant_advantage(&mut self) {
        self.advantage_grants += 1;
    }

    /// Records one disadvantage grant.
    pub fn grant_disadvantage(&mut self) {
        self.disadvantage_grants += 1;
    }

    /// The resolved advantage state for the current grants.
    #[must_use]
    pub fn advantage_state(&self) -> AdvantageState {
        AdvantageState::from_grants(self.advantage_grants, self.disadvantage_grants)
    }

    /// True when the roll will keep the higher of two dice.
    #[must_use]
    pub fn has_advantage(&self) -> bool {
        self.advantage_state() == AdvantageState::Advantage
    }

    /// True when the roll will keep the lower of two dice.
    #[must_use]
    pub fn has_disadvantage(&self) -> bool {
        self.advantage_state() == AdvantageState::Disadvantage
    }

    /// Draws the d20 (twice under advantage or disadvantage) and establishes
    /// the kept die as the base. Returns the kept die.
    pub fn roll(&mut self, rng: &mut dyn DeterministicRng) -> u32 {
        let first = dice::roll(D20, &mut self.determined, rng);
        let kept = match self.advantage_state() {
            AdvantageState::Normal => first,
            AdvantageState::Advantage => first.max(dice::roll(D20, &mut self.determined, rng)),
            AdvantageState::Disadvantage => {
                first.min(dice::roll(D20, &mut self.determined, rng))
            }
        };
        self.natural = Some(kept);
        self.calculation.set_base(i64::from(kept));
        kept
    }

    /// The kept die, once rolled.
    #[must_use]
    pub fn natural(&self) -> Option<u32> {
        self.natural
    }

    /// The underlying calculation.
    #[must_use]
    pub fn calculation(&self) -> &Calculation {
        &self.calculation
    }

    /// Mutable access to the underlying calculation.
    pub fn calculation_mut(&mut self) -> &mut Calculation {
        &mut self.calculation
    }

    /// The total.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::MissingBase` if the die has not been rolled and
    /// no override was set.
    pub fn get(&self) -> Result<i64, RulesError> {
        self.calculation.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_test_support::SequenceRng;

    #[test]
    fn test_advantage_resolution_over_grant_counts() {
        for a in 0..4 {
            for d in 0..4 {
                let expected = if a > 0 && d == 0 {
                    AdvantageState::Advantage
                } else if d > 0 && a == 0 {
                    AdvantageState::Disadvantage
                } else {
                    AdvantageState::Normal
                };
                assert_eq!(AdvantageState::from_grants(a, d), expected, "a={a} d={d}");
            }
        }
    }

    #[test]
    fn test_normal_roll_draws_one_die() {
        let mut roll = Roll::new([15, 3]);
        assert_eq!(roll.roll(&mut SequenceRng::new(vec![])), 15);
        assert_eq!(roll.natural(), Some(15));
        assert_eq!(roll.get(), Ok(15));
    }

    #[test]
    fn test_advantage_keeps_higher_die() {
        let mut roll = Roll::new([6, 14]);
        roll.grant_advantage();
        assert!(roll.has_advantage());
        assert_eq!(roll.roll(&mut SequenceRng::new(vec![])), 14);
    }

    #[test]
    fn test_disadvantage_keeps_lower_die() {
        let mut roll = Roll::new([6, 14]);
        roll.grant_disadvantage();
        roll.grant_disadvantage();
        assert!(roll.has_disadvantage());
        assert_eq!(roll.roll(&mut SequenceRng::new(vec![])), 6);
    }

    #[test]
    fn test_mixed_grants_roll_a_single_die() {
        let mut roll = Roll::new([6]);
        roll.grant_advantage();
        roll.grant_disadvantage();
        let mut rng = SequenceRng::new(vec![]);
        assert_eq!(roll.roll(&mut rng), 6);
        assert_eq!(rng.drawn(), 0);
    }

    #[test]
    fn test_bonus_applies_on_top_of_natural() {
        let mut roll = Roll::new([11]);
        roll.calculation_mut().add_bonus(4);
        roll.roll(&mut SequenceRng::new(vec![]));
        assert_eq!(roll.get(), Ok(15));
        assert_eq!(roll.natural(), Some(11));
    }

    #[test]
    fn test_unrolled_roll_has_no_value() {
        let roll = Roll::new([]);
        assert_eq!(roll.get(), Err(RulesError::MissingBase));
    }
}
