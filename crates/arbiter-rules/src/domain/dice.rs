//! Dice engine.
//!
//! Every die carries its own determined queue. While that queue is non-empty
//! a roll pops its head instead of drawing from the RNG, so call sites stay
//! reproducible without any global seed.

use std::collections::VecDeque;

use arbiter_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};

/// Rolls one `size`-sided die, consuming `determined` first.
///
/// A zero-sided die always rolls 0.
pub fn roll(size: u32, determined: &mut VecDeque<u32>, rng: &mut dyn DeterministicRng) -> u32 {
    if let Some(value) = determined.pop_front() {
        return value;
    }
    if size == 0 {
        return 0;
    }
    rng.next_u32_range(1, size)
}

/// An unrolled die.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Die {
    /// Number of faces.
    pub size: u32,
    /// Pre-chosen results, consumed front to back.
    pub determined: VecDeque<u32>,
}

impl Die {
    /// Creates a die with no determined results.
    #[must_use]
    pub fn new(size: u32) -> Self {
        Self {
            size,
            determined: VecDeque::new(),
        }
    }

    /// Creates a die that will produce `determined` before drawing randomly.
    #[must_use]
    pub fn determined(size: u32, determined: impl IntoIterator<Item = u32>) -> Self {
        Self {
            size,
            determined: determined.into_iter().collect(),
        }
    }

    /// Rolls this die. The remaining queue travels with the result so a later
    /// reroll keeps consuming it.
    pub fn roll(&self, rng: &mut dyn DeterministicRng) -> RolledDie {
        let mut determined = self.determined.clone();
        let value = roll(self.size, &mut determined, rng);
        RolledDie {
            size: self.size,
            roll: value,
            determined,
        }
    }
}

/// A die with a face value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolledDie {
    /// Number of faces.
    pub size: u32,
    /// The face value.
    pub roll: u32,
    /// Determined results not yet consumed.
    pub determined: VecDeque<u32>,
}

/// Replaces the roll of every die matching `predicate` with a new draw.
pub fn reroll_if(
    dice: &mut [RolledDie],
    predicate: impl Fn(u32) -> bool,
    rng: &mut dyn DeterministicRng,
) {
    for die in dice.iter_mut().filter(|d| predicate(d.roll)) {
        die.roll = roll(die.size, &mut die.determined, rng);
    }
}

/// Overwrites the roll of every die matching `predicate`. No new draw.
pub fn set_if(dice: &mut [RolledDie], predicate: impl Fn(u32) -> bool, value: u32) {
    for die in dice.iter_mut().filter(|d| predicate(d.roll)) {
        die.roll = value;
    }
}

/// Sets every die to its maximum face.
pub fn maximize(dice: &mut [RolledDie]) {
    for die in dice.iter_mut() {
        die.roll = die.size;
    }
}

/// Sums the face values. An empty slice sums to 0.
#[must_use]
pub fn sum(dice: &[RolledDie]) -> i64 {
    dice.iter().map(|d| i64::from(d.roll)).sum()
}

/// Content-facing dice group, e.g. `{count: 2, size: 6, determined: [3, 4]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceDescriptor {
    /// How many dice.
    #[serde(default = "default_count")]
    pub count: u32,
    /// Faces per die.
    pub size: u32,
    /// Results handed out across the group: die `i` takes positions
    /// `i, i + count, i + 2 * count, ...`.
    #[serde(default)]
    pub determined: Vec<u32>,
}

fn default_count() -> u32 {
    1
}

impl DiceDescriptor {
    /// Shorthand for a group with no determined results.
    #[must_use]
    pub fn new(count: u32, size: u32) -> Self {
        Self {
            count,
            size,
            determined: Vec::new(),
        }
    }

    /// Shorthand for a determined group.
    #[must_use]
    pub fn determined(count: u32, size: u32, determined: Vec<u32>) -> Self {
        Self {
            count,
            size,
            determined,
        }
    }

    /// Expands the group into individual dice.
    #[must_use]
    pub fn expand(&self) -> Vec<Die> {
        let count = self.count as usize;
        (0..count)
            .map(|i| {
                Die::determined(
                    self.size,
                    self.determined.iter().skip(i).step_by(count).copied(),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_test_support::{MaxRng, MockRng, SequenceRng};

    fn rolled(size: u32, value: u32) -> RolledDie {
        RolledDie {
            size,
            roll: value,
            determined: VecDeque::new(),
        }
    }

    // --- roll ---

    #[test]
    fn test_roll_consumes_determined_queue_in_fifo_order() {
        let mut queue: VecDeque<u32> = VecDeque::from(vec![4, 17, 2]);
        let mut rng = SequenceRng::new(vec![]);

        assert_eq!(roll(20, &mut queue, &mut rng), 4);
        assert_eq!(roll(20, &mut queue, &mut rng), 17);
        assert_eq!(roll(20, &mut queue, &mut rng), 2);
        assert!(queue.is_empty());
        assert_eq!(rng.drawn(), 0);
    }

    #[test]
    fn test_roll_falls_back_to_rng_once_queue_is_empty() {
        let mut queue: VecDeque<u32> = VecDeque::from(vec![6]);
        let mut rng = SequenceRng::new(vec![3]);

        assert_eq!(roll(6, &mut queue, &mut rng), 6);
        assert_eq!(roll(6, &mut queue, &mut rng), 3);
        assert_eq!(rng.drawn(), 1);
    }

    #[test]
    fn test_zero_sided_die_rolls_zero() {
        let mut queue = VecDeque::new();
        assert_eq!(roll(0, &mut queue, &mut MaxRng), 0);
    }

    // --- reroll / set / maximize ---

    #[test]
    fn test_reroll_if_only_touches_matching_dice() {
        let mut dice = vec![rolled(6, 1), rolled(6, 5), rolled(6, 2)];
        reroll_if(&mut dice, |v| v <= 2, &mut MaxRng);

        let rolls: Vec<u32> = dice.iter().map(|d| d.roll).collect();
        assert_eq!(rolls, vec![6, 5, 6]);
        assert!(dice.iter().all(|d| d.size == 6));
    }

    #[test]
    fn test_reroll_if_uses_remaining_determined_values() {
        let die = Die::determined(8, [1, 7]);
        let mut dice = vec![die.roll(&mut MockRng)];
        assert_eq!(dice[0].roll, 1);

        reroll_if(&mut dice, |v| v == 1, &mut MockRng);
        assert_eq!(dice[0].roll, 7);
    }

    #[test]
    fn test_set_if_overwrites_without_drawing() {
        let mut dice = vec![rolled(10, 1), rolled(10, 9)];
        set_if(&mut dice, |v| v == 1, 2);
        assert_eq!(dice[0].roll, 2);
        assert_eq!(dice[1].roll, 9);
    }

    #[test]
    fn test_maximize_sets_each_die_to_its_size() {
        let mut dice = vec![rolled(6, 2), rolled(12, 3)];
        maximize(&mut dice);
        assert_eq!(sum(&dice), 18);
    }

    #[test]
    fn test_empty_dice_sum_to_zero() {
        assert_eq!(sum(&[]), 0);
    }

    // --- descriptors ---

    #[test]
    fn test_descriptor_distributes_determined_values_across_dice() {
        let dice = DiceDescriptor::determined(2, 6, vec![3, 4, 5]).expand();
        assert_eq!(dice.len(), 2);
        assert_eq!(dice[0].determined, VecDeque::from(vec![3, 5]));
        assert_eq!(dice[1].determined, VecDeque::from(vec![4]));
    }

    #[test]
    fn test_descriptor_count_defaults_to_one() {
        let descriptor: DiceDescriptor = serde_json::from_str(r#"{"size": 8}"#).unwrap();
        assert_eq!(descriptor.count, 1);
        assert_eq!(descriptor.expand().len(), 1);
    }
}
