//! Layered arithmetic shared by every numeric resolution.
//!
//! `get()` is `(set or base) + bonus`, floored by `minimum`. Both `set` and
//! `minimum` only ever move upward: when several modifiers compete to fix a
//! result, the highest one wins regardless of order.

use arbiter_core::error::RulesError;
use serde::{Deserialize, Serialize};

/// Base / bonus / set / minimum calculation state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calculation {
    base: Option<i64>,
    bonus: i64,
    set: Option<i64>,
    minimum: Option<i64>,
}

impl Calculation {
    /// Creates an empty calculation. `get()` fails until a base or set is
    /// established.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a calculation with its base already established.
    #[must_use]
    pub fn with_base(base: i64) -> Self {
        Self {
            base: Some(base),
            ..Self::default()
        }
    }

    /// Establishes the base value. Called during `prepare`.
    pub fn set_base(&mut self, value: i64) {
        self.base = Some(value);
    }

    /// Adds to the running bonus.
    pub fn add_bonus(&mut self, delta: i64) {
        self.bonus += delta;
    }

    /// Raises the override. Values at or below the current override are
    /// ignored.
    pub fn set(&mut self, value: i64) {
        if self.set.is_none_or(|current| value > current) {
            self.set = Some(value);
        }
    }

    /// Raises the floor. Values at or below the current floor are ignored.
    pub fn set_minimum(&mut self, value: i64) {
        if self.minimum.is_none_or(|current| value > current) {
            self.minimum = Some(value);
        }
    }

    /// The established base, if any.
    #[must_use]
    pub fn base(&self) -> Option<i64> {
        self.base
    }

    /// The running bonus total.
    #[must_use]
    pub fn bonus(&self) -> i64 {
        self.bonus
    }

    /// The current override, if any.
    #[must_use]
    pub fn override_value(&self) -> Option<i64> {
        self.set
    }

    /// The current floor, if any.
    #[must_use]
    pub fn minimum(&self) -> Option<i64> {
        self.minimum
    }

    /// Resolves the final value.
    ///
    /// # Errors
    ///
    /// Returns `RulesError::MissingBase` if neither a base nor an override
    /// has been established.
    pub fn get(&self) -> Result<i64, RulesError> {
        let raw = self.set.or(self.base).ok_or(RulesError::MissingBase)? + self.bonus;
        Ok(match self.minimum {
            Some(minimum) => raw.max(minimum),
            None => raw,
        })
    }
}
