//! Engine configuration.
//!
//! Values are read from the environment the same way the runner reads its
//! own settings: every key is optional and falls back to the rules-as-written
//! default.

use thiserror::Error;

/// Environment key for the default critical hit threshold.
pub const CRITICAL_HIT_THRESHOLD_KEY: &str = "ARBITER_CRITICAL_HIT_THRESHOLD";

/// Environment key for the nested action depth limit.
pub const MAX_NESTING_DEPTH_KEY: &str = "ARBITER_MAX_NESTING_DEPTH";

/// Configuration parse errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A value was present but could not be parsed.
    #[error("{key} is invalid: {reason}")]
    Invalid {
        /// The environment key.
        key: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Tunables for a resolution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Natural d20 result at or above which an attack is a critical hit,
    /// before modifiers adjust it.
    pub critical_hit_threshold: i64,
    /// Maximum depth of nested action invocations before resolution aborts.
    pub max_nesting_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            critical_hit_threshold: 20,
            max_nesting_depth: 32,
        }
    }
}

impl EngineConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a present value does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a present value does not parse, or
    /// if the depth limit is zero.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let critical_hit_threshold = match lookup(CRITICAL_HIT_THRESHOLD_KEY) {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: CRITICAL_HIT_THRESHOLD_KEY,
                reason: format!("{e}"),
            })?,
            None => defaults.critical_hit_threshold,
        };

        let max_nesting_depth = match lookup(MAX_NESTING_DEPTH_KEY) {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: MAX_NESTING_DEPTH_KEY,
                reason: format!("{e}"),
            })?,
            None => defaults.max_nesting_depth,
        };
        if max_nesting_depth == 0 {
            return Err(ConfigError::Invalid {
                key: MAX_NESTING_DEPTH_KEY,
                reason: "must be at least 1".to_owned(),
            });
        }

        Ok(Self {
            critical_hit_threshold,
            max_nesting_depth,
        })
    }
}
