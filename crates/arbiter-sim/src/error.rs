//! Runner error type.

use std::path::PathBuf;

use arbiter_content::domain::errors::ContentError;
use arbiter_core::error::RulesError;
use thiserror::Error;

/// Failures that stop a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// A required environment variable is unset.
    #[error("environment variable {0} must be set")]
    MissingEnv(&'static str),

    /// The seed is not an unsigned integer.
    #[error("ARBITER_SEED must be an unsigned integer, got `{0}`")]
    InvalidSeed(String),

    /// The content pack could not be loaded.
    #[error(transparent)]
    Content(#[from] ContentError),

    /// The scenario file could not be read.
    #[error("failed to read scenario {path}: {source}")]
    Io {
        /// The file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The scenario document is malformed.
    #[error("malformed scenario: {0}")]
    Scenario(#[from] serde_yaml::Error),

    /// A step names an actor the scenario does not define.
    #[error("step {step} names unknown actor `{name}`")]
    UnknownActor {
        /// Zero-based step index.
        step: usize,
        /// The missing name.
        name: String,
    },

    /// Resolution failed.
    #[error("step {step} failed: {source}")]
    Step {
        /// Zero-based step index.
        step: usize,
        /// The engine error.
        #[source]
        source: RulesError,
    },

    /// Building the scenario's actors failed.
    #[error(transparent)]
    Rules(#[from] RulesError),
}
