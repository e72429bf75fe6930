//! Content pack errors.

use std::path::PathBuf;

use thiserror::Error;

/// Failures that reject a whole pack. Malformed units inside an otherwise
/// readable pack are reported as issues instead.
#[derive(Debug, Error)]
pub enum ContentError {
    /// The pack file could not be read.
    #[error("failed to read content pack {path}: {source}")]
    Io {
        /// The file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The source is not valid YAML or JSON.
    #[error("content pack is not valid YAML or JSON: {0}")]
    Syntax(#[from] serde_yaml::Error),

    /// The document root or a section is not a mapping.
    #[error("content pack {section} must be a mapping")]
    NotAMapping {
        /// `document`, `actions`, `effects` or `resources`.
        section: &'static str,
    },
}
