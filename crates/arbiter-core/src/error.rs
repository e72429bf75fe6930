//! Engine error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for every resolution operation.
///
/// All variants are fatal to the `invoke` call tree that raised them. Nothing
/// in the engine retries, and side effects committed before the failure are
/// kept.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RulesError {
    /// An action's declared kind disagrees with the implementation invoked.
    #[error("action kind mismatch: declared `{declared}`, implemented `{implemented}`")]
    KindMismatch {
        /// The kind recorded when the action was built.
        declared: &'static str,
        /// The kind of the implementation that was invoked.
        implemented: &'static str,
    },

    /// Content named an action kind that is not registered.
    #[error("unregistered action kind `{0}`")]
    UnknownActionKind(String),

    /// Content referenced a template id that is not loaded.
    #[error("unknown {category} template `{id}`")]
    UnknownTemplate {
        /// Template category (`action`, `effect`, `resource`).
        category: &'static str,
        /// The missing template id.
        id: String,
    },

    /// A content document could not be turned into a typed request.
    #[error("malformed `{kind}` content: {reason}")]
    MalformedContent {
        /// The kind key of the offending document.
        kind: String,
        /// Human-readable parse failure.
        reason: String,
    },

    /// A calculation was read before its base or override was established.
    #[error("calculation read before a base or set value was established")]
    MissingBase,

    /// A lifecycle method was called out of order.
    #[error("`{kind}` action must be {expected}, but is {actual}")]
    InvalidPhase {
        /// The action kind.
        kind: &'static str,
        /// The phase the call requires.
        expected: &'static str,
        /// The phase the action is in.
        actual: &'static str,
    },

    /// A named operation was applied to an action that cannot carry it.
    #[error("operation `{operation}` cannot be applied to `{kind}` actions")]
    OperationMismatch {
        /// The operation name.
        operation: &'static str,
        /// The action kind it was applied to.
        kind: &'static str,
    },

    /// The object registry has no object with the given identifier.
    #[error("object not found: {0}")]
    ObjectNotFound(Uuid),

    /// An action needed a source or target that was never bound.
    #[error("`{kind}` action has no {role} bound")]
    MissingBinding {
        /// The action kind.
        kind: &'static str,
        /// `source` or `target`.
        role: &'static str,
    },

    /// Nested actions exceeded the configured depth limit.
    #[error("nested action depth exceeded the limit of {limit}")]
    NestingTooDeep {
        /// The configured limit.
        limit: usize,
    },
}
