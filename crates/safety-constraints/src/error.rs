//! Error types for constraint management and action evaluation

use safety_types::{ActionDataError, DenyReason};
use thiserror::Error;

/// Errors from managing the constraint set
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConstraintError {
    /// A threshold lies outside [0, 1]
    #[error("constraint {constraint_id}: {field} must lie in [0, 1], got {value}")]
    ThresholdOutOfRange {
        constraint_id: String,
        field: &'static str,
        value: f64,
    },

    /// The constraint is structurally unusable
    #[error("invalid constraint: {reason}")]
    Invalid { reason: String },

    /// A constraint with this id already exists
    #[error("duplicate constraint id: {0}")]
    Duplicate(String),

    /// No constraint with this id
    #[error("constraint not found: {0}")]
    NotFound(String),
}

/// Errors raised while evaluating an action.
///
/// Never surfaced to callers of `validate_action`: each one becomes a
/// fail-closed verdict.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error(transparent)]
    Action(#[from] ActionDataError),

    #[error("constraint {constraint_id} has an unusable condition: {detail}")]
    InvalidCondition {
        constraint_id: String,
        detail: String,
    },
}

impl ValidationError {
    /// The typed reason recorded on the fail-closed verdict.
    pub fn deny_reason(&self) -> DenyReason {
        match self {
            ValidationError::Action(err) => DenyReason::MalformedAction {
                detail: err.to_string(),
            },
            ValidationError::InvalidCondition {
                constraint_id,
                detail,
            } => DenyReason::InvalidCondition {
                constraint_id: constraint_id.clone(),
                detail: detail.clone(),
            },
        }
    }
}

/// Result type for constraint management
pub type Result<T> = std::result::Result<T, ConstraintError>;
