//! Errors raised while reading an action payload.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The payload did not carry the documented keys in the documented shapes.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionDataError {
    /// A required key is absent
    #[error("missing required field: {field}")]
    MissingField { field: String },

    /// A key is present with the wrong JSON type
    #[error("field `{field}` must be {expected}")]
    InvalidType { field: String, expected: String },

    /// A score lies outside [0, 1] or is not finite
    #[error("field `{field}` out of range [0, 1]: {value}")]
    OutOfRange { field: String, value: f64 },

    /// An explicit category that names none of the known categories
    #[error("unknown action category: {0}")]
    UnknownCategory(String),
}

/// Result type for payload parsing
pub type Result<T> = std::result::Result<T, ActionDataError>;
