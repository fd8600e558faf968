//! Error types for rollback operations

use safety_types::CheckpointId;
use thiserror::Error;

/// Errors that can occur during rollback
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RollbackError {
    /// No live checkpoint with this id
    #[error("checkpoint not found: {0}")]
    NotFound(CheckpointId),

    /// A rollback handler could not undo the action
    #[error("rollback handler {handler} failed: {reason}")]
    HandlerFailed { handler: String, reason: String },
}

impl RollbackError {
    pub fn handler_failed(handler: impl Into<String>, reason: impl Into<String>) -> Self {
        RollbackError::HandlerFailed {
            handler: handler.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for rollback operations
pub type Result<T> = std::result::Result<T, RollbackError>;
