//! Approval error types.

use safety_types::ApprovalId;
use thiserror::Error;

/// Errors that can occur when deciding an approval request.
///
/// Display strings are the short codes reported to callers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ApprovalError {
    /// No pending request with this id.
    #[error("not found")]
    NotFound(ApprovalId),

    /// The request passed its expiry before a decision arrived.
    #[error("expired")]
    Expired(ApprovalId),

    /// The decision was neither `approved` nor `rejected`.
    #[error("invalid decision")]
    InvalidDecision(String),
}

/// Result type for approval operations.
pub type Result<T> = std::result::Result<T, ApprovalError>;
