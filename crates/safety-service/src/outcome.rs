//! Serializable results of the orchestrator entry points.

use chrono::{DateTime, Utc};
use safety_approvals::{ApprovalError, ApprovalRequest, ApprovalStatus};
use safety_types::ApprovalId;
use serde::{Deserialize, Serialize};

/// Result of `request_user_approval`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequestOutcome {
    pub success: bool,
    pub approval_id: ApprovalId,
    pub status: ApprovalStatus,
    pub expires_at: DateTime<Utc>,
}

impl From<&ApprovalRequest> for ApprovalRequestOutcome {
    fn from(request: &ApprovalRequest) -> Self {
        Self {
            success: true,
            approval_id: request.approval_id.clone(),
            status: request.status,
            expires_at: request.expires_at,
        }
    }
}

/// Result of `approve_action`: a status on success, an error code otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalDecisionOutcome {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ApprovalStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Result<ApprovalStatus, ApprovalError>> for ApprovalDecisionOutcome {
    fn from(result: Result<ApprovalStatus, ApprovalError>) -> Self {
        match result {
            Ok(status) => Self {
                success: true,
                status: Some(status),
                error: None,
            },
            Err(err) => Self {
                success: false,
                status: None,
                error: Some(err.to_string()),
            },
        }
    }
}

/// What one maintenance pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaintenanceReport {
    pub expired_approvals: usize,
    pub evicted_users: usize,
}
