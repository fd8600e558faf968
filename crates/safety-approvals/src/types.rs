//! Approval request types.

use chrono::{DateTime, Utc};
use safety_types::{ActionData, ApprovalId};
use serde::{Deserialize, Serialize};

use crate::error::ApprovalError;

/// Lifecycle of an approval request. Every state but `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
            ApprovalStatus::Expired => "expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApprovalStatus::Pending)
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A human decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

impl std::str::FromStr for ApprovalDecision {
    type Err = ApprovalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(ApprovalDecision::Approved),
            "rejected" => Ok(ApprovalDecision::Rejected),
            other => Err(ApprovalError::InvalidDecision(other.to_string())),
        }
    }
}

impl From<ApprovalDecision> for ApprovalStatus {
    fn from(decision: ApprovalDecision) -> Self {
        match decision {
            ApprovalDecision::Approved => ApprovalStatus::Approved,
            ApprovalDecision::Rejected => ApprovalStatus::Rejected,
        }
    }
}

/// A proposed action waiting on, or resolved by, a human.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub approval_id: ApprovalId,
    pub action_data: ActionData,
    pub requested_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: ApprovalStatus,

    /// When the request left the pending set
    pub decided_at: Option<DateTime<Utc>>,

    pub user_comments: Option<String>,
}

impl ApprovalRequest {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Aggregate view of one user's decided requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalStatistics {
    /// Records in the history buffer
    pub total_decisions: usize,
    pub approved: usize,
    pub rejected: usize,
    pub expired: usize,

    /// `approved / total_decisions`, 0 when there are none
    pub approval_rate: f64,

    pub pending_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_parsing() {
        assert_eq!("approved".parse::<ApprovalDecision>().unwrap(), ApprovalDecision::Approved);
        assert_eq!("rejected".parse::<ApprovalDecision>().unwrap(), ApprovalDecision::Rejected);
        assert!(matches!(
            "Approved".parse::<ApprovalDecision>(),
            Err(ApprovalError::InvalidDecision(_))
        ));
        assert!("pending".parse::<ApprovalDecision>().is_err());
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(ApprovalStatus::Expired).unwrap(),
            serde_json::json!("expired")
        );
        assert!(ApprovalStatus::Rejected.is_terminal());
        assert!(!ApprovalStatus::Pending.is_terminal());
    }
}
