//! Validation verdicts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::action::{ActionCategory, ClassificationSource};
use crate::risk::RiskLevel;

/// Why a verdict was produced on the fail-closed path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenyReason {
    /// The payload could not be read
    MalformedAction { detail: String },

    /// A constraint carries a condition value that cannot be evaluated
    InvalidCondition {
        constraint_id: String,
        detail: String,
    },

    /// Any other evaluation failure
    Internal { detail: String },
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DenyReason::MalformedAction { detail } => write!(f, "malformed action: {}", detail),
            DenyReason::InvalidCondition {
                constraint_id,
                detail,
            } => write!(f, "invalid condition on {}: {}", constraint_id, detail),
            DenyReason::Internal { detail } => write!(f, "internal error: {}", detail),
        }
    }
}

/// Verdict for a proposed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyValidation {
    /// True only with zero violations and no approval requirement
    pub is_valid: bool,

    pub risk_level: RiskLevel,

    /// Violations in the order they were found
    pub violations: Vec<String>,

    pub recommendations: Vec<String>,

    pub requires_approval: bool,

    /// Confidence in the verdict, in [0, 1]
    pub confidence_score: f64,

    pub validation_timestamp: DateTime<Utc>,

    /// Category the action was evaluated under
    pub category: Option<ActionCategory>,

    pub classification: Option<ClassificationSource>,

    /// Set only when evaluation failed and the verdict failed closed
    pub deny_reason: Option<DenyReason>,
}

impl SafetyValidation {
    /// Assemble a verdict, deriving `is_valid` and clamping confidence.
    pub fn new(
        risk_level: RiskLevel,
        violations: Vec<String>,
        recommendations: Vec<String>,
        requires_approval: bool,
        confidence_score: f64,
        validation_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            is_valid: violations.is_empty() && !requires_approval,
            risk_level,
            violations,
            recommendations,
            requires_approval,
            confidence_score: confidence_score.clamp(0.0, 1.0),
            validation_timestamp,
            category: None,
            classification: None,
            deny_reason: None,
        }
    }

    /// Record how the action was classified.
    pub fn with_category(mut self, category: ActionCategory, source: ClassificationSource) -> Self {
        self.category = Some(category);
        self.classification = Some(source);
        self
    }

    /// The maximally conservative verdict.
    pub fn fail_closed(reason: DenyReason, validation_timestamp: DateTime<Utc>) -> Self {
        Self {
            is_valid: false,
            risk_level: RiskLevel::Critical,
            violations: vec![format!("Validation error: {}", reason)],
            recommendations: vec![
                "Manual review required: the action could not be validated".to_string(),
            ],
            requires_approval: true,
            confidence_score: 0.0,
            validation_timestamp,
            category: None,
            classification: None,
            deny_reason: Some(reason),
        }
    }

    /// Whether this verdict came from the fail-closed path.
    pub fn failed_closed(&self) -> bool {
        self.deny_reason.is_some()
    }
}
