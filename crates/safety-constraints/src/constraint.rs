//! Named safety constraints and the seeded default set.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use safety_types::ActionCategory;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ConstraintError, Result};

/// A named rule controlling which action categories need approval, are
/// rate limited, or must satisfy payload conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyConstraint {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Categories this constraint applies to
    pub action_categories: BTreeSet<ActionCategory>,

    /// Elevated-risk actions need review unless this is at least 0.8
    pub risk_threshold: f64,

    /// Every matching action needs human approval
    #[serde(default)]
    pub approval_required: bool,

    /// Actions whose `risk_score` exceeds this need human approval
    pub auto_approval_threshold: f64,

    #[serde(default)]
    pub daily_limit: Option<u32>,

    #[serde(default)]
    pub hourly_limit: Option<u32>,

    /// Payload conditions, e.g. `max_content_length` or `required_keywords`
    #[serde(default)]
    pub conditions: Map<String, Value>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl SafetyConstraint {
    /// Create a constraint with permissive defaults.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        categories: impl IntoIterator<Item = ActionCategory>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            action_categories: categories.into_iter().collect(),
            risk_threshold: 1.0,
            approval_required: false,
            auto_approval_threshold: 1.0,
            daily_limit: None,
            hourly_limit: None,
            conditions: Map::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_risk_threshold(mut self, threshold: f64) -> Self {
        self.risk_threshold = threshold;
        self
    }

    pub fn with_approval_required(mut self, required: bool) -> Self {
        self.approval_required = required;
        self
    }

    pub fn with_auto_approval_threshold(mut self, threshold: f64) -> Self {
        self.auto_approval_threshold = threshold;
        self
    }

    pub fn with_hourly_limit(mut self, limit: u32) -> Self {
        self.hourly_limit = Some(limit);
        self
    }

    pub fn with_daily_limit(mut self, limit: u32) -> Self {
        self.daily_limit = Some(limit);
        self
    }

    pub fn with_condition(mut self, key: impl Into<String>, value: Value) -> Self {
        self.conditions.insert(key.into(), value);
        self
    }

    /// Whether this constraint governs actions of `category`.
    pub fn applies_to(&self, category: ActionCategory) -> bool {
        self.action_categories.contains(&category)
    }

    /// Check structural invariants: thresholds in [0, 1], non-empty id and
    /// at least one category.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ConstraintError::Invalid {
                reason: "constraint id must not be empty".into(),
            });
        }
        if self.action_categories.is_empty() {
            return Err(ConstraintError::Invalid {
                reason: format!("constraint {} targets no action categories", self.id),
            });
        }
        for (field, value) in [
            ("risk_threshold", self.risk_threshold),
            ("auto_approval_threshold", self.auto_approval_threshold),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConstraintError::ThresholdOutOfRange {
                    constraint_id: self.id.clone(),
                    field,
                    value,
                });
            }
        }
        Ok(())
    }
}

/// The five constraints every manager starts with.
pub fn default_constraints() -> Vec<SafetyConstraint> {
    vec![
        SafetyConstraint::new(
            "content_modification_limit",
            "Content Modification Limit",
            [ActionCategory::ContentModification],
        )
        .with_description("Caps how often agents may edit content and how long it may get")
        .with_risk_threshold(0.7)
        .with_auto_approval_threshold(0.6)
        .with_hourly_limit(10)
        .with_daily_limit(50)
        .with_condition("max_content_length", Value::from(10_000u64)),
        SafetyConstraint::new(
            "seo_optimization_safety",
            "SEO Optimization Safety",
            [ActionCategory::SeoOptimization],
        )
        .with_description("Throttles keyword and metadata changes")
        .with_risk_threshold(0.6)
        .with_auto_approval_threshold(0.5)
        .with_hourly_limit(5)
        .with_daily_limit(20),
        SafetyConstraint::new(
            "competitor_response_control",
            "Competitor Response Control",
            [ActionCategory::CompetitorResponse],
        )
        .with_description("Competitor-facing responses always go through a human")
        .with_risk_threshold(0.5)
        .with_approval_required(true)
        .with_auto_approval_threshold(0.3)
        .with_daily_limit(5),
        SafetyConstraint::new(
            "social_amplification_limit",
            "Social Amplification Limit",
            [ActionCategory::SocialAmplification],
        )
        .with_description("Limits how often agents post to social platforms")
        .with_risk_threshold(0.6)
        .with_auto_approval_threshold(0.5)
        .with_hourly_limit(3)
        .with_daily_limit(15),
        SafetyConstraint::new(
            "high_risk_approval_required",
            "High Risk Approval Required",
            [
                ActionCategory::StrategyChange,
                ActionCategory::SystemConfiguration,
            ],
        )
        .with_description("Strategy and system configuration changes need human approval")
        .with_risk_threshold(0.8)
        .with_approval_required(true)
        .with_auto_approval_threshold(0.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_and_unique() {
        let defaults = default_constraints();
        assert_eq!(defaults.len(), 5);
        for constraint in &defaults {
            constraint.validate().unwrap();
        }
        let ids: BTreeSet<_> = defaults.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 5);
    }

    #[test]
    fn every_category_is_covered_by_a_default() {
        let defaults = default_constraints();
        for category in ActionCategory::ALL {
            assert!(
                defaults.iter().any(|c| c.applies_to(category)),
                "no default constraint for {}",
                category
            );
        }
    }

    #[test]
    fn thresholds_outside_unit_interval_are_rejected() {
        let c = SafetyConstraint::new("x", "X", [ActionCategory::SeoOptimization])
            .with_risk_threshold(1.2);
        assert!(matches!(
            c.validate(),
            Err(ConstraintError::ThresholdOutOfRange {
                field: "risk_threshold",
                ..
            })
        ));

        let c = SafetyConstraint::new("x", "X", [ActionCategory::SeoOptimization])
            .with_auto_approval_threshold(-0.1);
        assert!(c.validate().is_err());

        let c = SafetyConstraint::new("x", "X", [ActionCategory::SeoOptimization])
            .with_auto_approval_threshold(f64::NAN);
        assert!(c.validate().is_err());
    }

    #[test]
    fn empty_categories_are_rejected() {
        let c = SafetyConstraint::new("x", "X", Vec::<ActionCategory>::new());
        assert!(matches!(c.validate(), Err(ConstraintError::Invalid { .. })));
    }

    #[test]
    fn deserializes_with_defaults() {
        let c: SafetyConstraint = serde_json::from_value(serde_json::json!({
            "id": "weekend_freeze",
            "name": "Weekend Freeze",
            "action_categories": ["social_amplification"],
            "risk_threshold": 0.4,
            "auto_approval_threshold": 0.2,
            "hourly_limit": 1
        }))
        .unwrap();
        assert!(c.applies_to(ActionCategory::SocialAmplification));
        assert_eq!(c.hourly_limit, Some(1));
        assert!(!c.approval_required);
        assert!(c.conditions.is_empty());
    }
}
