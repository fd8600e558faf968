//! Per-user constraint manager.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use safety_types::action::str_field;
use safety_types::{
    combined_score, ActionData, ActionRequest, BoundedLog, RiskLevel, SafetyValidation,
};
use tracing::{debug, instrument, warn};

use crate::classify::classify;
use crate::conditions::check_conditions;
use crate::config::ConstraintConfig;
use crate::constraint::{default_constraints, SafetyConstraint};
use crate::error::{ConstraintError, Result, ValidationError};
use crate::history::{ActionRecord, ActionWindow, ViolationRecord};
use crate::patterns;

/// Constraints at or above this risk threshold tolerate elevated-risk actions.
const ELEVATED_RISK_TOLERANCE: f64 = 0.8;

const CONSTRAINT_VIOLATION_FACTOR: f64 = 0.9;
const RATE_LIMIT_FACTOR: f64 = 0.8;
const SUSPICIOUS_PATTERN_FACTOR: f64 = 0.7;

struct ConstraintState {
    constraints: Vec<SafetyConstraint>,
    actions: BoundedLog<ActionRecord>,
    violations: BoundedLog<ViolationRecord>,
}

/// Evaluates proposed actions for one user and keeps that user's history.
///
/// Counting and recording happen under a single lock acquisition, so two
/// concurrent validations can never both slip under a limit.
pub struct ConstraintManager {
    user_id: String,
    config: ConstraintConfig,
    state: Mutex<ConstraintState>,
}

impl ConstraintManager {
    /// Create a manager seeded from `config`.
    ///
    /// Seeded constraints that fail validation or repeat an id are skipped
    /// with a warning.
    pub fn new(user_id: impl Into<String>, config: ConstraintConfig) -> Self {
        let user_id = user_id.into();
        let mut constraints: Vec<SafetyConstraint> = Vec::new();
        let seeded = if config.seed_defaults {
            default_constraints()
        } else {
            Vec::new()
        };
        for constraint in seeded.into_iter().chain(config.custom_constraints.iter().cloned()) {
            if let Err(e) = constraint.validate() {
                warn!(user_id = %user_id, error = %e, "Skipping invalid seeded constraint");
                continue;
            }
            if constraints.iter().any(|c| c.id == constraint.id) {
                warn!(user_id = %user_id, constraint_id = %constraint.id, "Skipping duplicate seeded constraint");
                continue;
            }
            constraints.push(constraint);
        }

        let state = ConstraintState {
            constraints,
            actions: BoundedLog::new(config.action_history_capacity),
            violations: BoundedLog::new(config.violation_history_capacity),
        };

        Self {
            user_id,
            config,
            state: Mutex::new(state),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Validate a proposed action now.
    pub fn validate_action(&self, action_data: &ActionData) -> SafetyValidation {
        self.validate_action_at(action_data, Utc::now())
    }

    /// Validate a proposed action as of `now`.
    ///
    /// Never fails: any evaluation error yields a fail-closed verdict. Every
    /// call is recorded in the action history.
    #[instrument(skip(self, action_data), fields(user_id = %self.user_id, action_type = tracing::field::Empty))]
    pub fn validate_action_at(
        &self,
        action_data: &ActionData,
        now: DateTime<Utc>,
    ) -> SafetyValidation {
        let action_type = str_field(action_data, "action_type").map(str::to_string);
        if let Some(action_type) = &action_type {
            tracing::Span::current().record("action_type", action_type.as_str());
        }

        let mut state = self.state.lock();
        let validation = match self.evaluate(&state, action_data, now) {
            Ok(validation) => validation,
            Err(e) => {
                warn!(error = %e, "Action validation failed, denying");
                SafetyValidation::fail_closed(e.deny_reason(), now)
            }
        };

        state.actions.push(ActionRecord {
            timestamp: now,
            action_type: action_type.clone(),
            category: validation.category,
            risk_level: validation.risk_level,
            is_valid: validation.is_valid,
            requires_approval: validation.requires_approval,
            violation_count: validation.violations.len(),
        });
        if !validation.violations.is_empty() {
            state.violations.push(ViolationRecord {
                timestamp: now,
                action_type,
                category: validation.category,
                risk_level: validation.risk_level,
                violations: validation.violations.clone(),
            });
        }

        debug!(
            is_valid = validation.is_valid,
            risk_level = %validation.risk_level,
            requires_approval = validation.requires_approval,
            violations = validation.violations.len(),
            "Action validated"
        );

        validation
    }

    fn evaluate(
        &self,
        state: &ConstraintState,
        action_data: &ActionData,
        now: DateTime<Utc>,
    ) -> std::result::Result<SafetyValidation, ValidationError> {
        let request = ActionRequest::parse(action_data)?;
        let (category, source) = classify(&request);
        let combined = combined_score(request.risk_score, request.impact_score);
        let risk_level = RiskLevel::from_combined(combined);
        let window = ActionWindow::new(&state.actions, now);

        let mut violations = Vec::new();
        let mut recommendations = Vec::new();
        let mut requires_approval = false;
        let mut confidence = 1.0;

        // Named constraints
        let mut constraint_violations = Vec::new();
        let hourly = window.in_category(category, Duration::hours(1)) + 1;
        let daily = window.in_category(category, Duration::hours(24)) + 1;
        for constraint in state.constraints.iter().filter(|c| c.applies_to(category)) {
            if risk_level.is_elevated() && constraint.risk_threshold < ELEVATED_RISK_TOLERANCE {
                constraint_violations.push(format!(
                    "{} risk action exceeds the {} risk threshold of {}",
                    capitalize(risk_level),
                    constraint.name,
                    constraint.risk_threshold
                ));
                requires_approval = true;
            }

            if let Some(limit) = constraint.hourly_limit {
                if hourly > limit {
                    constraint_violations.push(format!(
                        "Hourly limit exceeded for {}: {} of {} allowed",
                        constraint.name, hourly, limit
                    ));
                }
            }
            if let Some(limit) = constraint.daily_limit {
                if daily > limit {
                    constraint_violations.push(format!(
                        "Daily limit exceeded for {}: {} of {} allowed",
                        constraint.name, daily, limit
                    ));
                }
            }

            if constraint.approval_required {
                requires_approval = true;
                recommendations.push(format!("{} requires human approval", constraint.name));
            }
            if request.risk_score > constraint.auto_approval_threshold {
                requires_approval = true;
                recommendations.push(format!(
                    "Risk score {} is above the {} auto-approval threshold of {}",
                    request.risk_score, constraint.name, constraint.auto_approval_threshold
                ));
            }

            constraint_violations.extend(check_conditions(constraint, &request)?);
        }
        if !constraint_violations.is_empty() {
            confidence *= CONSTRAINT_VIOLATION_FACTOR;
            violations.append(&mut constraint_violations);
        }

        // Category-wide rate limits
        let limits = &self.config.rate_limits;
        let mut rate_limited = false;
        if hourly > limits.category_hourly {
            violations.push(format!(
                "Rate limit exceeded: {} {} actions in the last hour (limit {})",
                hourly, category, limits.category_hourly
            ));
            rate_limited = true;
        }
        if daily > limits.category_daily {
            violations.push(format!(
                "Rate limit exceeded: {} {} actions in the last day (limit {})",
                daily, category, limits.category_daily
            ));
            rate_limited = true;
        }
        if rate_limited {
            confidence *= RATE_LIMIT_FACTOR;
            recommendations.push(format!("Slow down {} actions", category));
        }

        // Behavioral heuristics
        let suspicious = patterns::detect(&self.config.suspicious_patterns, &window, &request);
        if !suspicious.is_empty() {
            confidence *= SUSPICIOUS_PATTERN_FACTOR;
            requires_approval = true;
            violations.extend(suspicious);
            recommendations.push("Review recent agent behavior before continuing".to_string());
        }

        confidence *= source.confidence_factor();

        if risk_level.is_elevated() {
            recommendations.push("Create a rollback checkpoint before executing".to_string());
        }
        if requires_approval {
            recommendations.push("Request human approval before executing".to_string());
        }

        Ok(
            SafetyValidation::new(
                risk_level,
                violations,
                recommendations,
                requires_approval,
                confidence,
                now,
            )
            .with_category(category, source),
        )
    }

    /// Add a constraint at runtime.
    pub fn add_custom_constraint(&self, constraint: SafetyConstraint) -> Result<()> {
        constraint.validate()?;
        let mut state = self.state.lock();
        if state.constraints.iter().any(|c| c.id == constraint.id) {
            return Err(ConstraintError::Duplicate(constraint.id));
        }
        debug!(user_id = %self.user_id, constraint_id = %constraint.id, "Constraint added");
        state.constraints.push(constraint);
        Ok(())
    }

    /// Remove a constraint by id, returning it.
    pub fn remove_constraint(&self, constraint_id: &str) -> Result<SafetyConstraint> {
        let mut state = self.state.lock();
        let index = state
            .constraints
            .iter()
            .position(|c| c.id == constraint_id)
            .ok_or_else(|| ConstraintError::NotFound(constraint_id.to_string()))?;
        debug!(user_id = %self.user_id, constraint_id, "Constraint removed");
        Ok(state.constraints.remove(index))
    }

    pub fn get_constraints(&self) -> Vec<SafetyConstraint> {
        self.state.lock().constraints.clone()
    }

    /// The most recent `limit` evaluated actions, oldest first.
    pub fn get_validation_history(&self, limit: usize) -> Vec<ActionRecord> {
        self.state.lock().actions.recent(limit)
    }

    /// The most recent `limit` violation records, oldest first.
    pub fn get_violation_history(&self, limit: usize) -> Vec<ViolationRecord> {
        self.state.lock().violations.recent(limit)
    }
}

fn capitalize(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "Low",
        RiskLevel::Medium => "Medium",
        RiskLevel::High => "High",
        RiskLevel::Critical => "Critical",
    }
}
