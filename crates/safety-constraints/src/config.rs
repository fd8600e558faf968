//! Tunables for the constraint manager.

use serde::{Deserialize, Serialize};

use crate::constraint::SafetyConstraint;

/// Constraint manager configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstraintConfig {
    /// Capacity of the action history ring
    #[serde(default = "default_action_history_capacity")]
    pub action_history_capacity: usize,

    /// Capacity of the violation history ring
    #[serde(default = "default_violation_history_capacity")]
    pub violation_history_capacity: usize,

    /// Category-wide limits independent of named constraints
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    /// Behavioral heuristics
    #[serde(default)]
    pub suspicious_patterns: SuspiciousPatternConfig,

    /// Seed the five built-in constraints
    #[serde(default = "default_true")]
    pub seed_defaults: bool,

    /// Extra constraints seeded into every manager
    #[serde(default)]
    pub custom_constraints: Vec<SafetyConstraint>,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            action_history_capacity: default_action_history_capacity(),
            violation_history_capacity: default_violation_history_capacity(),
            rate_limits: RateLimitConfig::default(),
            suspicious_patterns: SuspiciousPatternConfig::default(),
            seed_defaults: true,
            custom_constraints: Vec::new(),
        }
    }
}

/// Global per-category rate limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum actions of one category in the trailing hour
    #[serde(default = "default_category_hourly")]
    pub category_hourly: u32,

    /// Maximum actions of one category in the trailing day
    #[serde(default = "default_category_daily")]
    pub category_daily: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            category_hourly: default_category_hourly(),
            category_daily: default_category_daily(),
        }
    }
}

/// Thresholds for suspicious-pattern detection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspiciousPatternConfig {
    /// Maximum identical `action_type` submissions in the trailing day
    #[serde(default = "default_identical_daily")]
    pub identical_daily: u32,

    /// Maximum submissions of any kind in the trailing hour
    #[serde(default = "default_total_hourly")]
    pub total_hourly: u32,

    /// Look-back window for conflicting pairs, in hours
    #[serde(default = "default_conflict_window_hours")]
    pub conflict_window_hours: i64,

    /// Pairs of action types that undo each other
    #[serde(default = "default_conflicting_pairs")]
    pub conflicting_pairs: Vec<ConflictingPair>,
}

impl Default for SuspiciousPatternConfig {
    fn default() -> Self {
        Self {
            identical_daily: default_identical_daily(),
            total_hourly: default_total_hourly(),
            conflict_window_hours: default_conflict_window_hours(),
            conflicting_pairs: default_conflicting_pairs(),
        }
    }
}

/// Two action types that contradict each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictingPair {
    pub first: String,
    pub second: String,
}

impl ConflictingPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }

    /// The opposite of `action_type`, if it is one side of this pair.
    pub fn opposite_of(&self, action_type: &str) -> Option<&str> {
        if self.first == action_type {
            Some(&self.second)
        } else if self.second == action_type {
            Some(&self.first)
        } else {
            None
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_action_history_capacity() -> usize {
    1000
}

fn default_violation_history_capacity() -> usize {
    500
}

fn default_category_hourly() -> u32 {
    50
}

fn default_category_daily() -> u32 {
    200
}

fn default_identical_daily() -> u32 {
    10
}

fn default_total_hourly() -> u32 {
    100
}

fn default_conflict_window_hours() -> i64 {
    24
}

fn default_conflicting_pairs() -> Vec<ConflictingPair> {
    vec![
        ConflictingPair::new("optimize_content", "delete_content"),
        ConflictingPair::new("increase_keywords", "decrease_keywords"),
        ConflictingPair::new("enable_feature", "disable_feature"),
    ]
}
