//! Payload conditions attached to constraints.
//!
//! Recognized keys:
//!
//! | key | value | rule |
//! |-----|-------|------|
//! | `max_content_length` | non-negative integer | `content` may hold at most this many characters |
//! | `required_keywords` | array of strings | every keyword must appear in `content` (case-insensitive) |
//! | `allowed_keywords` | array of strings | non-empty `content` must contain at least one keyword |
//!
//! Unrecognized keys are carried but not evaluated. A recognized key with a
//! value of the wrong shape is an evaluation error.

use safety_types::ActionRequest;
use serde_json::Value;

use crate::constraint::SafetyConstraint;
use crate::error::ValidationError;

pub const MAX_CONTENT_LENGTH: &str = "max_content_length";
pub const REQUIRED_KEYWORDS: &str = "required_keywords";
pub const ALLOWED_KEYWORDS: &str = "allowed_keywords";

/// Evaluate the conditions of `constraint` against the payload, returning the
/// violations found.
pub fn check_conditions(
    constraint: &SafetyConstraint,
    request: &ActionRequest,
) -> Result<Vec<String>, ValidationError> {
    let mut violations = Vec::new();
    let content = request.content.as_deref().unwrap_or("");
    let lowered = content.to_lowercase();

    if let Some(value) = constraint.conditions.get(MAX_CONTENT_LENGTH) {
        let max = value.as_u64().ok_or_else(|| invalid(constraint, MAX_CONTENT_LENGTH, value))?;
        let length = content.chars().count() as u64;
        if length > max {
            violations.push(format!(
                "Content length {} exceeds the {} maximum of {}",
                length, constraint.name, max
            ));
        }
    }

    if let Some(value) = constraint.conditions.get(REQUIRED_KEYWORDS) {
        let keywords = keyword_list(constraint, REQUIRED_KEYWORDS, value)?;
        let missing: Vec<&str> = keywords
            .iter()
            .filter(|kw| !lowered.contains(&kw.to_lowercase()))
            .copied()
            .collect();
        if !missing.is_empty() {
            violations.push(format!(
                "Content is missing keywords required by {}: {}",
                constraint.name,
                missing.join(", ")
            ));
        }
    }

    if let Some(value) = constraint.conditions.get(ALLOWED_KEYWORDS) {
        let keywords = keyword_list(constraint, ALLOWED_KEYWORDS, value)?;
        if !content.is_empty()
            && !keywords.is_empty()
            && !keywords.iter().any(|kw| lowered.contains(&kw.to_lowercase()))
        {
            violations.push(format!(
                "Content contains none of the keywords allowed by {}",
                constraint.name
            ));
        }
    }

    Ok(violations)
}

fn keyword_list<'a>(
    constraint: &SafetyConstraint,
    key: &str,
    value: &'a Value,
) -> Result<Vec<&'a str>, ValidationError> {
    let items = value.as_array().ok_or_else(|| invalid(constraint, key, value))?;
    items
        .iter()
        .map(|item| item.as_str().ok_or_else(|| invalid(constraint, key, value)))
        .collect()
}

fn invalid(constraint: &SafetyConstraint, key: &str, value: &Value) -> ValidationError {
    ValidationError::InvalidCondition {
        constraint_id: constraint.id.clone(),
        detail: format!("{} has unusable value {}", key, value),
    }
}
