//! # Safety Constraints - policy evaluation for proposed agent actions
//!
//! A [`ConstraintManager`] owns one user's constraint set and action history
//! and turns a proposed action into a [`SafetyValidation`](safety_types::SafetyValidation).
//!
//! ## Evaluation
//!
//! 1. Resolve the action category: explicit `action_category`, then
//!    `action_type` keywords, then `content_modification`.
//! 2. Classify risk from `0.6 * risk_score + 0.4 * impact_score`.
//! 3. Check every applicable [`SafetyConstraint`]: risk tolerance, hourly and
//!    daily limits, mandatory approval, auto-approval threshold, payload
//!    conditions.
//! 4. Apply the category-wide rate limits.
//! 5. Look for suspicious behavior: repeated identical actions, hourly
//!    bursts, conflicting pairs.
//!
//! Every call is recorded. Counts include the action being evaluated.
//!
//! ## Failure
//!
//! Evaluation errors never reach the caller. A malformed payload or an
//! unusable constraint condition yields a fail-closed verdict carrying a
//! [`DenyReason`](safety_types::DenyReason).

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod classify;
pub mod conditions;
pub mod config;
pub mod constraint;
pub mod error;
pub mod history;
pub mod manager;
mod patterns;

pub use classify::{classify, DEFAULT_CATEGORY};
pub use config::{ConflictingPair, ConstraintConfig, RateLimitConfig, SuspiciousPatternConfig};
pub use constraint::{default_constraints, SafetyConstraint};
pub use error::{ConstraintError, Result, ValidationError};
pub use history::{ActionRecord, ViolationRecord};
pub use manager::ConstraintManager;
