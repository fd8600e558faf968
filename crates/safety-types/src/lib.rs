//! # Safety Types - shared vocabulary for the Agent Safety Framework
//!
//! Every safety engine speaks in terms of the same handful of types:
//!
//! - [`ActionData`]: the opaque, caller-defined payload describing a proposed action
//! - [`ActionRequest`]: the typed view of the documented subset of that payload
//! - [`ActionCategory`]: the six families of agent actions policies are written against
//! - [`RiskLevel`]: four-tier classification of a weighted risk/impact score
//! - [`SafetyValidation`]: the verdict returned for a proposed action
//! - [`DenyReason`]: why a verdict was produced on the fail-closed path
//! - [`BoundedLog`]: fixed-capacity FIFO used for every history buffer
//!
//! ## Fail closed
//!
//! A [`SafetyValidation`] built with [`SafetyValidation::fail_closed`] always
//! denies, always requires approval, reports `Critical` risk and zero
//! confidence. Engines produce it whenever evaluation itself fails.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod action;
pub mod error;
pub mod history;
pub mod ids;
pub mod risk;
pub mod validation;

pub use action::{ActionCategory, ActionData, ActionRequest, ClassificationSource};
pub use error::{ActionDataError, Result};
pub use history::BoundedLog;
pub use ids::{ApprovalId, CheckpointId};
pub use risk::{combined_score, RiskLevel};
pub use validation::{DenyReason, SafetyValidation};
