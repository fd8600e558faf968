//! # Safety Service - the Agent Safety Framework behind one facade
//!
//! [`SafetyService`] is what an orchestrator talks to. Each call is scoped by
//! user id; the [`SafetyRegistry`] lazily creates that user's
//! [`ConstraintManager`](safety_constraints::ConstraintManager),
//! [`RollbackManager`](safety_rollback::RollbackManager) and
//! [`ApprovalSystem`](safety_approvals::ApprovalSystem).
//!
//! ## Control flow
//!
//! 1. `validate_agent_action` before executing an action
//! 2. `create_action_checkpoint` before a state-mutating action
//! 3. `request_user_approval` when the verdict requires approval, then
//!    `approve_action` once a human decides
//! 4. `rollback_to_checkpoint` if an executed action must be undone
//!
//! ## Maintenance
//!
//! [`SafetyService::spawn_maintenance`] runs a periodic sweep that expires
//! stale approvals and evicts idle users. Stop it with [`SafetyService::stop`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use safety_service::{SafetyConfig, SafetyService};
//! use serde_json::json;
//!
//! let service = SafetyService::new(SafetyConfig::default());
//! let action = json!({"action_type": "strategy_change", "risk_score": 0.9, "impact_score": 0.9});
//! let verdict = service.validate_agent_action("u1", action.as_object().unwrap_or(&Default::default()));
//! if verdict.requires_approval {
//!     let request = service.request_user_approval("u1", action.as_object().cloned().unwrap_or_default());
//!     println!("awaiting {}", request.approval_id);
//! }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod config;
pub mod error;
pub mod outcome;
pub mod registry;
pub mod service;

pub use config::{LoggingConfig, MaintenanceConfig, RegistryConfig, SafetyConfig};
pub use error::{Result, ServiceError};
pub use outcome::{ApprovalDecisionOutcome, ApprovalRequestOutcome, MaintenanceReport};
pub use registry::{SafetyRegistry, UserSafety};
pub use service::SafetyService;

pub use safety_approvals::{ApprovalRequest, ApprovalStatistics, ApprovalStatus};
pub use safety_rollback::{ActionCheckpoint, RollbackHandler, RollbackOutcome, RollbackReport};
pub use safety_types::{ActionCategory, ActionData, ApprovalId, CheckpointId, RiskLevel, SafetyValidation};
