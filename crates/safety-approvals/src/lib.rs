//! # Safety Approvals - human-in-the-loop review of agent actions
//!
//! Actions the constraint engine will not let through on its own are queued
//! here until a human approves or rejects them.
//!
//! ```text
//! pending ──approve──▶ approved
//!    │    ──reject───▶ rejected
//!    └────expiry────▶ expired
//! ```
//!
//! Requests stay decidable for 24 hours by default. Expiry is applied lazily
//! when a late decision arrives and eagerly by [`ApprovalSystem::expire_stale`].

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod config;
pub mod error;
pub mod system;
pub mod types;

pub use config::ApprovalConfig;
pub use error::{ApprovalError, Result};
pub use system::ApprovalSystem;
pub use types::{ApprovalDecision, ApprovalRequest, ApprovalStatistics, ApprovalStatus};
