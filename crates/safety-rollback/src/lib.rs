//! # Safety Rollback - checkpoints and undo for agent actions
//!
//! Before an agent mutates anything, the orchestrator records an
//! [`ActionCheckpoint`]: the action payload plus a snapshot of the state it is
//! about to change. If the action later has to be undone, the
//! [`RollbackManager`] dispatches the checkpoint to a [`RollbackHandler`]
//! chosen by action category.
//!
//! ## Handlers
//!
//! Out of the box every category is served by an [`AcknowledgingHandler`],
//! which records the request but restores nothing (`state_restored = false`).
//! Deployments install real handlers with [`RollbackManager::with_handler`]
//! and [`RollbackManager::with_fallback_handler`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use safety_rollback::{RollbackConfig, RollbackManager};
//! use serde_json::{json, Map};
//!
//! # async fn example() {
//! let manager = RollbackManager::new("user-1", RollbackConfig::default());
//! let action = json!({"action_type": "optimize_content"});
//! let id = manager.create_checkpoint(
//!     action.as_object().cloned().unwrap_or_default(),
//!     Map::new(),
//! );
//! let outcome = manager.rollback_to_checkpoint(&id).await;
//! assert!(outcome.success);
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod handler;
pub mod manager;

pub use checkpoint::ActionCheckpoint;
pub use config::RollbackConfig;
pub use error::{Result, RollbackError};
pub use handler::{AcknowledgingHandler, RollbackHandler, RollbackReport};
pub use manager::{RollbackManager, RollbackOutcome};
