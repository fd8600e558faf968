//! Pre-action checkpoints.

use chrono::{DateTime, Utc};
use safety_types::action::str_field;
use safety_types::{ActionCategory, ActionData, CheckpointId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `action_type` recorded when the payload carries none.
pub const UNKNOWN_ACTION_TYPE: &str = "unknown";

/// The intent of an action and the system state observed right before it ran.
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCheckpoint {
    pub checkpoint_id: CheckpointId,
    pub action_id: Option<String>,
    pub agent_id: Option<String>,
    pub user_id: String,
    pub action_type: String,
    pub action_data: ActionData,
    pub system_state: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl ActionCheckpoint {
    pub(crate) fn new(
        checkpoint_id: CheckpointId,
        user_id: &str,
        action_data: ActionData,
        system_state: Map<String, Value>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            checkpoint_id,
            action_id: str_field(&action_data, "action_id").map(str::to_string),
            agent_id: str_field(&action_data, "agent_id").map(str::to_string),
            user_id: user_id.to_string(),
            action_type: str_field(&action_data, "action_type")
                .unwrap_or(UNKNOWN_ACTION_TYPE)
                .to_string(),
            action_data,
            system_state,
            created_at,
        }
    }

    /// Category whose handler undoes this action.
    ///
    /// An explicit `action_category` wins, then an `action_type` that is
    /// itself a category name, then keyword matching. `None` selects the
    /// generic handler.
    pub fn rollback_category(&self) -> Option<ActionCategory> {
        if let Some(category) = str_field(&self.action_data, "action_category")
            .and_then(|name| name.parse::<ActionCategory>().ok())
        {
            return Some(category);
        }
        if let Ok(category) = self.action_type.parse::<ActionCategory>() {
            return Some(category);
        }
        ActionCategory::from_keywords(&self.action_type)
    }
}

/// Base id for a checkpoint: owner plus creation second.
pub(crate) fn base_checkpoint_id(user_id: &str, at: DateTime<Utc>) -> String {
    format!("checkpoint_{}_{}", user_id, at.format("%Y%m%d%H%M%S"))
}
