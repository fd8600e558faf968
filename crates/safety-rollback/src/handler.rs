//! Pluggable undo strategies.

use async_trait::async_trait;
use safety_types::ActionCategory;
use serde::{Deserialize, Serialize};

use crate::checkpoint::ActionCheckpoint;
use crate::error::Result;

/// What a handler did for one checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackReport {
    pub message: String,

    /// True only when downstream state was actually put back
    pub state_restored: bool,
}

/// Undoes the effects of one family of actions.
///
/// Implementations talk to the downstream system that executed the action.
/// They must not assume they are called at most once per checkpoint.
#[async_trait]
pub trait RollbackHandler: Send + Sync {
    /// Name recorded on rollback outcomes.
    fn name(&self) -> &str;

    async fn rollback(&self, checkpoint: &ActionCheckpoint) -> Result<RollbackReport>;
}

/// Built-in handler that records the request without touching downstream
/// systems. Always succeeds with `state_restored = false`.
#[derive(Debug, Clone)]
pub struct AcknowledgingHandler {
    name: String,
}

impl AcknowledgingHandler {
    pub fn for_category(category: ActionCategory) -> Self {
        Self {
            name: category.as_str().to_string(),
        }
    }

    pub fn generic() -> Self {
        Self {
            name: "generic".to_string(),
        }
    }
}

#[async_trait]
impl RollbackHandler for AcknowledgingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn rollback(&self, checkpoint: &ActionCheckpoint) -> Result<RollbackReport> {
        let state_keys: Vec<&str> = checkpoint.system_state.keys().map(String::as_str).collect();
        let action_keys: Vec<&str> = checkpoint.action_data.keys().map(String::as_str).collect();
        Ok(RollbackReport {
            message: format!(
                "{} rollback acknowledged for {} (state keys: [{}]; action keys: [{}])",
                self.name,
                checkpoint.action_type,
                state_keys.join(", "),
                action_keys.join(", ")
            ),
            state_restored: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use safety_types::CheckpointId;
    use serde_json::{json, Map};

    #[tokio::test]
    async fn acknowledges_without_restoring() {
        let mut state = Map::new();
        state.insert("title".into(), json!("Old title"));
        let checkpoint = ActionCheckpoint::new(
            CheckpointId::new("cp"),
            "u1",
            json!({"action_type": "edit_title"}).as_object().cloned().unwrap(),
            state,
            Utc::now(),
        );

        let handler = AcknowledgingHandler::for_category(ActionCategory::ContentModification);
        let report = handler.rollback(&checkpoint).await.unwrap();
        assert!(!report.state_restored);
        assert!(report.message.contains("title"));
        assert!(report.message.starts_with("content_modification"));
        assert_eq!(AcknowledgingHandler::generic().name(), "generic");
    }
}
