//! Per-user checkpoint store and rollback dispatcher.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use safety_types::{ActionCategory, ActionData, BoundedLog, CheckpointId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::checkpoint::{base_checkpoint_id, ActionCheckpoint};
use crate::config::RollbackConfig;
use crate::error::RollbackError;
use crate::handler::{AcknowledgingHandler, RollbackHandler};

/// Categories that get a dedicated handler out of the box.
const BUILT_IN_CATEGORIES: [ActionCategory; 4] = [
    ActionCategory::ContentModification,
    ActionCategory::SeoOptimization,
    ActionCategory::CompetitorResponse,
    ActionCategory::SocialAmplification,
];

/// Result of one rollback attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackOutcome {
    pub success: bool,

    pub checkpoint_id: CheckpointId,

    /// Handler that ran, if the checkpoint was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Whether downstream state is known to be back
    pub state_restored: bool,

    pub attempted_at: DateTime<Utc>,
}

impl RollbackOutcome {
    fn failed(checkpoint_id: CheckpointId, handler: Option<String>, error: &RollbackError) -> Self {
        Self {
            success: false,
            checkpoint_id,
            handler,
            message: None,
            error: Some(error.to_string()),
            state_restored: false,
            attempted_at: Utc::now(),
        }
    }
}

struct RollbackState {
    checkpoints: BoundedLog<ActionCheckpoint>,
    history: BoundedLog<RollbackOutcome>,
    /// Base id most recently issued and the next suffix for it
    last_base: Option<String>,
    next_sequence: u32,
}

impl RollbackState {
    /// Issue a unique id for `base`. The suffix counter survives eviction,
    /// so an id handed out earlier is never reissued while its second lasts.
    fn next_checkpoint_id(&mut self, base: String) -> CheckpointId {
        if self.last_base.as_deref() != Some(base.as_str()) {
            self.last_base = Some(base.clone());
            self.next_sequence = 0;
        }

        loop {
            let sequence = self.next_sequence;
            self.next_sequence += 1;
            let candidate = if sequence == 0 {
                base.clone()
            } else {
                format!("{}-{}", base, sequence)
            };
            let live = self
                .checkpoints
                .iter()
                .any(|cp| cp.checkpoint_id.as_str() == candidate);
            if !live {
                return CheckpointId::new(candidate);
            }
        }
    }
}

/// Captures checkpoints for one user and undoes actions on request.
///
/// Handlers run without the state lock held.
pub struct RollbackManager {
    user_id: String,
    state: Mutex<RollbackState>,
    handlers: HashMap<ActionCategory, Arc<dyn RollbackHandler>>,
    fallback: Arc<dyn RollbackHandler>,
}

impl RollbackManager {
    /// Create a manager with acknowledging handlers installed.
    pub fn new(user_id: impl Into<String>, config: RollbackConfig) -> Self {
        let handlers = BUILT_IN_CATEGORIES
            .into_iter()
            .map(|category| {
                let handler: Arc<dyn RollbackHandler> =
                    Arc::new(AcknowledgingHandler::for_category(category));
                (category, handler)
            })
            .collect();

        Self {
            user_id: user_id.into(),
            state: Mutex::new(RollbackState {
                checkpoints: BoundedLog::new(config.checkpoint_capacity),
                history: BoundedLog::new(config.history_capacity),
                last_base: None,
                next_sequence: 0,
            }),
            handlers,
            fallback: Arc::new(AcknowledgingHandler::generic()),
        }
    }

    /// Install the handler for `category`, replacing any previous one.
    pub fn with_handler(mut self, category: ActionCategory, handler: Arc<dyn RollbackHandler>) -> Self {
        self.handlers.insert(category, handler);
        self
    }

    /// Install the handler used when no category handler applies.
    pub fn with_fallback_handler(mut self, handler: Arc<dyn RollbackHandler>) -> Self {
        self.fallback = handler;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Record a checkpoint now.
    pub fn create_checkpoint(
        &self,
        action_data: ActionData,
        system_state: Map<String, Value>,
    ) -> CheckpointId {
        self.create_checkpoint_at(action_data, system_state, Utc::now())
    }

    /// Record a checkpoint as of `now`.
    ///
    /// Ids carry the creation second; a `-N` suffix keeps ids created within
    /// the same second distinct, including ids whose checkpoints were evicted.
    #[instrument(skip(self, action_data, system_state), fields(user_id = %self.user_id))]
    pub fn create_checkpoint_at(
        &self,
        action_data: ActionData,
        system_state: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> CheckpointId {
        let mut state = self.state.lock();

        let checkpoint_id = state.next_checkpoint_id(base_checkpoint_id(&self.user_id, now));

        let checkpoint = ActionCheckpoint::new(
            checkpoint_id.clone(),
            &self.user_id,
            action_data,
            system_state,
            now,
        );
        let action_type = checkpoint.action_type.clone();
        if let Some(evicted) = state.checkpoints.push(checkpoint) {
            debug!(checkpoint_id = %evicted.checkpoint_id, "Evicted oldest checkpoint");
        }

        info!(checkpoint_id = %checkpoint_id, action_type = %action_type, "Checkpoint created");
        checkpoint_id
    }

    /// Undo the action behind `checkpoint_id`.
    ///
    /// Never fails: unknown ids and handler errors come back as unsuccessful
    /// outcomes. Every completed attempt is recorded. The history entry is
    /// written after the handler returns, so an attempt whose future is
    /// dropped mid-handler is not recorded.
    #[instrument(skip(self), fields(user_id = %self.user_id, checkpoint_id = %checkpoint_id))]
    pub async fn rollback_to_checkpoint(&self, checkpoint_id: &CheckpointId) -> RollbackOutcome {
        let checkpoint = {
            let state = self.state.lock();
            let found = state
                .checkpoints
                .iter()
                .find(|cp| &cp.checkpoint_id == checkpoint_id)
                .cloned();
            found
        };

        let outcome = match checkpoint {
            None => {
                let err = RollbackError::NotFound(checkpoint_id.clone());
                warn!(error = %err, "Rollback requested for unknown checkpoint");
                RollbackOutcome::failed(checkpoint_id.clone(), None, &err)
            }
            Some(checkpoint) => {
                let handler = self.handler_for(&checkpoint);
                let handler_name = handler.name().to_string();
                match handler.rollback(&checkpoint).await {
                    Ok(report) => {
                        info!(
                            handler = %handler_name,
                            state_restored = report.state_restored,
                            "Rollback completed"
                        );
                        RollbackOutcome {
                            success: true,
                            checkpoint_id: checkpoint_id.clone(),
                            handler: Some(handler_name),
                            message: Some(report.message),
                            error: None,
                            state_restored: report.state_restored,
                            attempted_at: Utc::now(),
                        }
                    }
                    Err(err) => {
                        warn!(handler = %handler_name, error = %err, "Rollback failed");
                        RollbackOutcome::failed(checkpoint_id.clone(), Some(handler_name), &err)
                    }
                }
            }
        };

        self.state.lock().history.push(outcome.clone());
        outcome
    }

    /// Roll back the `count` most recent checkpoints, newest first.
    pub async fn rollback_latest_actions(&self, count: usize) -> Vec<RollbackOutcome> {
        let ids: Vec<CheckpointId> = {
            let state = self.state.lock();
            let ids = state
                .checkpoints
                .iter()
                .rev()
                .take(count)
                .map(|cp| cp.checkpoint_id.clone())
                .collect();
            ids
        };

        let mut outcomes = Vec::with_capacity(ids.len());
        for id in &ids {
            outcomes.push(self.rollback_to_checkpoint(id).await);
        }
        outcomes
    }

    fn handler_for(&self, checkpoint: &ActionCheckpoint) -> Arc<dyn RollbackHandler> {
        checkpoint
            .rollback_category()
            .and_then(|category| self.handlers.get(&category))
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    /// The most recent `limit` checkpoints, oldest first.
    pub fn get_checkpoints(&self, limit: usize) -> Vec<ActionCheckpoint> {
        self.state.lock().checkpoints.recent(limit)
    }

    /// The most recent `limit` rollback attempts, oldest first.
    pub fn get_rollback_history(&self, limit: usize) -> Vec<RollbackOutcome> {
        self.state.lock().history.recent(limit)
    }

    pub fn checkpoint_count(&self) -> usize {
        self.state.lock().checkpoints.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::RollbackReport;
    use crate::Result;
    use async_trait::async_trait;
    use chrono::Duration;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn data(value: Value) -> ActionData {
        value.as_object().cloned().unwrap()
    }

    fn manager() -> RollbackManager {
        RollbackManager::new("u1", RollbackConfig::default())
    }

    struct CountingHandler {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl RollbackHandler for CountingHandler {
        fn name(&self) -> &str {
            "counting"
        }

        async fn rollback(&self, _checkpoint: &ActionCheckpoint) -> Result<RollbackReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RollbackError::handler_failed("counting", "store unavailable"));
            }
            Ok(RollbackReport {
                message: "restored".into(),
                state_restored: true,
            })
        }
    }

    #[test]
    fn checkpoint_is_retrievable() {
        let m = manager();
        m.create_checkpoint(
            data(json!({"action_type": "optimize_content", "agent_id": "writer-1"})),
            data(json!({"title": "Before"})),
        );
        let checkpoints = m.get_checkpoints(1);
        assert_eq!(checkpoints.len(), 1);
        assert_eq!(checkpoints[0].action_type, "optimize_content");
        assert_eq!(checkpoints[0].agent_id.as_deref(), Some("writer-1"));
        assert_eq!(checkpoints[0].user_id, "u1");
    }

    #[test]
    fn same_second_ids_get_a_suffix() {
        let m = manager();
        let now = Utc::now();
        let a = m.create_checkpoint_at(data(json!({"action_type": "a"})), Map::new(), now);
        let b = m.create_checkpoint_at(data(json!({"action_type": "b"})), Map::new(), now);
        let c = m.create_checkpoint_at(data(json!({"action_type": "c"})), Map::new(), now);
        assert_ne!(a, b);
        assert_eq!(b.as_str(), format!("{}-1", a));
        assert_eq!(c.as_str(), format!("{}-2", a));
    }

    #[tokio::test]
    async fn evicted_ids_are_not_reissued_within_the_second() {
        let m = RollbackManager::new(
            "u1",
            RollbackConfig {
                checkpoint_capacity: 2,
                ..RollbackConfig::default()
            },
        );
        let now = Utc::now();
        let first = m.create_checkpoint_at(data(json!({"action_type": "delete_content"})), Map::new(), now);
        let ids: Vec<CheckpointId> = ["publish_article", "update_meta", "publish_article"]
            .into_iter()
            .map(|action_type| {
                m.create_checkpoint_at(data(json!({"action_type": action_type})), Map::new(), now)
            })
            .collect();

        assert!(ids.iter().all(|id| *id != first));
        assert_eq!(ids[2].as_str(), format!("{}-3", first));
        assert_eq!(m.checkpoint_count(), 2);

        let outcome = m.rollback_to_checkpoint(&first).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("not found"));
    }

    #[test]
    fn new_second_restarts_the_suffix() {
        let m = manager();
        let now = Utc::now();
        let a = m.create_checkpoint_at(data(json!({"action_type": "a"})), Map::new(), now);
        m.create_checkpoint_at(data(json!({"action_type": "b"})), Map::new(), now);
        let later = m.create_checkpoint_at(
            data(json!({"action_type": "c"})),
            Map::new(),
            now + Duration::seconds(1),
        );
        assert_ne!(later, a);
        assert!(!later.as_str().contains('-'));
    }

    #[test]
    fn checkpoint_ring_caps_at_capacity() {
        let m = manager();
        let start = Utc::now();
        for i in 0..105 {
            m.create_checkpoint_at(
                data(json!({"action_type": format!("edit_{}", i)})),
                Map::new(),
                start + Duration::seconds(i),
            );
        }
        assert_eq!(m.checkpoint_count(), 100);
        let oldest = &m.get_checkpoints(100)[0];
        assert_eq!(oldest.action_type, "edit_5");
    }

    #[tokio::test]
    async fn unknown_checkpoint_is_reported() {
        let m = manager();
        let outcome = m.rollback_to_checkpoint(&CheckpointId::new("missing")).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("not found"));
        assert_eq!(m.get_rollback_history(10).len(), 1);
    }

    #[tokio::test]
    async fn built_in_handler_acknowledges() {
        let m = manager();
        let id = m.create_checkpoint(
            data(json!({"action_type": "update_meta_description"})),
            data(json!({"meta": "old"})),
        );
        let outcome = m.rollback_to_checkpoint(&id).await;
        assert!(outcome.success);
        assert!(!outcome.state_restored);
        assert_eq!(outcome.handler.as_deref(), Some("seo_optimization"));
    }

    #[tokio::test]
    async fn injected_handler_is_called() {
        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
            fail: false,
        });
        let m = manager().with_handler(ActionCategory::ContentModification, handler.clone());
        let id = m.create_checkpoint(data(json!({"action_type": "rewrite_article"})), Map::new());

        let outcome = m.rollback_to_checkpoint(&id).await;
        assert!(outcome.success);
        assert!(outcome.state_restored);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn handler_failure_is_reported_not_retried() {
        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
            fail: true,
        });
        let m = manager().with_fallback_handler(handler.clone());
        let id = m.create_checkpoint(data(json!({"action_type": "noop"})), Map::new());

        let outcome = m.rollback_to_checkpoint(&id).await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().contains("store unavailable"));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
        assert_eq!(m.get_rollback_history(10)[0].handler.as_deref(), Some("counting"));
    }

    #[tokio::test]
    async fn latest_actions_roll_back_newest_first() {
        let m = manager();
        let start = Utc::now();
        let ids: Vec<_> = (0..3)
            .map(|i| {
                m.create_checkpoint_at(
                    data(json!({"action_type": format!("edit_{}", i)})),
                    Map::new(),
                    start + Duration::seconds(i),
                )
            })
            .collect();

        let outcomes = m.rollback_latest_actions(2).await;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].checkpoint_id, ids[2]);
        assert_eq!(outcomes[1].checkpoint_id, ids[1]);
        assert!(outcomes.iter().all(|o| o.success));
    }

    #[tokio::test]
    async fn rollback_history_caps_at_capacity() {
        let m = RollbackManager::new(
            "u1",
            RollbackConfig {
                history_capacity: 5,
                ..RollbackConfig::default()
            },
        );
        for i in 0..8 {
            m.rollback_to_checkpoint(&CheckpointId::new(format!("gone-{}", i)))
                .await;
        }
        let history = m.get_rollback_history(50);
        assert_eq!(history.len(), 5);
        assert_eq!(history[0].checkpoint_id.as_str(), "gone-3");
    }
}
