//! Orchestrator-facing entry points and the maintenance task.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use safety_rollback::RollbackOutcome;
use safety_types::{ActionData, ApprovalId, CheckpointId, SafetyValidation};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, instrument};

use crate::config::SafetyConfig;
use crate::outcome::{ApprovalDecisionOutcome, ApprovalRequestOutcome, MaintenanceReport};
use crate::registry::SafetyRegistry;

/// The five operations an orchestrator calls, each scoped by user id.
///
/// Cheap to clone; clones share the registry and the maintenance task.
#[derive(Clone)]
pub struct SafetyService {
    registry: Arc<SafetyRegistry>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl SafetyService {
    pub fn new(config: SafetyConfig) -> Self {
        Self::with_registry(SafetyRegistry::new(config))
    }

    /// Build on a preconfigured registry, e.g. one with rollback handlers installed.
    pub fn with_registry(registry: SafetyRegistry) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            registry: Arc::new(registry),
            shutdown: Arc::new(shutdown),
        }
    }

    pub fn registry(&self) -> &SafetyRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SafetyConfig {
        self.registry.config()
    }

    /// Validate a proposed action. Never fails; errors fail closed.
    #[instrument(skip(self, action_data), fields(user_id = %user_id))]
    pub fn validate_agent_action(&self, user_id: &str, action_data: &ActionData) -> SafetyValidation {
        self.registry
            .get_or_create(user_id)
            .constraints
            .validate_action(action_data)
    }

    /// Record the pre-action state of an action about to run.
    #[instrument(skip(self, action_data, system_state), fields(user_id = %user_id))]
    pub fn create_action_checkpoint(
        &self,
        user_id: &str,
        action_data: ActionData,
        system_state: Map<String, Value>,
    ) -> CheckpointId {
        self.registry
            .get_or_create(user_id)
            .rollback
            .create_checkpoint(action_data, system_state)
    }

    /// Undo an executed action.
    #[instrument(skip(self), fields(user_id = %user_id, checkpoint_id = %checkpoint_id))]
    pub async fn rollback_to_checkpoint(
        &self,
        user_id: &str,
        checkpoint_id: &CheckpointId,
    ) -> RollbackOutcome {
        let safety = self.registry.get_or_create(user_id);
        safety.rollback.rollback_to_checkpoint(checkpoint_id).await
    }

    /// Queue an action for human review.
    #[instrument(skip(self, action_data), fields(user_id = %user_id))]
    pub fn request_user_approval(
        &self,
        user_id: &str,
        action_data: ActionData,
    ) -> ApprovalRequestOutcome {
        let request = self
            .registry
            .get_or_create(user_id)
            .approvals
            .request_approval(action_data);
        ApprovalRequestOutcome::from(&request)
    }

    /// Record a human decision (`approved` or `rejected`).
    #[instrument(skip(self, user_comments), fields(user_id = %user_id, approval_id = %approval_id))]
    pub fn approve_action(
        &self,
        user_id: &str,
        approval_id: &ApprovalId,
        decision: &str,
        user_comments: Option<String>,
    ) -> ApprovalDecisionOutcome {
        self.registry
            .get_or_create(user_id)
            .approvals
            .approve_action(approval_id, decision, user_comments)
            .into()
    }

    /// Expire stale approvals for every cached user, then evict idle users.
    pub fn run_maintenance(&self) -> MaintenanceReport {
        self.run_maintenance_at(Utc::now())
    }

    pub fn run_maintenance_at(&self, now: DateTime<Utc>) -> MaintenanceReport {
        let expired_approvals = self
            .registry
            .snapshot()
            .iter()
            .map(|safety| safety.approvals.expire_stale_at(now))
            .sum();
        let evicted_users = self.registry.evict_idle_at(now);

        let report = MaintenanceReport {
            expired_approvals,
            evicted_users,
        };
        debug!(
            expired_approvals = report.expired_approvals,
            evicted_users = report.evicted_users,
            "Maintenance pass complete"
        );
        report
    }

    /// Run maintenance on the configured interval until [`SafetyService::stop`].
    ///
    /// Returns `None` when maintenance is disabled in the configuration.
    pub fn spawn_maintenance(&self) -> Option<JoinHandle<()>> {
        if !self.config().maintenance.enabled {
            info!("Maintenance task disabled");
            return None;
        }
        self.shutdown.send_replace(false);
        let mut shutdown_rx = self.shutdown.subscribe();
        let service = self.clone();
        let period = self.config().maintenance.interval();

        Some(tokio::spawn(async move {
            info!(interval_secs = period.as_secs(), "Maintenance task started");
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        service.run_maintenance();
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Maintenance task stopped");
        }))
    }

    /// Signal the maintenance task to stop.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }
}
