//! End-to-end behavior of the safety service.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use safety_rollback::{RollbackError, RollbackReport};
use safety_service::{
    ActionCategory, ActionCheckpoint, ActionData, ApprovalId, ApprovalStatus, RiskLevel,
    RollbackHandler, SafetyConfig, SafetyRegistry, SafetyService,
};
use serde_json::{json, Map, Value};

fn data(value: Value) -> ActionData {
    value.as_object().cloned().unwrap()
}

fn service() -> SafetyService {
    SafetyService::new(SafetyConfig::default())
}

struct RecordingHandler {
    calls: AtomicUsize,
    fail: bool,
}

impl RecordingHandler {
    fn new(fail: bool) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail,
        })
    }
}

#[async_trait]
impl RollbackHandler for RecordingHandler {
    fn name(&self) -> &str {
        "social-api"
    }

    async fn rollback(
        &self,
        checkpoint: &ActionCheckpoint,
    ) -> safety_rollback::Result<RollbackReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RollbackError::handler_failed(
                "social-api",
                "post already deleted upstream",
            ));
        }
        Ok(RollbackReport {
            message: format!("deleted post for {}", checkpoint.action_type),
            state_restored: true,
        })
    }
}

#[test]
fn high_risk_strategy_change_requires_approval() {
    let service = service();
    let verdict = service.validate_agent_action(
        "u1",
        &data(json!({
            "action_type": "strategy_change",
            "risk_score": 0.9,
            "impact_score": 0.9,
        })),
    );
    assert!(!verdict.is_valid);
    assert!(verdict.requires_approval);
    assert_eq!(verdict.risk_level, RiskLevel::Critical);
}

#[test]
fn combined_score_boundaries_are_inclusive() {
    let service = service();
    let verdict = service.validate_agent_action(
        "u1",
        &data(json!({"action_type": "noop", "risk_score": 1.0, "impact_score": 0.5})),
    );
    assert_eq!(verdict.risk_level, RiskLevel::Critical);

    let verdict = service.validate_agent_action(
        "u2",
        &data(json!({"action_type": "noop", "risk_score": 0.79999, "impact_score": 0.79999})),
    );
    assert_eq!(verdict.risk_level, RiskLevel::High);
}

#[test]
fn malformed_action_fails_closed() {
    let service = service();
    let verdict = service.validate_agent_action(
        "u1",
        &data(json!({"action_type": "optimize_content", "impact_score": "huge"})),
    );
    assert!(!verdict.is_valid);
    assert_eq!(verdict.confidence_score, 0.0);
    assert_eq!(verdict.risk_level, RiskLevel::Critical);
    assert!(verdict.requires_approval);
    assert!(verdict.deny_reason.is_some());
}

#[test]
fn rate_counters_are_per_user() {
    let service = service();
    for i in 0..10 {
        service.validate_agent_action(
            "busy",
            &data(json!({"action_type": format!("publish_post_{}", i), "risk_score": 0.1, "impact_score": 0.1})),
        );
    }
    let other = service.validate_agent_action(
        "quiet",
        &data(json!({"action_type": "publish_post_x", "risk_score": 0.1, "impact_score": 0.1})),
    );
    assert!(other.is_valid, "{:?}", other.violations);

    let busy = service.validate_agent_action(
        "busy",
        &data(json!({"action_type": "publish_post_x", "risk_score": 0.1, "impact_score": 0.1})),
    );
    assert!(!busy.is_valid);
}

#[test]
fn checkpoint_is_listed_with_its_action() {
    let service = service();
    let id = service.create_action_checkpoint(
        "u1",
        data(json!({"action_type": "optimize_content", "agent_id": "seo-agent", "action_id": "act-7"})),
        data(json!({"body": "original copy"})),
    );

    let safety = service.registry().get("u1").unwrap();
    let checkpoints = safety.rollback.get_checkpoints(1);
    assert_eq!(checkpoints.len(), 1);
    assert_eq!(checkpoints[0].checkpoint_id, id);
    assert_eq!(checkpoints[0].action_type, "optimize_content");
    assert_eq!(checkpoints[0].agent_id.as_deref(), Some("seo-agent"));
}

#[tokio::test]
async fn default_rollback_acknowledges_without_restoring() {
    let service = service();
    let id = service.create_action_checkpoint(
        "u1",
        data(json!({"action_type": "optimize_content"})),
        Map::new(),
    );
    let outcome = service.rollback_to_checkpoint("u1", &id).await;
    assert!(outcome.success);
    assert!(!outcome.state_restored);

    let missing = service
        .rollback_to_checkpoint("u1", &safety_service::CheckpointId::new("nope"))
        .await;
    assert!(!missing.success);
    assert!(missing.error.is_some());
}

#[tokio::test]
async fn injected_rollback_handler_is_used_and_failures_reported() {
    let working = RecordingHandler::new(false);
    let failing = RecordingHandler::new(true);
    let registry = SafetyRegistry::new(SafetyConfig::default())
        .with_rollback_handler(ActionCategory::SocialAmplification, working.clone())
        .with_rollback_handler(ActionCategory::SeoOptimization, failing.clone());
    let service = SafetyService::with_registry(registry);

    let posted = service.create_action_checkpoint(
        "u1",
        data(json!({"action_type": "share_on_linkedin"})),
        Map::new(),
    );
    let outcome = service.rollback_to_checkpoint("u1", &posted).await;
    assert!(outcome.success);
    assert!(outcome.state_restored);
    assert_eq!(outcome.handler.as_deref(), Some("social-api"));
    assert_eq!(working.calls.load(Ordering::SeqCst), 1);

    let tagged = service.create_action_checkpoint(
        "u1",
        data(json!({"action_type": "anything", "action_category": "seo_optimization"})),
        Map::new(),
    );
    let outcome = service.rollback_to_checkpoint("u1", &tagged).await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("post already deleted upstream"));
    assert_eq!(failing.calls.load(Ordering::SeqCst), 1);

    let history = service
        .registry()
        .get("u1")
        .unwrap()
        .rollback
        .get_rollback_history(10);
    assert_eq!(history.len(), 2);
}

#[test]
fn approval_round_trip() {
    let service = service();
    let action = data(json!({"action_type": "strategy_change", "risk_score": 0.9, "impact_score": 0.9}));
    let requested = service.request_user_approval("u1", action);
    assert!(requested.success);
    assert_eq!(requested.status, ApprovalStatus::Pending);

    let decided = service.approve_action("u1", &requested.approval_id, "approved", Some("ok".into()));
    assert!(decided.success);
    assert_eq!(decided.status, Some(ApprovalStatus::Approved));

    let again = service.approve_action("u1", &requested.approval_id, "approved", None);
    assert!(!again.success);
    assert_eq!(again.error.as_deref(), Some("not found"));

    let unknown = service.approve_action("u2", &ApprovalId::new("approval-missing"), "approved", None);
    assert_eq!(unknown.error.as_deref(), Some("not found"));
}

#[test]
fn invalid_decision_keeps_request_pending() {
    let service = service();
    let requested = service.request_user_approval("u1", data(json!({"action_type": "x"})));
    let outcome = service.approve_action("u1", &requested.approval_id, "perhaps", None);
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("invalid decision"));

    let safety = service.registry().get("u1").unwrap();
    assert_eq!(safety.approvals.pending_count(), 1);
}

#[test]
fn expired_approval_is_reported_and_leaves_pending() {
    let service = service();
    let safety = service.registry().get_or_create("u1");
    let past = Utc::now() - Duration::hours(30);
    let request = safety
        .approvals
        .request_approval_at(data(json!({"action_type": "competitor_reply"})), past);

    let outcome = service.approve_action("u1", &request.approval_id, "approved", None);
    assert!(!outcome.success);
    assert_eq!(outcome.error.as_deref(), Some("expired"));
    assert_eq!(safety.approvals.pending_count(), 0);
    assert_eq!(safety.approvals.get_approval_statistics().expired, 1);
}

#[test]
fn maintenance_sweeps_approvals_and_idle_users() {
    let service = service();
    let start = Utc::now();

    let waiting = service.registry().get_or_create_at("waiting", start);
    waiting
        .approvals
        .request_approval_at(data(json!({"action_type": "strategy_change"})), start);
    service.registry().get_or_create_at("idle", start);

    let report = service.run_maintenance_at(start + Duration::hours(12));
    assert_eq!(report.expired_approvals, 0);
    assert_eq!(report.evicted_users, 0);

    let report = service.run_maintenance_at(start + Duration::hours(26));
    assert_eq!(report.expired_approvals, 1);
    // "waiting" lost its pending approval in the same pass, so both go
    assert_eq!(report.evicted_users, 2);
    assert!(service.registry().is_empty());
}

#[test]
fn approval_rate_over_mixed_decisions() {
    let service = service();
    for decision in ["approved", "rejected", "approved", "rejected", "approved"] {
        let requested = service.request_user_approval("u1", data(json!({"action_type": "x"})));
        assert!(service
            .approve_action("u1", &requested.approval_id, decision, None)
            .success);
    }
    let stats = service
        .registry()
        .get("u1")
        .unwrap()
        .approvals
        .get_approval_statistics();
    assert_eq!(stats.total_decisions, 5);
    assert!((stats.approval_rate - 0.6).abs() < 1e-12);
}

#[test]
fn registry_evicts_at_capacity() {
    let mut config = SafetyConfig::default();
    config.registry.max_users = 3;
    let service = SafetyService::new(config);
    for user in ["a", "b", "c", "d"] {
        service.validate_agent_action(user, &data(json!({"action_type": "noop"})));
    }
    assert_eq!(service.registry().len(), 3);
    assert!(!service.registry().contains("a"));
}

#[test]
fn concurrent_validations_cannot_both_pass_a_limit() {
    let service = service();
    let handles: Vec<_> = (0..8)
        .map(|t| {
            let service = service.clone();
            std::thread::spawn(move || {
                (0..5)
                    .map(|i| {
                        service
                            .validate_agent_action(
                                "shared",
                                &data(json!({
                                    "action_type": format!("tweet_{}_{}", t, i),
                                    "risk_score": 0.1,
                                    "impact_score": 0.1,
                                })),
                            )
                            .violations
                            .is_empty()
                    })
                    .filter(|clean| *clean)
                    .count()
            })
        })
        .collect();

    let clean: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    // social_amplification_limit allows 3 per hour
    assert_eq!(clean, 3);
}
