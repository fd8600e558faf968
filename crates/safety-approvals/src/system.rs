//! Per-user approval queue.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use safety_types::{ActionData, ApprovalId, BoundedLog};
use tracing::{debug, info, instrument, warn};

use crate::config::ApprovalConfig;
use crate::error::{ApprovalError, Result};
use crate::types::{ApprovalDecision, ApprovalRequest, ApprovalStatistics, ApprovalStatus};

struct ApprovalState {
    pending: HashMap<ApprovalId, ApprovalRequest>,
    history: BoundedLog<ApprovalRequest>,
}

impl ApprovalState {
    fn expire(&mut self, approval_id: &ApprovalId, now: DateTime<Utc>) {
        if let Some(mut request) = self.pending.remove(approval_id) {
            request.status = ApprovalStatus::Expired;
            request.decided_at = Some(now);
            self.history.push(request);
        }
    }
}

/// Human approval workflow for one user.
///
/// Requests leave the pending set exactly once: by decision, by being found
/// expired at decision time, or by [`ApprovalSystem::expire_stale`].
pub struct ApprovalSystem {
    user_id: String,
    config: ApprovalConfig,
    state: Mutex<ApprovalState>,
}

impl ApprovalSystem {
    pub fn new(user_id: impl Into<String>, config: ApprovalConfig) -> Self {
        let history = BoundedLog::new(config.history_capacity);
        Self {
            user_id: user_id.into(),
            config,
            state: Mutex::new(ApprovalState {
                pending: HashMap::new(),
                history,
            }),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Queue an action for human review.
    pub fn request_approval(&self, action_data: ActionData) -> ApprovalRequest {
        self.request_approval_at(action_data, Utc::now())
    }

    #[instrument(skip(self, action_data), fields(user_id = %self.user_id))]
    pub fn request_approval_at(&self, action_data: ActionData, now: DateTime<Utc>) -> ApprovalRequest {
        let request = ApprovalRequest {
            approval_id: ApprovalId::generate(),
            action_data,
            requested_at: now,
            expires_at: now
                .checked_add_signed(self.config.ttl())
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            status: ApprovalStatus::Pending,
            decided_at: None,
            user_comments: None,
        };

        self.state
            .lock()
            .pending
            .insert(request.approval_id.clone(), request.clone());

        info!(approval_id = %request.approval_id, expires_at = %request.expires_at, "Approval requested");
        request
    }

    /// Record a human decision.
    pub fn approve_action(
        &self,
        approval_id: &ApprovalId,
        decision: &str,
        user_comments: Option<String>,
    ) -> Result<ApprovalStatus> {
        self.approve_action_at(approval_id, decision, user_comments, Utc::now())
    }

    /// Record a human decision as of `now`.
    ///
    /// Expiry is checked before the decision string, so an expired request
    /// always leaves the pending set. An unrecognized decision leaves the
    /// request pending.
    #[instrument(skip(self, user_comments), fields(user_id = %self.user_id, approval_id = %approval_id))]
    pub fn approve_action_at(
        &self,
        approval_id: &ApprovalId,
        decision: &str,
        user_comments: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<ApprovalStatus> {
        let mut state = self.state.lock();

        let expired = match state.pending.get(approval_id) {
            None => {
                warn!("Decision for unknown approval");
                return Err(ApprovalError::NotFound(approval_id.clone()));
            }
            Some(request) => request.is_expired_at(now),
        };
        if expired {
            state.expire(approval_id, now);
            warn!("Decision arrived after expiry");
            return Err(ApprovalError::Expired(approval_id.clone()));
        }

        let decision: ApprovalDecision = decision.parse()?;
        let status = ApprovalStatus::from(decision);

        if let Some(mut request) = state.pending.remove(approval_id) {
            request.status = status;
            request.decided_at = Some(now);
            request.user_comments = user_comments;
            state.history.push(request);
        }

        info!(status = %status, "Approval decided");
        Ok(status)
    }

    /// Move every pending request past its expiry into history.
    pub fn expire_stale(&self) -> usize {
        self.expire_stale_at(Utc::now())
    }

    pub fn expire_stale_at(&self, now: DateTime<Utc>) -> usize {
        let mut state = self.state.lock();
        let mut stale: Vec<(DateTime<Utc>, ApprovalId)> = state
            .pending
            .values()
            .filter(|request| request.is_expired_at(now))
            .map(|request| (request.requested_at, request.approval_id.clone()))
            .collect();
        stale.sort_by_key(|(requested_at, _)| *requested_at);

        for (_, approval_id) in &stale {
            state.expire(approval_id, now);
        }
        if !stale.is_empty() {
            debug!(user_id = %self.user_id, expired = stale.len(), "Expired stale approvals");
        }
        stale.len()
    }

    /// Pending requests, oldest first.
    pub fn get_pending_approvals(&self) -> Vec<ApprovalRequest> {
        let state = self.state.lock();
        let mut pending: Vec<ApprovalRequest> = state.pending.values().cloned().collect();
        pending.sort_by_key(|request| request.requested_at);
        pending
    }

    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// The most recent `limit` resolved requests, oldest first.
    pub fn get_approval_history(&self, limit: usize) -> Vec<ApprovalRequest> {
        self.state.lock().history.recent(limit)
    }

    pub fn get_approval_statistics(&self) -> ApprovalStatistics {
        let state = self.state.lock();
        let count = |status: ApprovalStatus| {
            state
                .history
                .iter()
                .filter(|request| request.status == status)
                .count()
        };

        let total_decisions = state.history.len();
        let approved = count(ApprovalStatus::Approved);
        let approval_rate = if total_decisions == 0 {
            0.0
        } else {
            approved as f64 / total_decisions as f64
        };

        ApprovalStatistics {
            total_decisions,
            approved,
            rejected: count(ApprovalStatus::Rejected),
            expired: count(ApprovalStatus::Expired),
            approval_rate,
            pending_count: state.pending.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn action() -> ActionData {
        json!({"action_type": "strategy_change", "risk_score": 0.9})
            .as_object()
            .cloned()
            .unwrap()
    }

    fn system() -> ApprovalSystem {
        ApprovalSystem::new("u1", ApprovalConfig::default())
    }

    #[test]
    fn request_is_pending_for_a_day() {
        let s = system();
        let now = Utc::now();
        let request = s.request_approval_at(action(), now);
        assert_eq!(request.status, ApprovalStatus::Pending);
        assert_eq!(request.expires_at - request.requested_at, Duration::hours(24));
        assert!(request.approval_id.as_str().starts_with("approval-"));
        assert_eq!(s.get_pending_approvals().len(), 1);
    }

    #[test]
    fn decision_moves_request_to_history() {
        let s = system();
        let request = s.request_approval(action());
        let status = s
            .approve_action(&request.approval_id, "approved", Some("looks fine".into()))
            .unwrap();
        assert_eq!(status, ApprovalStatus::Approved);
        assert_eq!(s.pending_count(), 0);

        let history = s.get_approval_history(10);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].user_comments.as_deref(), Some("looks fine"));
        assert!(history[0].decided_at.is_some());

        assert!(matches!(
            s.approve_action(&request.approval_id, "approved", None),
            Err(ApprovalError::NotFound(_))
        ));
    }

    #[test]
    fn expired_request_leaves_pending() {
        let s = system();
        let now = Utc::now();
        let request = s.request_approval_at(action(), now);
        let err = s
            .approve_action_at(
                &request.approval_id,
                "approved",
                None,
                now + Duration::hours(25),
            )
            .unwrap_err();
        assert_eq!(err.to_string(), "expired");
        assert_eq!(s.pending_count(), 0);
        assert_eq!(s.get_approval_history(1)[0].status, ApprovalStatus::Expired);
    }

    #[test]
    fn invalid_decision_keeps_request_pending() {
        let s = system();
        let request = s.request_approval(action());
        let err = s
            .approve_action(&request.approval_id, "maybe", None)
            .unwrap_err();
        assert!(matches!(err, ApprovalError::InvalidDecision(_)));
        assert_eq!(s.pending_count(), 1);
        assert!(s.get_approval_history(10).is_empty());
    }

    #[test]
    fn sweep_expires_only_stale_requests() {
        let s = system();
        let now = Utc::now();
        s.request_approval_at(action(), now - Duration::hours(30));
        s.request_approval_at(action(), now - Duration::hours(26));
        let fresh = s.request_approval_at(action(), now - Duration::hours(1));

        assert_eq!(s.expire_stale_at(now), 2);
        let pending = s.get_pending_approvals();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].approval_id, fresh.approval_id);

        let stats = s.get_approval_statistics();
        assert_eq!(stats.expired, 2);
        assert_eq!(stats.pending_count, 1);
        assert_eq!(s.expire_stale_at(now), 0);
    }

    #[test]
    fn statistics_compute_approval_rate() {
        let s = system();
        assert_eq!(s.get_approval_statistics().approval_rate, 0.0);

        for decision in ["approved", "approved", "approved", "rejected", "rejected"] {
            let request = s.request_approval(action());
            s.approve_action(&request.approval_id, decision, None).unwrap();
        }
        let stats = s.get_approval_statistics();
        assert_eq!(stats.total_decisions, 5);
        assert_eq!(stats.approved, 3);
        assert_eq!(stats.rejected, 2);
        assert!((stats.approval_rate - 0.6).abs() < 1e-12);
    }

    #[test]
    fn history_is_bounded() {
        let s = ApprovalSystem::new(
            "u1",
            ApprovalConfig {
                history_capacity: 3,
                ..ApprovalConfig::default()
            },
        );
        for _ in 0..5 {
            let request = s.request_approval(action());
            s.approve_action(&request.approval_id, "rejected", None).unwrap();
        }
        assert_eq!(s.get_approval_history(10).len(), 3);
        assert_eq!(s.get_approval_statistics().total_decisions, 3);
    }
}
