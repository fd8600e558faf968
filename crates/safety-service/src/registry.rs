//! Per-user registry of safety managers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use safety_approvals::ApprovalSystem;
use safety_constraints::ConstraintManager;
use safety_rollback::{RollbackHandler, RollbackManager};
use safety_types::ActionCategory;
use tracing::{debug, info, warn};

use crate::config::SafetyConfig;

/// The three managers owned by one user.
pub struct UserSafety {
    pub constraints: ConstraintManager,
    pub rollback: RollbackManager,
    pub approvals: ApprovalSystem,
}

impl UserSafety {
    fn new(user_id: &str, config: &SafetyConfig, handlers: &RollbackHandlers) -> Self {
        let mut rollback = RollbackManager::new(user_id, config.rollback.clone());
        for (category, handler) in &handlers.by_category {
            rollback = rollback.with_handler(*category, Arc::clone(handler));
        }
        if let Some(fallback) = &handlers.fallback {
            rollback = rollback.with_fallback_handler(Arc::clone(fallback));
        }

        Self {
            constraints: ConstraintManager::new(user_id, config.constraints.clone()),
            rollback,
            approvals: ApprovalSystem::new(user_id, config.approvals.clone()),
        }
    }

    pub fn user_id(&self) -> &str {
        self.constraints.user_id()
    }
}

#[derive(Default, Clone)]
struct RollbackHandlers {
    by_category: HashMap<ActionCategory, Arc<dyn RollbackHandler>>,
    fallback: Option<Arc<dyn RollbackHandler>>,
}

struct RegistryEntry {
    safety: Arc<UserSafety>,
    last_access: DateTime<Utc>,
    /// Monotonic access stamp; orders entries touched within the same instant
    access_seq: u64,
}

/// Lazily creates and caches one [`UserSafety`] per user id.
///
/// Bounded by `max_users`: inserting past capacity evicts the least recently
/// used user, preferring users with no pending approvals. Users idle longer
/// than `idle_ttl` are removed by [`SafetyRegistry::evict_idle`] unless they
/// have pending approvals. Concurrent inserts may briefly overshoot the bound.
pub struct SafetyRegistry {
    config: SafetyConfig,
    handlers: RollbackHandlers,
    entries: DashMap<String, RegistryEntry>,
    access_seq: AtomicU64,
}

impl SafetyRegistry {
    pub fn new(config: SafetyConfig) -> Self {
        Self {
            config,
            handlers: RollbackHandlers::default(),
            entries: DashMap::new(),
            access_seq: AtomicU64::new(0),
        }
    }

    /// Install a rollback handler for every user created from now on.
    pub fn with_rollback_handler(
        mut self,
        category: ActionCategory,
        handler: Arc<dyn RollbackHandler>,
    ) -> Self {
        self.handlers.by_category.insert(category, handler);
        self
    }

    /// Install the fallback rollback handler for every user created from now on.
    pub fn with_fallback_rollback_handler(mut self, handler: Arc<dyn RollbackHandler>) -> Self {
        self.handlers.fallback = Some(handler);
        self
    }

    pub fn config(&self) -> &SafetyConfig {
        &self.config
    }

    /// Managers for `user_id`, created on first use.
    pub fn get_or_create(&self, user_id: &str) -> Arc<UserSafety> {
        self.get_or_create_at(user_id, Utc::now())
    }

    pub fn get_or_create_at(&self, user_id: &str, now: DateTime<Utc>) -> Arc<UserSafety> {
        let seq = self.access_seq.fetch_add(1, Ordering::Relaxed);

        if let Some(mut entry) = self.entries.get_mut(user_id) {
            entry.last_access = now;
            entry.access_seq = seq;
            return Arc::clone(&entry.safety);
        }

        if self.entries.len() >= self.config.registry.max_users {
            self.evict_lru(user_id);
        }

        let entry = self
            .entries
            .entry(user_id.to_string())
            .or_insert_with(|| {
                debug!(user_id, "Creating safety managers");
                RegistryEntry {
                    safety: Arc::new(UserSafety::new(user_id, &self.config, &self.handlers)),
                    last_access: now,
                    access_seq: seq,
                }
            });
        Arc::clone(&entry.safety)
    }

    /// Managers for `user_id` if cached. Does not count as an access.
    pub fn get(&self, user_id: &str) -> Option<Arc<UserSafety>> {
        self.entries.get(user_id).map(|entry| Arc::clone(&entry.safety))
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.entries.contains_key(user_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn user_ids(&self) -> Vec<String> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Snapshot of every cached user's managers.
    pub fn snapshot(&self) -> Vec<Arc<UserSafety>> {
        self.entries
            .iter()
            .map(|entry| Arc::clone(&entry.safety))
            .collect()
    }

    fn evict_lru(&self, incoming: &str) {
        let candidate = |require_idle_queue: bool| {
            self.entries
                .iter()
                .filter(|entry| {
                    !require_idle_queue || entry.safety.approvals.pending_count() == 0
                })
                .min_by_key(|entry| entry.access_seq)
                .map(|entry| entry.key().clone())
        };

        let victim = match candidate(true) {
            Some(user_id) => Some(user_id),
            None => {
                let fallback = candidate(false);
                if let Some(user_id) = &fallback {
                    warn!(
                        user_id = %user_id,
                        "Registry full of users with pending approvals; evicting least recently used"
                    );
                }
                fallback
            }
        };

        if let Some(user_id) = victim {
            self.entries.remove(&user_id);
            info!(evicted = %user_id, incoming, "Evicted least recently used user");
        }
    }

    /// Remove users idle past `idle_ttl` that have no pending approvals.
    pub fn evict_idle(&self) -> usize {
        self.evict_idle_at(Utc::now())
    }

    pub fn evict_idle_at(&self, now: DateTime<Utc>) -> usize {
        let idle_ttl = self.config.registry.idle_ttl();
        let is_idle = |entry: &RegistryEntry| {
            now - entry.last_access > idle_ttl && entry.safety.approvals.pending_count() == 0
        };

        let candidates: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| is_idle(entry.value()))
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = 0;
        for user_id in candidates {
            if self.entries.remove_if(&user_id, |_, entry| is_idle(entry)).is_some() {
                evicted += 1;
            }
        }
        if evicted > 0 {
            info!(evicted, remaining = self.entries.len(), "Evicted idle users");
        }
        evicted
    }
}
