//! Per-user action and violation records, and trailing-window counts over them.

use chrono::{DateTime, Duration, Utc};
use safety_types::{ActionCategory, BoundedLog, RiskLevel};
use serde::{Deserialize, Serialize};

/// One evaluated action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub timestamp: DateTime<Utc>,

    /// `None` when the payload had no readable `action_type`
    pub action_type: Option<String>,

    /// `None` on the fail-closed path
    pub category: Option<ActionCategory>,

    pub risk_level: RiskLevel,
    pub is_valid: bool,
    pub requires_approval: bool,
    pub violation_count: usize,
}

/// Violations raised by one evaluated action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub timestamp: DateTime<Utc>,
    pub action_type: Option<String>,
    pub category: Option<ActionCategory>,
    pub risk_level: RiskLevel,
    pub violations: Vec<String>,
}

/// Read-only view of the action history as seen from `now`.
pub(crate) struct ActionWindow<'a> {
    log: &'a BoundedLog<ActionRecord>,
    now: DateTime<Utc>,
}

impl<'a> ActionWindow<'a> {
    pub(crate) fn new(log: &'a BoundedLog<ActionRecord>, now: DateTime<Utc>) -> Self {
        Self { log, now }
    }

    fn within(&self, window: Duration) -> impl Iterator<Item = &'a ActionRecord> {
        let since = self
            .now
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.log
            .iter()
            .filter(move |record| record.timestamp > since)
    }

    /// Past actions of `category` inside the window.
    pub(crate) fn in_category(&self, category: ActionCategory, window: Duration) -> u32 {
        count(self.within(window).filter(|r| r.category == Some(category)))
    }

    /// Past actions with exactly this `action_type` inside the window.
    pub(crate) fn of_type(&self, action_type: &str, window: Duration) -> u32 {
        count(
            self.within(window)
                .filter(|r| r.action_type.as_deref() == Some(action_type)),
        )
    }

    /// Past actions of any kind inside the window.
    pub(crate) fn total(&self, window: Duration) -> u32 {
        count(self.within(window))
    }

    pub(crate) fn contains_type(&self, action_type: &str, window: Duration) -> bool {
        self.within(window)
            .any(|r| r.action_type.as_deref() == Some(action_type))
    }
}

fn count<'a>(records: impl Iterator<Item = &'a ActionRecord>) -> u32 {
    u32::try_from(records.count()).unwrap_or(u32::MAX)
}
