//! Approval system configuration

use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalConfig {
    /// How long a request stays decidable, in hours
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,

    /// Decided requests kept per user
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl ApprovalConfig {
    pub fn ttl(&self) -> Duration {
        Duration::try_hours(self.ttl_hours).unwrap_or(Duration::MAX)
    }
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            ttl_hours: default_ttl_hours(),
            history_capacity: default_history_capacity(),
        }
    }
}

fn default_ttl_hours() -> i64 {
    24
}

fn default_history_capacity() -> usize {
    100
}
