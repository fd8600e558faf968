//! Rollback manager configuration

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackConfig {
    /// Live checkpoints kept per user; oldest evicted first
    #[serde(default = "default_checkpoint_capacity")]
    pub checkpoint_capacity: usize,

    /// Rollback attempts kept per user
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for RollbackConfig {
    fn default() -> Self {
        Self {
            checkpoint_capacity: default_checkpoint_capacity(),
            history_capacity: default_history_capacity(),
        }
    }
}

fn default_checkpoint_capacity() -> usize {
    100
}

fn default_history_capacity() -> usize {
    50
}
