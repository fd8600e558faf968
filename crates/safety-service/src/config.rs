//! Service configuration
//!
//! Loaded in layers: built-in defaults, then an optional file, then
//! `SAFETY_`-prefixed environment variables. Nested keys are separated by a
//! double underscore, e.g. `SAFETY_REGISTRY__MAX_USERS=500`.

use std::time::Duration;

use safety_approvals::ApprovalConfig;
use safety_constraints::ConstraintConfig;
use safety_rollback::RollbackConfig;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SafetyConfig {
    /// Constraint engine settings
    #[serde(default)]
    pub constraints: ConstraintConfig,

    /// Checkpoint and rollback settings
    #[serde(default)]
    pub rollback: RollbackConfig,

    /// Approval queue settings
    #[serde(default)]
    pub approvals: ApprovalConfig,

    /// Per-user registry bounds
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Background sweep settings
    #[serde(default)]
    pub maintenance: MaintenanceConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Registry bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Maximum cached users before least-recently-used eviction
    #[serde(default = "default_max_users")]
    pub max_users: usize,

    /// Idle time after which a user without pending approvals is evicted
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
}

impl RegistryConfig {
    pub fn idle_ttl(&self) -> chrono::Duration {
        i64::try_from(self.idle_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_users: default_max_users(),
            idle_ttl_secs: default_idle_ttl_secs(),
        }
    }
}

/// Maintenance task configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceConfig {
    /// Run the background sweep
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Sweep interval in seconds
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl MaintenanceConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_interval_secs(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_users() -> usize {
    10_000
}

fn default_idle_ttl_secs() -> u64 {
    24 * 60 * 60
}

fn default_interval_secs() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl SafetyConfig {
    /// Load configuration from defaults, an optional file and the environment.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Defaults
        builder = builder.add_source(config::Config::try_from(&SafetyConfig::default())?);

        // Optional file
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        }

        // Environment variables with SAFETY_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("SAFETY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: SafetyConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the managers cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.registry.max_users == 0 {
            return Err(ServiceError::InvalidConfig(
                "registry.max_users must be at least 1".into(),
            ));
        }
        if self.maintenance.interval_secs == 0 {
            return Err(ServiceError::InvalidConfig(
                "maintenance.interval_secs must be at least 1".into(),
            ));
        }
        if self.approvals.ttl_hours <= 0 {
            return Err(ServiceError::InvalidConfig(
                "approvals.ttl_hours must be positive".into(),
            ));
        }
        if self.constraints.suspicious_patterns.conflict_window_hours < 0 {
            return Err(ServiceError::InvalidConfig(
                "constraints.suspicious_patterns.conflict_window_hours must not be negative"
                    .into(),
            ));
        }
        for constraint in &self.constraints.custom_constraints {
            constraint.validate()?;
        }
        Ok(())
    }
}
