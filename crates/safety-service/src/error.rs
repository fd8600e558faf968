//! Service error types

use safety_constraints::ConstraintError;
use thiserror::Error;

/// Errors raised while assembling the service
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Configuration could not be loaded or parsed
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration parsed but is unusable
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configured constraint is invalid
    #[error(transparent)]
    Constraint(#[from] ConstraintError),
}

/// Result type for service setup
pub type Result<T> = std::result::Result<T, ServiceError>;
