//! Identifier newtypes.

use serde::{Deserialize, Serialize};

/// Identifier of a rollback checkpoint.
///
/// Derived from the owning user and the creation second, so ids sort
/// chronologically per user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckpointId(String);

impl CheckpointId {
    /// Wrap an existing id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CheckpointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CheckpointId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Identifier of a human approval request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalId(String);

impl ApprovalId {
    /// Wrap an existing id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random approval id.
    pub fn generate() -> Self {
        Self(format!("approval-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ApprovalId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_approval_ids_are_unique() {
        let a = ApprovalId::generate();
        let b = ApprovalId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("approval-"));
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = CheckpointId::new("cp_u1_20240101120000");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"cp_u1_20240101120000\"");
    }
}
