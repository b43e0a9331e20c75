//! SeverityPolicy v1: a default status with per-position and per-reference
//! downgrades to WARNING.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::canonical::canonical_hash_hex;
use crate::types::{Constraint, FailureStatus, RefId};
use crate::DEFAULT_POLICY_VERSION;
use super::SeverityPolicy;

/// Severity policy version 1.
///
/// ## Parameters
///
/// - `default_status`: status of every constraint not matched below
/// - `warning_positions`: source positions whose constraints are tolerated
/// - `warning_references`: constraints touching any of these references,
///   on either side, are tolerated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityPolicyV1 {
    /// Policy version identifier.
    #[serde(default = "default_version")]
    pub version: String,
    /// Status for unmatched constraints.
    #[serde(default = "default_status")]
    pub default_status: FailureStatus,
    /// Positions downgraded to WARNING.
    #[serde(default)]
    pub warning_positions: BTreeSet<u32>,
    /// References whose constraints are downgraded to WARNING.
    #[serde(default)]
    pub warning_references: BTreeSet<RefId>,
}

fn default_version() -> String {
    DEFAULT_POLICY_VERSION.to_string()
}

fn default_status() -> FailureStatus {
    FailureStatus::Error
}

impl SeverityPolicyV1 {
    /// A policy assigning `status` to every constraint.
    pub fn uniform(status: FailureStatus) -> Self {
        Self {
            version: default_version(),
            default_status: status,
            warning_positions: BTreeSet::new(),
            warning_references: BTreeSet::new(),
        }
    }

    /// Tolerate failures at `position`.
    pub fn warn_at(mut self, position: u32) -> Self {
        self.warning_positions.insert(position);
        self
    }

    /// Tolerate failures of constraints touching `reference`.
    pub fn warn_on(mut self, reference: impl Into<RefId>) -> Self {
        self.warning_references.insert(reference.into());
        self
    }

    /// Get the policy ID.
    pub fn policy_id(&self) -> &str {
        &self.version
    }

    /// Hash of the policy parameters.
    pub fn params_hash(&self) -> String {
        canonical_hash_hex(self)
    }
}

impl Default for SeverityPolicyV1 {
    fn default() -> Self {
        Self::uniform(FailureStatus::Error)
    }
}

impl SeverityPolicy for SeverityPolicyV1 {
    fn failure_status(&self, constraint: &Constraint) -> FailureStatus {
        if self.warning_positions.contains(&constraint.position)
            || self.warning_references.contains(&constraint.left)
            || self.warning_references.contains(&constraint.right)
        {
            return FailureStatus::Warning;
        }
        self.default_status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_error() {
        let policy = SeverityPolicyV1::default();
        assert_eq!(policy.failure_status(&Constraint::new("a", "b", 3)), FailureStatus::Error);
        assert_eq!(policy.policy_id(), DEFAULT_POLICY_VERSION);
    }

    #[test]
    fn test_downgrades() {
        let policy = SeverityPolicyV1::default().warn_at(9).warn_on("tmp");

        assert_eq!(policy.failure_status(&Constraint::new("a", "b", 9)), FailureStatus::Warning);
        assert_eq!(policy.failure_status(&Constraint::new("a", "tmp", 1)), FailureStatus::Warning);
        assert_eq!(policy.failure_status(&Constraint::new("tmp", "b", 1)), FailureStatus::Warning);
        assert_eq!(policy.failure_status(&Constraint::new("a", "b", 1)), FailureStatus::Error);
    }

    #[test]
    fn test_params_hash_changes() {
        let p1 = SeverityPolicyV1::default();
        let p2 = SeverityPolicyV1::default().warn_at(4);

        assert_eq!(p1.params_hash(), SeverityPolicyV1::default().params_hash());
        assert_ne!(p1.params_hash(), p2.params_hash());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let policy: SeverityPolicyV1 = serde_json::from_str(r#"{"warning_positions": [2]}"#).unwrap();
        assert_eq!(policy.default_status, FailureStatus::Error);
        assert!(policy.warning_positions.contains(&2));
    }
}
