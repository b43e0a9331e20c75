//! Severity policy: which failed constraints are reported as violations.

pub mod v1;

use crate::types::{Constraint, FailureStatus};

pub use v1::SeverityPolicyV1;

/// Decides the failure status of each constraint.
pub trait SeverityPolicy {
    /// Failure status of `constraint`.
    fn failure_status(&self, constraint: &Constraint) -> FailureStatus;
}
