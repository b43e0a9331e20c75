//! Subtyping constraints between references.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::reference::RefId;

/// Failure status assigned to a constraint by the severity policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureStatus {
    /// A failed constraint is reported as a violation.
    Error,
    /// A failed constraint is tolerated.
    Warning,
}

impl fmt::Display for FailureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "ERROR"),
            Self::Warning => write!(f, "WARNING"),
        }
    }
}

/// A required subtyping relation `left <: right`.
///
/// Constraints reference, never own, the references they relate.
/// `position` 0 marks a synthetic constraint with no source location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Constraint {
    /// Subtype side.
    pub left: RefId,
    /// Supertype side.
    pub right: RefId,
    /// Source position (line), 0 if synthetic.
    #[serde(default)]
    pub position: u32,
}

impl Constraint {
    /// Create a new constraint.
    pub fn new(left: impl Into<RefId>, right: impl Into<RefId>, position: u32) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            position,
        }
    }

    /// Whether this constraint has no source location.
    pub fn is_synthetic(&self) -> bool {
        self.position == 0
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <: {} @{}", self.left, self.right, self.position)
    }
}

/// Insertion-ordered set of constraints.
///
/// Iteration order is the order constraints were first inserted, which
/// fixes the order of violations, ledger entries and diagnostic lines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Constraint>", into = "Vec<Constraint>")]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
    seen: HashSet<Constraint>,
}

impl ConstraintSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a constraint. Returns `false` if it was already present.
    pub fn insert(&mut self, constraint: Constraint) -> bool {
        if !self.seen.insert(constraint.clone()) {
            return false;
        }
        self.constraints.push(constraint);
        true
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Constraint> {
        self.constraints.iter()
    }

    /// Number of constraints.
    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Check membership.
    pub fn contains(&self, constraint: &Constraint) -> bool {
        self.seen.contains(constraint)
    }
}

impl FromIterator<Constraint> for ConstraintSet {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        let mut set = Self::new();
        for c in iter {
            set.insert(c);
        }
        set
    }
}

impl From<Vec<Constraint>> for ConstraintSet {
    fn from(constraints: Vec<Constraint>) -> Self {
        constraints.into_iter().collect()
    }
}

impl From<ConstraintSet> for Vec<Constraint> {
    fn from(set: ConstraintSet) -> Self {
        set.constraints
    }
}

impl<'a> IntoIterator for &'a ConstraintSet {
    type Item = &'a Constraint;
    type IntoIter = std::slice::Iter<'a, Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
