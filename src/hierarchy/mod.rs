//! Qualifier hierarchy: subtype oracle and maximality order.

pub mod lattice;

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::types::Qualifier;

pub use lattice::{HierarchyError, LatticeConfig, LatticeHierarchy};

/// Subtype oracle and total order over qualifiers.
///
/// `compare` orders qualifiers from most to least permissive: the first
/// element after sorting with it is the maximal one.
pub trait QualifierHierarchy {
    /// Whether `sub <: sup`.
    fn is_subtype(&self, sub: &Qualifier, sup: &Qualifier) -> bool;

    /// Total order, maximal first.
    fn compare(&self, a: &Qualifier, b: &Qualifier) -> Ordering;

    /// The maximal candidate. Ties keep the earliest candidate.
    fn maximal<'a>(&self, candidates: &'a BTreeSet<Qualifier>) -> Option<&'a Qualifier> {
        candidates.iter().min_by(|a, b| self.compare(a, b))
    }
}
