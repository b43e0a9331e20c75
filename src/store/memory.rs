//! In-memory reference store.

use std::collections::BTreeMap;

use crate::types::{ConstraintSet, RefId, Reference};
use super::ReferenceStore;

/// Error type for the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// A constraint names an identifier the store does not hold.
    #[error("Constraint at position {position} names unknown reference: {id}")]
    DanglingReference {
        /// The missing identifier.
        id: RefId,
        /// Position of the offending constraint.
        position: u32,
    },
    /// A declaration link names an identifier the store does not hold.
    #[error("Reference {reference} declares unknown reference: {id}")]
    DanglingDeclaration {
        /// The referencing identifier.
        reference: RefId,
        /// The missing identifier.
        id: RefId,
    },
}

/// In-memory reference store.
///
/// Uses a BTreeMap so iteration follows identifier order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReferenceStore {
    references: BTreeMap<RefId, Reference>,
}

impl InMemoryReferenceStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reference, returning the one it replaced, if any.
    pub fn add_reference(&mut self, reference: Reference) -> Option<Reference> {
        self.references.insert(reference.id.clone(), reference)
    }

    /// Get all references in identifier order.
    pub fn all_references(&self) -> impl Iterator<Item = &Reference> {
        self.references.values()
    }

    /// Check that every constraint side and declaration link is present.
    pub fn validate_constraints(&self, constraints: &ConstraintSet) -> Result<(), StoreError> {
        for c in constraints {
            for id in [&c.left, &c.right] {
                if !self.references.contains_key(id) {
                    return Err(StoreError::DanglingReference {
                        id: id.clone(),
                        position: c.position,
                    });
                }
            }
        }
        for r in self.references.values() {
            let linked = r.declaration.iter().chain(r.kind.adapted_declaration());
            for id in linked {
                if !self.references.contains_key(id) {
                    return Err(StoreError::DanglingDeclaration {
                        reference: r.id.clone(),
                        id: id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl FromIterator<Reference> for InMemoryReferenceStore {
    fn from_iter<I: IntoIterator<Item = Reference>>(iter: I) -> Self {
        let mut store = Self::new();
        for r in iter {
            store.add_reference(r);
        }
        store
    }
}

impl ReferenceStore for InMemoryReferenceStore {
    fn get(&self, id: &RefId) -> Option<&Reference> {
        self.references.get(id)
    }

    fn len(&self) -> usize {
        self.references.len()
    }

    fn references_mut(&mut self) -> Box<dyn Iterator<Item = &mut Reference> + '_> {
        Box::new(self.references.values_mut())
    }
}
