//! Reference storage backends.

pub mod memory;

use crate::types::{RefId, Reference};

/// Storage for the references of one analysis unit.
///
/// Implementations must iterate deterministically.
pub trait ReferenceStore {
    /// Fetch a reference by identifier.
    fn get(&self, id: &RefId) -> Option<&Reference>;

    /// Number of references.
    fn len(&self) -> usize;

    /// Whether the store holds no references.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutable iteration over every reference.
    fn references_mut(&mut self) -> Box<dyn Iterator<Item = &mut Reference> + '_>;

    /// The underlying declaration of `reference`, if it has one in this store.
    fn declaration_of(&self, reference: &Reference) -> Option<&Reference> {
        reference.declaration.as_ref().and_then(|id| self.get(id))
    }
}

pub use memory::{InMemoryReferenceStore, StoreError};
