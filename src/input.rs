//! Analysis input: references, constraints and configuration handed over
//! by the upstream inference pass as one JSON document.
//!
//! ```json
//! {
//!   "hierarchy": { "ranking": ["RND", "DET", "CLEAR"], "edges": [["CLEAR", "DET"], ["DET", "RND"]] },
//!   "policy": { "warning_positions": [42] },
//!   "references": [ { "id": "a", "name": "a", "kind": { "type": "VARIABLE" }, "candidates": ["DET"] } ],
//!   "constraints": [ { "left": "a", "right": "b", "position": 7 } ]
//! }
//! ```
//!
//! `hierarchy` and `policy` are optional and default to the encryption-scheme
//! lattice and an all-ERROR policy. Constraint order is preserved.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

use crate::hierarchy::{HierarchyError, LatticeConfig, LatticeHierarchy};
use crate::policy::SeverityPolicyV1;
use crate::store::InMemoryReferenceStore;
use crate::types::{Constraint, ConstraintSet, RefId, Reference};

/// Error type for loading analysis input.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    /// Reading the input failed.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
    /// The input is not a valid document.
    #[error("Malformed input: {0}")]
    Json(#[from] serde_json::Error),
    /// Two references share an identifier.
    #[error("Duplicate reference identifier: {0}")]
    DuplicateReference(RefId),
    /// The hierarchy configuration is invalid.
    #[error("Invalid hierarchy: {0}")]
    Hierarchy(#[from] HierarchyError),
}

/// Serialized analysis input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisInput {
    /// Qualifier lattice.
    #[serde(default)]
    pub hierarchy: LatticeConfig,
    /// Severity policy.
    #[serde(default)]
    pub policy: SeverityPolicyV1,
    /// All references of the analysis unit.
    #[serde(default)]
    pub references: Vec<Reference>,
    /// All constraints, in iteration order.
    #[serde(default)]
    pub constraints: Vec<Constraint>,
}

/// Analysis input ready for extraction.
#[derive(Debug, Clone)]
pub struct AnalysisUnit {
    /// Qualifier hierarchy.
    pub hierarchy: LatticeHierarchy,
    /// Severity policy.
    pub policy: SeverityPolicyV1,
    /// Reference store.
    pub store: InMemoryReferenceStore,
    /// Constraint collection.
    pub constraints: ConstraintSet,
}

impl AnalysisInput {
    /// Parse an input document.
    pub fn from_json_str(json: &str) -> Result<Self, InputError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse an input document.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Build the hierarchy, store and constraint set.
    pub fn into_unit(self) -> Result<AnalysisUnit, InputError> {
        let hierarchy = LatticeHierarchy::from_config(self.hierarchy)?;

        let mut ids = BTreeSet::new();
        for r in &self.references {
            if !ids.insert(r.id.clone()) {
                return Err(InputError::DuplicateReference(r.id.clone()));
            }
        }

        Ok(AnalysisUnit {
            hierarchy,
            policy: self.policy,
            store: self.references.into_iter().collect(),
            constraints: self.constraints.into(),
        })
    }
}
