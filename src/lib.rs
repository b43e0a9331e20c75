//! # maximal-typing
//!
//! Final phase of security-qualifier inference: maximal typing, constraint
//! verification and scheme-conversion extraction.
//!
//! The upstream inference pass leaves every reference with a *set* of
//! candidate qualifiers (encryption schemes) and collects subtyping
//! constraints between references. This crate answers two questions:
//!
//! > Does the program type-check under the maximal assignment?
//! > Which values must change scheme, and where?
//!
//! ## Core Contract
//!
//! 1. Collapse each non-empty candidate set to its maximal qualifier
//! 2. Report every ERROR constraint whose resolved sides are not subtypes
//! 3. Record the conversions the resolved typing requires, keyed by reference
//!
//! ## Architecture
//!
//! ```text
//! AnalysisInput → ReferenceStore ──assign_maximal──▶ resolved references
//!                 ConstraintSet ───type_check──────▶ violations
//!                                                   ConversionLedger
//!                                                   "Line N: x FROM => TO"
//!                         QualifierHierarchy, SeverityPolicy
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same references + same ordered constraints → identical ledger and
//!   identical diagnostic lines
//! - Stores and ledgers iterate in identifier order
//! - Constraint sets iterate in insertion order

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod hierarchy;
pub mod policy;
pub mod store;
pub mod extractor;
pub mod input;
pub mod report;
pub mod canonical;

// Re-exports
pub use types::{
    CustomName, Qualifier, QualifierNameError, RefId, RefKind, Reference,
    Constraint, ConstraintSet, FailureStatus, Conversion, ConversionLedger,
};
pub use hierarchy::{QualifierHierarchy, LatticeHierarchy, LatticeConfig, HierarchyError};
pub use policy::{SeverityPolicy, SeverityPolicyV1};
pub use store::{ReferenceStore, InMemoryReferenceStore, StoreError};
pub use extractor::{MaximalTypingExtractor, ExtractionSession, ExtractionStats, ExtractError};
pub use input::{AnalysisInput, AnalysisUnit, InputError};
pub use report::ExtractionReport;
pub use canonical::{to_canonical_bytes, canonical_hash, canonical_hash_hex};

/// Schema version of `ExtractionReport`.
/// Increment on breaking changes to the report layout.
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Default policy version identifier.
pub const DEFAULT_POLICY_VERSION: &str = "severity_policy_v1";
