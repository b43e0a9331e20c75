//! Core types for maximal typing.

pub mod qualifier;
pub mod reference;
pub mod constraint;
pub mod conversion;

pub use qualifier::{CustomName, Qualifier, QualifierNameError};
pub use reference::{RefId, RefKind, Reference};
pub use constraint::{Constraint, ConstraintSet, FailureStatus};
pub use conversion::{Conversion, ConversionLedger};
