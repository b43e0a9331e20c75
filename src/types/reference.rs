//! References: program variables, expressions and synthetic constructs
//! annotated with security qualifiers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::qualifier::Qualifier;

/// Stable unique key of a reference.
///
/// Implements `Ord` so stores and ledgers iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefId(String);

impl RefId {
    /// Create a new reference identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RefId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RefId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Kind of a reference.
///
/// Adapt kinds carry the identifier of the declaration they adapt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefKind {
    /// Local or field variable.
    Variable,
    /// Method parameter.
    Parameter,
    /// Operand of a comparison against null.
    EqualNull,
    /// Adapted view of a declaration at a use site.
    Adapt {
        /// The adapted declaration.
        decl: RefId,
    },
    /// Adapted view of a method declaration at a call site.
    MethodAdapt {
        /// The adapted method declaration.
        decl: RefId,
    },
    /// Any other expression.
    Other,
}

impl RefKind {
    /// Whether this is an adapt kind (`Adapt` or `MethodAdapt`).
    pub fn is_adapt(&self) -> bool {
        matches!(self, Self::Adapt { .. } | Self::MethodAdapt { .. })
    }

    /// Whether this is a method adapt.
    pub fn is_method_adapt(&self) -> bool {
        matches!(self, Self::MethodAdapt { .. })
    }

    /// Whether this is a null-comparison operand.
    pub fn is_equal_null(&self) -> bool {
        matches!(self, Self::EqualNull)
    }

    /// Whether this is a parameter.
    pub fn is_parameter(&self) -> bool {
        matches!(self, Self::Parameter)
    }

    /// The declaration adapted by this reference, for adapt kinds.
    pub fn adapted_declaration(&self) -> Option<&RefId> {
        match self {
            Self::Adapt { decl } | Self::MethodAdapt { decl } => Some(decl),
            _ => None,
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Variable => write!(f, "VARIABLE"),
            Self::Parameter => write!(f, "PARAMETER"),
            Self::EqualNull => write!(f, "EQUAL_NULL"),
            Self::Adapt { decl } => write!(f, "ADAPT({})", decl),
            Self::MethodAdapt { decl } => write!(f, "METHOD_ADAPT({})", decl),
            Self::Other => write!(f, "OTHER"),
        }
    }
}

/// A reference with its candidate and resolved qualifiers.
///
/// The candidate set is mutable until the reference is resolved. Resolution
/// is one-shot: once `resolved` is set it never changes, and the candidate
/// set is collapsed to that single qualifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Stable unique key.
    pub id: RefId,
    /// Source-level name, used in diagnostics.
    pub name: String,
    /// Kind of reference.
    pub kind: RefKind,
    /// Candidate qualifiers.
    #[serde(default)]
    candidates: BTreeSet<Qualifier>,
    /// Resolved qualifier, set by maximal assignment only.
    #[serde(default, skip_deserializing, skip_serializing_if = "Option::is_none")]
    resolved: Option<Qualifier>,
    /// Explicit classification overriding the resolved qualifier's name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crypto_type: Option<Qualifier>,
    /// Underlying declaration of this reference, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaration: Option<RefId>,
}

impl Reference {
    /// Create a reference with no candidates.
    pub fn new(id: impl Into<RefId>, name: impl Into<String>, kind: RefKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            candidates: BTreeSet::new(),
            resolved: None,
            crypto_type: None,
            declaration: None,
        }
    }

    /// Create a variable reference named after its identifier.
    pub fn variable(id: &str, candidates: impl IntoIterator<Item = Qualifier>) -> Self {
        Self::new(id, id, RefKind::Variable).with_candidates(candidates)
    }

    /// Set the candidate qualifiers.
    pub fn with_candidates(mut self, candidates: impl IntoIterator<Item = Qualifier>) -> Self {
        self.candidates = candidates.into_iter().collect();
        self
    }

    /// Set the explicit crypto type override.
    pub fn with_crypto_type(mut self, crypto_type: Qualifier) -> Self {
        self.crypto_type = Some(crypto_type);
        self
    }

    /// Set the underlying declaration.
    pub fn with_declaration(mut self, declaration: impl Into<RefId>) -> Self {
        self.declaration = Some(declaration.into());
        self
    }

    /// Candidate qualifiers, in canonical order.
    pub fn candidates(&self) -> &BTreeSet<Qualifier> {
        &self.candidates
    }

    /// Add a candidate qualifier. Ignored once resolved.
    pub fn add_candidate(&mut self, qualifier: Qualifier) {
        if self.resolved.is_none() {
            self.candidates.insert(qualifier);
        }
    }

    /// The resolved qualifier, if maximal assignment has run.
    pub fn resolved(&self) -> Option<&Qualifier> {
        self.resolved.as_ref()
    }

    /// Whether this reference has been resolved.
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Collapse the candidate set to `qualifier`.
    ///
    /// Returns `false` without changing anything if the reference was
    /// already resolved.
    pub fn resolve(&mut self, qualifier: Qualifier) -> bool {
        if self.resolved.is_some() {
            return false;
        }
        self.candidates.clear();
        self.candidates.insert(qualifier.clone());
        self.resolved = Some(qualifier);
        true
    }

    /// Effective type: the crypto type override if present, else the
    /// resolved qualifier.
    pub fn effective_type(&self) -> Option<&Qualifier> {
        self.crypto_type.as_ref().or(self.resolved.as_ref())
    }
}
