//! Qualifier tags for the encryption-scheme lattice.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Pattern every qualifier short name must match.
const QUALIFIER_NAME_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

/// Error returned when a qualifier name cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid qualifier name: {0:?}")]
pub struct QualifierNameError(pub String);

/// A security qualifier tag.
///
/// Each tag carries its canonical short name directly, so effective-type
/// comparison is plain equality. The well-known encryption schemes have
/// dedicated variants; any other lattice element is `Named`.
///
/// Serializes as its short name (`"CLEAR"`, `"DET"`, `"HIGH"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Qualifier {
    /// No scheme applied. The designated baseline.
    Clear,
    /// Order-preserving encryption.
    Ope,
    /// Deterministic encryption.
    Det,
    /// Additively homomorphic encryption.
    Ah,
    /// Randomized encryption.
    Rnd,
    /// Any other qualifier, by short name.
    Named(CustomName),
}

/// Short name of a qualifier outside the built-in schemes.
///
/// Only [`Qualifier::named`] builds one, and it never holds a built-in
/// name, so each qualifier has exactly one representation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CustomName(String);

impl CustomName {
    /// The short name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Qualifier {
    /// The baseline ("no scheme applied") qualifier.
    pub const BASELINE: Qualifier = Qualifier::Clear;

    /// Canonical short name of this qualifier.
    pub fn short_name(&self) -> &str {
        match self {
            Self::Clear => "CLEAR",
            Self::Ope => "OPE",
            Self::Det => "DET",
            Self::Ah => "AH",
            Self::Rnd => "RND",
            Self::Named(name) => name.as_str(),
        }
    }

    /// Whether this is the baseline qualifier.
    pub fn is_baseline(&self) -> bool {
        matches!(self, Self::Clear)
    }

    /// Build a qualifier from a short name without validating it.
    ///
    /// Built-in scheme names map to their dedicated variant, so
    /// `Qualifier::named("DET") == Qualifier::Det`.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.as_str() {
            "CLEAR" => Self::Clear,
            "OPE" => Self::Ope,
            "DET" => Self::Det,
            "AH" => Self::Ah,
            "RND" => Self::Rnd,
            _ => Self::Named(CustomName(name)),
        }
    }

    /// Parse and validate a short name.
    pub fn parse(name: &str) -> Result<Self, QualifierNameError> {
        if !name_regex().is_match(name) {
            return Err(QualifierNameError(name.to_string()));
        }
        Ok(Self::named(name))
    }
}

fn name_regex() -> &'static regex_lite::Regex {
    static RE: OnceLock<regex_lite::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex_lite::Regex::new(QUALIFIER_NAME_PATTERN).expect("qualifier name pattern is valid")
    })
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl From<Qualifier> for String {
    fn from(q: Qualifier) -> Self {
        match q {
            Qualifier::Named(name) => name.0,
            other => other.short_name().to_string(),
        }
    }
}

impl TryFrom<String> for Qualifier {
    type Error = QualifierNameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if !name_regex().is_match(&s) {
            return Err(QualifierNameError(s));
        }
        Ok(Self::named(s))
    }
}
