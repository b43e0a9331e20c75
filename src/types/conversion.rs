//! Scheme conversions and the ledger that records them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::canonical::canonical_hash_hex;
use super::constraint::Constraint;
use super::qualifier::Qualifier;
use super::reference::RefId;

/// A required scheme change at a source position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Conversion {
    /// Source position of the constraint that required it.
    pub position: u32,
    /// Scheme the value currently has.
    pub from: Qualifier,
    /// Scheme the value must be converted to.
    pub to: Qualifier,
}

impl Conversion {
    /// Create a new conversion.
    pub fn new(position: u32, from: Qualifier, to: Qualifier) -> Self {
        Self { position, from, to }
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} => {} @{}", self.from, self.to, self.position)
    }
}

/// Deduplicating, order-preserving record of discovered conversions.
///
/// - `by_identifier` is append-only; each list keeps constraint-iteration
///   order and may hold duplicates.
/// - `seen_keys` maps `(position, left identifier)` to the first constraint
///   that produced a conversion under that key. It only decides whether a
///   diagnostic line is emitted; the conversion content is not part of the
///   key.
#[derive(Debug, Clone, Default)]
pub struct ConversionLedger {
    by_identifier: BTreeMap<RefId, Vec<Conversion>>,
    seen_keys: BTreeMap<(u32, RefId), Constraint>,
}

impl ConversionLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a conversion produced by `constraint`, attributed to `attributed`.
    ///
    /// The conversion is always appended. Returns `true` if this is the first
    /// conversion seen for `(constraint.position, constraint.left)`, i.e. the
    /// caller should emit a diagnostic line.
    pub fn record(&mut self, attributed: &RefId, conversion: Conversion, constraint: &Constraint) -> bool {
        self.by_identifier
            .entry(attributed.clone())
            .or_default()
            .push(conversion);

        let key = (constraint.position, constraint.left.clone());
        if self.seen_keys.contains_key(&key) {
            return false;
        }
        self.seen_keys.insert(key, constraint.clone());
        true
    }

    /// Conversions by attributed identifier.
    pub fn by_identifier(&self) -> &BTreeMap<RefId, Vec<Conversion>> {
        &self.by_identifier
    }

    /// Conversions attributed to `id`, in recording order.
    pub fn conversions_for(&self, id: &RefId) -> &[Conversion] {
        self.by_identifier.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The constraint that first claimed `(position, left)`, if any.
    pub fn owner_of(&self, position: u32, left: &RefId) -> Option<&Constraint> {
        self.seen_keys.get(&(position, left.clone()))
    }

    /// Total number of recorded conversions.
    pub fn len(&self) -> usize {
        self.by_identifier.values().map(Vec::len).sum()
    }

    /// Whether no conversion was recorded.
    pub fn is_empty(&self) -> bool {
        self.by_identifier.is_empty()
    }

    /// Number of distinct `(position, left)` keys, i.e. diagnosed conversions.
    pub fn diagnosed_count(&self) -> usize {
        self.seen_keys.len()
    }

    /// Deterministic fingerprint of `by_identifier`.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(&self.by_identifier)
    }

    /// Consume the ledger, keeping the downstream view.
    pub fn into_by_identifier(self) -> BTreeMap<RefId, Vec<Conversion>> {
        self.by_identifier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_writer_wins_diagnostic() {
        let mut ledger = ConversionLedger::new();
        let c1 = Constraint::new("c", "d", 7);
        let c2 = Constraint::new("c", "e", 7);
        let id = RefId::from("c");

        assert!(ledger.record(&id, Conversion::new(7, Qualifier::Rnd, Qualifier::Det), &c1));
        assert!(!ledger.record(&id, Conversion::new(7, Qualifier::Rnd, Qualifier::Ope), &c2));

        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.diagnosed_count(), 1);
        assert_eq!(ledger.owner_of(7, &id), Some(&c1));
        assert_eq!(ledger.conversions_for(&id)[1].to, Qualifier::Ope);
    }

    #[test]
    fn test_key_uses_left_not_attribution() {
        let mut ledger = ConversionLedger::new();
        let c = Constraint::new("adapt", "field", 4);

        assert!(ledger.record(&RefId::from("field"), Conversion::new(4, Qualifier::Det, Qualifier::Rnd), &c));
        assert!(ledger.owner_of(4, &RefId::from("adapt")).is_some());
        assert!(ledger.owner_of(4, &RefId::from("field")).is_none());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let c = Constraint::new("a", "b", 1);
        let mut l1 = ConversionLedger::new();
        let mut l2 = ConversionLedger::new();
        assert_eq!(l1.fingerprint(), l2.fingerprint());

        l1.record(&c.left, Conversion::new(1, Qualifier::Clear, Qualifier::Det), &c);
        assert_ne!(l1.fingerprint(), l2.fingerprint());

        l2.record(&c.left, Conversion::new(1, Qualifier::Clear, Qualifier::Det), &c);
        assert_eq!(l1.fingerprint(), l2.fingerprint());
    }
}
