//! Finite qualifier lattice built from explicit subtype edges.
//!
//! The subtype relation is the reflexive-transitive closure of the
//! configured edges. Maximality follows the configured ranking; qualifiers
//! outside the ranking sort after every ranked qualifier.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use crate::canonical::canonical_hash_hex;
use crate::types::Qualifier;
use super::QualifierHierarchy;

/// Errors building a lattice from configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    /// The ranking lists no qualifiers.
    #[error("Qualifier ranking is empty")]
    EmptyRanking,
    /// A qualifier appears twice in the ranking.
    #[error("Qualifier ranked twice: {0}")]
    DuplicateRank(Qualifier),
    /// An edge names a qualifier absent from the ranking.
    #[error("Edge names unranked qualifier: {0}")]
    UnknownQualifier(Qualifier),
    /// Two distinct qualifiers are subtypes of each other.
    #[error("Subtype cycle between {0} and {1}")]
    Cycle(Qualifier, Qualifier),
}

/// Serializable lattice description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatticeConfig {
    /// Qualifiers from most to least permissive.
    pub ranking: Vec<Qualifier>,
    /// Direct subtype edges `(sub, sup)`.
    #[serde(default)]
    pub edges: Vec<(Qualifier, Qualifier)>,
}

impl Default for LatticeConfig {
    /// The encryption-scheme lattice:
    /// `CLEAR <: OPE <: DET <: RND` and `CLEAR <: AH <: RND`.
    fn default() -> Self {
        use Qualifier::*;
        Self {
            ranking: vec![Rnd, Ah, Det, Ope, Clear],
            edges: vec![(Clear, Ope), (Ope, Det), (Det, Rnd), (Clear, Ah), (Ah, Rnd)],
        }
    }
}

/// Qualifier hierarchy over a finite lattice.
#[derive(Debug, Clone)]
pub struct LatticeHierarchy {
    config: LatticeConfig,
    rank: BTreeMap<Qualifier, usize>,
    /// Reflexive-transitive supertypes of each ranked qualifier.
    supertypes: BTreeMap<Qualifier, BTreeSet<Qualifier>>,
}

impl LatticeHierarchy {
    /// Build a hierarchy from configuration.
    pub fn from_config(config: LatticeConfig) -> Result<Self, HierarchyError> {
        if config.ranking.is_empty() {
            return Err(HierarchyError::EmptyRanking);
        }

        let mut rank = BTreeMap::new();
        for (i, q) in config.ranking.iter().enumerate() {
            if rank.insert(q.clone(), i).is_some() {
                return Err(HierarchyError::DuplicateRank(q.clone()));
            }
        }

        let mut direct: BTreeMap<&Qualifier, Vec<&Qualifier>> = BTreeMap::new();
        for (sub, sup) in &config.edges {
            for q in [sub, sup] {
                if !rank.contains_key(q) {
                    return Err(HierarchyError::UnknownQualifier(q.clone()));
                }
            }
            direct.entry(sub).or_default().push(sup);
        }

        let mut supertypes = BTreeMap::new();
        for q in &config.ranking {
            let mut reached: BTreeSet<Qualifier> = BTreeSet::new();
            let mut stack = vec![q];
            while let Some(cur) = stack.pop() {
                if !reached.insert(cur.clone()) {
                    continue;
                }
                if let Some(next) = direct.get(cur) {
                    stack.extend(next.iter().copied());
                }
            }
            supertypes.insert(q.clone(), reached);
        }

        for (q, sups) in &supertypes {
            for sup in sups {
                if sup != q && supertypes.get(sup).is_some_and(|s| s.contains(q)) {
                    return Err(HierarchyError::Cycle(q.clone(), sup.clone()));
                }
            }
        }

        Ok(Self { config, rank, supertypes })
    }

    /// The default encryption-scheme lattice.
    pub fn encryption_schemes() -> Self {
        Self::from_config(LatticeConfig::default()).expect("default lattice is well-formed")
    }

    /// A chain `levels[0] <: levels[1] <: ...`, the last level maximal.
    pub fn chain(levels: impl IntoIterator<Item = Qualifier>) -> Result<Self, HierarchyError> {
        let levels: Vec<Qualifier> = levels.into_iter().collect();
        let edges = levels
            .windows(2)
            .map(|w| (w[0].clone(), w[1].clone()))
            .collect();
        let ranking = levels.into_iter().rev().collect();
        Self::from_config(LatticeConfig { ranking, edges })
    }

    /// The configuration this hierarchy was built from.
    pub fn config(&self) -> &LatticeConfig {
        &self.config
    }

    /// Deterministic fingerprint of the configuration.
    pub fn fingerprint(&self) -> String {
        canonical_hash_hex(&self.config)
    }

    /// Whether `q` is part of the lattice.
    pub fn contains(&self, q: &Qualifier) -> bool {
        self.rank.contains_key(q)
    }
}

impl Default for LatticeHierarchy {
    fn default() -> Self {
        Self::encryption_schemes()
    }
}

impl QualifierHierarchy for LatticeHierarchy {
    fn is_subtype(&self, sub: &Qualifier, sup: &Qualifier) -> bool {
        match self.supertypes.get(sub) {
            Some(sups) => sups.contains(sup),
            None => sub == sup,
        }
    }

    fn compare(&self, a: &Qualifier, b: &Qualifier) -> Ordering {
        match (self.rank.get(a), self.rank.get(b)) {
            (Some(ra), Some(rb)) => ra.cmp(rb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }
}
