//! Maximal typing extraction.
//!
//! The extractor runs three steps over one analysis unit:
//!
//! 1. **Maximal assignment**: collapse every non-empty candidate set to the
//!    hierarchy's maximal element
//! 2. **Verification**: report constraints whose resolved sides are not in
//!    the subtype relation and whose failure status is ERROR
//! 3. **Conversion extraction**: record the scheme conversions the resolved
//!    typing requires, in the session's ledger
//!
//! Steps 2 and 3 share one pass over the constraint collection. Assignment
//! must have completed over the whole store before that pass starts.
//!
//! ```text
//! ReferenceStore ──assign_maximal──▶ resolved store
//!                                        │
//! ConstraintSet ──────type_check─────────┴──▶ violations
//!                                        └──▶ ConversionLedger + diagnostics
//! ```

use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::hierarchy::QualifierHierarchy;
use crate::policy::SeverityPolicy;
use crate::store::ReferenceStore;
use crate::types::{Constraint, ConstraintSet, Conversion, ConversionLedger, FailureStatus, Qualifier, RefId, Reference};

/// Error type for extraction.
///
/// Violations are results, not errors. The only failure is the diagnostic
/// sink refusing a write.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// Writing a diagnostic line failed.
    #[error("Failed to write diagnostic: {0}")]
    Diagnostic(#[from] io::Error),
}

/// Summary counts for one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// References resolved by maximal assignment.
    pub resolved: usize,
    /// Constraints visited by the verification pass.
    pub constraints: usize,
    /// Constraints skipped because a side is missing from the store.
    pub dangling: usize,
    /// Violations reported.
    pub errors: usize,
    /// Conversions recorded in the ledger.
    pub conversions: usize,
    /// Diagnostic lines emitted.
    pub diagnosed: usize,
}

/// State threaded through one extraction: the ledger, the diagnostic sink
/// and running counts.
#[derive(Debug)]
pub struct ExtractionSession<W: Write> {
    ledger: ConversionLedger,
    out: W,
    stats: ExtractionStats,
}

impl<W: Write> ExtractionSession<W> {
    /// Create a session writing diagnostics to `out`.
    pub fn new(out: W) -> Self {
        Self {
            ledger: ConversionLedger::new(),
            out,
            stats: ExtractionStats::default(),
        }
    }

    /// The conversion ledger.
    pub fn ledger(&self) -> &ConversionLedger {
        &self.ledger
    }

    /// Running counts.
    pub fn stats(&self) -> &ExtractionStats {
        &self.stats
    }

    /// The diagnostic sink.
    pub fn output(&self) -> &W {
        &self.out
    }

    /// Split into ledger, sink and counts.
    pub fn into_parts(self) -> (ConversionLedger, W, ExtractionStats) {
        (self.ledger, self.out, self.stats)
    }
}

impl ExtractionSession<io::Sink> {
    /// A session discarding diagnostics.
    pub fn silent() -> Self {
        Self::new(io::sink())
    }
}

/// Maximal typing extractor.
///
/// Holds the hierarchy oracle and severity policy; references, constraints
/// and the session are passed to each call.
pub struct MaximalTypingExtractor<'a, H: QualifierHierarchy, P: SeverityPolicy> {
    hierarchy: &'a H,
    policy: &'a P,
}

impl<'a, H: QualifierHierarchy, P: SeverityPolicy> MaximalTypingExtractor<'a, H, P> {
    /// Create an extractor over `hierarchy` and `policy`.
    pub fn new(hierarchy: &'a H, policy: &'a P) -> Self {
        Self { hierarchy, policy }
    }

    /// Resolve every reference and verify the resulting typing.
    ///
    /// Returns the violations; conversions land in `session`.
    pub fn extract<S, W>(
        &self,
        store: &mut S,
        constraints: &ConstraintSet,
        session: &mut ExtractionSession<W>,
    ) -> Result<Vec<Constraint>, ExtractError>
    where
        S: ReferenceStore,
        W: Write,
    {
        session.stats.resolved += self.assign_maximal(store);
        self.type_check(&*store, constraints, session)
    }

    /// Collapse each non-empty candidate set to its maximal element.
    ///
    /// References with no candidates stay unresolved. Already resolved
    /// references are left as they are, so a second run is a no-op.
    /// Returns the number of references newly resolved.
    pub fn assign_maximal<S: ReferenceStore>(&self, store: &mut S) -> usize {
        info!(references = store.len(), "Picking up the maximal qualifier");

        let mut resolved = 0;
        for reference in store.references_mut() {
            let Some(max) = self.hierarchy.maximal(reference.candidates()).cloned() else {
                continue;
            };
            if reference.resolve(max) {
                resolved += 1;
            }
        }
        resolved
    }

    /// Verify the resolved typing and extract conversions in one pass.
    ///
    /// Every constraint is visited in collection order regardless of
    /// earlier violations.
    pub fn type_check<S, W>(
        &self,
        store: &S,
        constraints: &ConstraintSet,
        session: &mut ExtractionSession<W>,
    ) -> Result<Vec<Constraint>, ExtractError>
    where
        S: ReferenceStore,
        W: Write,
    {
        info!(constraints = constraints.len(), "Verifying the concrete typing");

        let mut errors = Vec::new();
        for c in constraints {
            session.stats.constraints += 1;

            let (Some(left), Some(right)) = (store.get(&c.left), store.get(&c.right)) else {
                warn!(constraint = %c, "Constraint names a reference missing from the store");
                session.stats.dangling += 1;
                continue;
            };

            if self.is_violation(c, left, right) {
                errors.push(c.clone());
            }
            self.conversion_check(store, c, left, right, session)?;
        }

        session.stats.errors += errors.len();
        info!(errors = errors.len(), "Finished verifying the concrete typing");
        info!(
            conversions = session.ledger.diagnosed_count(),
            recorded = session.ledger.len(),
            "Finished extracting type conversions"
        );
        Ok(errors)
    }

    /// Both sides resolved, not in the subtype relation, and ERROR status.
    fn is_violation(&self, c: &Constraint, left: &Reference, right: &Reference) -> bool {
        let (Some(l), Some(r)) = (left.resolved(), right.resolved()) else {
            return false;
        };
        !self.hierarchy.is_subtype(l, r) && self.policy.failure_status(c) == FailureStatus::Error
    }

    /// Record the conversion `c` requires under the resolved typing, if any.
    fn conversion_check<S, W>(
        &self,
        store: &S,
        c: &Constraint,
        left: &Reference,
        right: &Reference,
        session: &mut ExtractionSession<W>,
    ) -> Result<(), ExtractError>
    where
        S: ReferenceStore,
        W: Write,
    {
        if c.is_synthetic() || left.kind.is_equal_null() || right.kind.is_equal_null() {
            return Ok(());
        }

        // Baseline flowing into a typed reference. Baseline into a parameter
        // or into another baseline value needs no conversion.
        let left_is_baseline = left.effective_type().is_some_and(Qualifier::is_baseline);
        if left_is_baseline && !right.kind.is_method_adapt() && right.is_resolved() {
            let into_parameter = right.kind.is_parameter()
                || store.declaration_of(right).is_some_and(|d| d.kind.is_parameter());
            if into_parameter {
                return Ok(());
            }
            let Some(to) = right.effective_type() else {
                return Ok(());
            };
            if to.is_baseline() {
                return Ok(());
            }
            let conversion = Conversion::new(c.position, Qualifier::BASELINE, to.clone());
            return self.record(store, c, left, &left.id, conversion, session);
        }

        if !left.is_resolved() || !right.is_resolved() {
            return Ok(());
        }
        let (Some(from), Some(to)) = (left.effective_type(), right.effective_type()) else {
            return Ok(());
        };
        if from == to {
            return Ok(());
        }

        let attributed = if left.kind.is_adapt() { &right.id } else { &left.id };
        let conversion = Conversion::new(c.position, from.clone(), to.clone());
        self.record(store, c, left, attributed, conversion, session)
    }

    /// Append to the ledger; emit diagnostics for the first conversion under
    /// `(position, left)`.
    fn record<S, W>(
        &self,
        store: &S,
        c: &Constraint,
        left: &Reference,
        attributed: &RefId,
        conversion: Conversion,
        session: &mut ExtractionSession<W>,
    ) -> Result<(), ExtractError>
    where
        S: ReferenceStore,
        W: Write,
    {
        debug!(
            position = c.position,
            reference = %attributed,
            from = %conversion.from,
            to = %conversion.to,
            "Recorded conversion"
        );

        session.stats.conversions += 1;
        if !session.ledger.record(attributed, conversion, c) {
            return Ok(());
        }
        if let Some(recorded) = session.ledger.conversions_for(attributed).last() {
            writeln!(session.out, "{}", c)?;
            writeln!(
                session.out,
                "Line {}: {} {} => {}",
                c.position,
                diagnostic_name(store, left),
                recorded.from,
                recorded.to
            )?;
            session.stats.diagnosed += 1;
        }
        Ok(())
    }
}

/// Name printed for `left`: the adapted declaration's name for adapt kinds.
fn diagnostic_name<'s, S: ReferenceStore>(store: &'s S, left: &'s Reference) -> &'s str {
    left.kind
        .adapted_declaration()
        .and_then(|decl| store.get(decl))
        .map_or(left.name.as_str(), |d| d.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::LatticeHierarchy;
    use crate::policy::SeverityPolicyV1;
    use crate::store::InMemoryReferenceStore;
    use crate::types::RefKind;

    fn lines(session: &ExtractionSession<Vec<u8>>) -> Vec<String> {
        String::from_utf8(session.output().clone())
            .unwrap()
            .lines()
            .filter(|l| l.starts_with("Line "))
            .map(str::to_string)
            .collect()
    }

    fn run(
        store: &mut InMemoryReferenceStore,
        constraints: Vec<Constraint>,
        policy: &SeverityPolicyV1,
    ) -> (Vec<Constraint>, ExtractionSession<Vec<u8>>) {
        let hierarchy = LatticeHierarchy::encryption_schemes();
        let extractor = MaximalTypingExtractor::new(&hierarchy, policy);
        let mut session = ExtractionSession::new(Vec::new());
        let errors = extractor
            .extract(store, &constraints.into(), &mut session)
            .unwrap();
        (errors, session)
    }

    #[test]
    fn test_assign_maximal_leaves_empty_unresolved() {
        let mut store: InMemoryReferenceStore = [
            Reference::variable("a", [Qualifier::Clear, Qualifier::Det, Qualifier::Ah]),
            Reference::variable("b", []),
        ]
        .into_iter()
        .collect();

        let hierarchy = LatticeHierarchy::encryption_schemes();
        let policy = SeverityPolicyV1::default();
        let extractor = MaximalTypingExtractor::new(&hierarchy, &policy);

        assert_eq!(extractor.assign_maximal(&mut store), 1);
        assert_eq!(store.get(&RefId::from("a")).unwrap().resolved(), Some(&Qualifier::Ah));
        assert!(!store.get(&RefId::from("b")).unwrap().is_resolved());

        assert_eq!(extractor.assign_maximal(&mut store), 0);
        assert_eq!(store.get(&RefId::from("a")).unwrap().resolved(), Some(&Qualifier::Ah));
    }

    #[test]
    fn test_warning_is_not_reported_but_converts() {
        let mut store: InMemoryReferenceStore = [
            Reference::variable("x", [Qualifier::Rnd]),
            Reference::variable("y", [Qualifier::Det]),
        ]
        .into_iter()
        .collect();
        let policy = SeverityPolicyV1::default().warn_at(3);

        let (errors, session) = run(&mut store, vec![Constraint::new("x", "y", 3)], &policy);

        assert!(errors.is_empty());
        assert_eq!(session.ledger().conversions_for(&RefId::from("x")).len(), 1);
        assert_eq!(lines(&session), vec!["Line 3: x RND => DET"]);
    }

    #[test]
    fn test_unresolved_side_is_not_checked() {
        let mut store: InMemoryReferenceStore = [
            Reference::variable("x", [Qualifier::Rnd]),
            Reference::variable("y", []),
        ]
        .into_iter()
        .collect();

        let (errors, session) = run(&mut store, vec![Constraint::new("x", "y", 2)], &SeverityPolicyV1::default());

        assert!(errors.is_empty());
        assert!(session.ledger().is_empty());
    }

    #[test]
    fn test_equal_null_and_synthetic_skip_conversion() {
        let mut store: InMemoryReferenceStore = [
            Reference::variable("x", [Qualifier::Rnd]),
            Reference::variable("y", [Qualifier::Det]),
            Reference::new("n", "n", RefKind::EqualNull).with_candidates([Qualifier::Ope]),
        ]
        .into_iter()
        .collect();

        let (errors, session) = run(
            &mut store,
            vec![
                Constraint::new("x", "y", 0),
                Constraint::new("n", "y", 4),
                Constraint::new("x", "n", 5),
            ],
            &SeverityPolicyV1::default(),
        );

        // Verification still runs: RND </: DET and RND </: OPE.
        assert_eq!(errors.len(), 2);
        assert!(session.ledger().is_empty());
        assert!(lines(&session).is_empty());
    }

    #[test]
    fn test_adapt_left_attributes_to_right_and_names_declaration() {
        let mut store: InMemoryReferenceStore = [
            Reference::new("Account.balance", "balance", RefKind::Variable).with_candidates([Qualifier::Rnd]),
            Reference::new("acct.balance#12", "acct.balance", RefKind::Adapt { decl: RefId::from("Account.balance") })
                .with_candidates([Qualifier::Rnd]),
            Reference::variable("total", [Qualifier::Ah]),
        ]
        .into_iter()
        .collect();

        let (_, session) = run(
            &mut store,
            vec![Constraint::new("acct.balance#12", "total", 12)],
            &SeverityPolicyV1::default(),
        );

        assert_eq!(session.ledger().conversions_for(&RefId::from("total")).len(), 1);
        assert!(session.ledger().conversions_for(&RefId::from("acct.balance#12")).is_empty());
        assert_eq!(lines(&session), vec!["Line 12: balance RND => AH"]);
    }

    #[test]
    fn test_crypto_type_override_decides_divergence() {
        let mut store: InMemoryReferenceStore = [
            Reference::variable("x", [Qualifier::Rnd]).with_crypto_type(Qualifier::Det),
            Reference::variable("y", [Qualifier::Det]),
            Reference::variable("z", [Qualifier::Rnd]),
        ]
        .into_iter()
        .collect();

        let (_, session) = run(
            &mut store,
            vec![Constraint::new("x", "y", 1), Constraint::new("x", "z", 2)],
            &SeverityPolicyV1::default(),
        );

        assert_eq!(
            session.ledger().conversions_for(&RefId::from("x")),
            &[Conversion::new(2, Qualifier::Det, Qualifier::Rnd)]
        );
    }

    #[test]
    fn test_builtin_spellings_are_one_qualifier() {
        let mut store: InMemoryReferenceStore = [
            Reference::variable("x", [Qualifier::parse("DET").unwrap()]),
            Reference::variable("y", [Qualifier::Det]),
            Reference::variable("c", [Qualifier::named(String::from("CLEAR"))]),
            Reference::new("p", "p", RefKind::Parameter).with_candidates([Qualifier::Det]),
        ]
        .into_iter()
        .collect();

        let (errors, session) = run(
            &mut store,
            vec![Constraint::new("x", "y", 1), Constraint::new("c", "p", 2)],
            &SeverityPolicyV1::default(),
        );

        assert!(errors.is_empty());
        assert!(session.ledger().is_empty());
        assert!(lines(&session).is_empty());
    }

    #[test]
    fn test_crypto_type_override_makes_left_baseline() {
        let mut store: InMemoryReferenceStore = [
            Reference::variable("l", [Qualifier::Det]).with_crypto_type(Qualifier::Clear),
            Reference::variable("v", [Qualifier::Rnd]),
        ]
        .into_iter()
        .collect();

        let (errors, session) = run(&mut store, vec![Constraint::new("l", "v", 4)], &SeverityPolicyV1::default());

        assert!(errors.is_empty());
        assert_eq!(
            session.ledger().conversions_for(&RefId::from("l")),
            &[Conversion::new(4, Qualifier::Clear, Qualifier::Rnd)]
        );
        assert_eq!(lines(&session), vec!["Line 4: l CLEAR => RND"]);
    }

    #[test]
    fn test_crypto_type_override_hides_baseline_resolution() {
        let mut store: InMemoryReferenceStore = [
            Reference::variable("l", [Qualifier::Clear]).with_crypto_type(Qualifier::Det),
            Reference::new("p", "p", RefKind::Parameter).with_candidates([Qualifier::Rnd]),
        ]
        .into_iter()
        .collect();

        let (_, session) = run(&mut store, vec![Constraint::new("l", "p", 5)], &SeverityPolicyV1::default());

        // Not a baseline flow, so the parameter exclusion does not apply.
        assert_eq!(
            session.ledger().conversions_for(&RefId::from("l")),
            &[Conversion::new(5, Qualifier::Det, Qualifier::Rnd)]
        );
    }

    #[test]
    fn test_method_adapt_left_attributes_to_right_and_names_declaration() {
        let mut store: InMemoryReferenceStore = [
            Reference::new("Calc.compute", "compute", RefKind::Variable).with_candidates([Qualifier::Rnd]),
            Reference::new("calc.compute#4", "calc.compute", RefKind::MethodAdapt { decl: RefId::from("Calc.compute") })
                .with_candidates([Qualifier::Rnd]),
            Reference::variable("t", [Qualifier::Det]),
        ]
        .into_iter()
        .collect();

        let (_, session) = run(
            &mut store,
            vec![Constraint::new("calc.compute#4", "t", 4)],
            &SeverityPolicyV1::default(),
        );

        assert_eq!(
            session.ledger().conversions_for(&RefId::from("t")),
            &[Conversion::new(4, Qualifier::Rnd, Qualifier::Det)]
        );
        assert!(session.ledger().conversions_for(&RefId::from("calc.compute#4")).is_empty());
        assert_eq!(lines(&session), vec!["Line 4: compute RND => DET"]);
    }

    #[test]
    fn test_baseline_into_method_adapt_falls_through() {
        let mut store: InMemoryReferenceStore = [
            Reference::variable("c", [Qualifier::Clear]),
            Reference::new("m#3", "m", RefKind::MethodAdapt { decl: RefId::from("m") })
                .with_candidates([Qualifier::Det]),
        ]
        .into_iter()
        .collect();

        let (_, session) = run(&mut store, vec![Constraint::new("c", "m#3", 3)], &SeverityPolicyV1::default());

        // Handled by the general divergence case.
        assert_eq!(
            session.ledger().conversions_for(&RefId::from("c")),
            &[Conversion::new(3, Qualifier::Clear, Qualifier::Det)]
        );
    }

    #[test]
    fn test_baseline_into_baseline_records_nothing() {
        let mut store: InMemoryReferenceStore = [
            Reference::variable("a", [Qualifier::Clear]),
            Reference::variable("b", [Qualifier::Clear]),
        ]
        .into_iter()
        .collect();

        let (errors, session) = run(&mut store, vec![Constraint::new("a", "b", 8)], &SeverityPolicyV1::default());

        assert!(errors.is_empty());
        assert!(session.ledger().is_empty());
    }

    #[test]
    fn test_dangling_constraint_is_skipped() {
        let mut store: InMemoryReferenceStore = [Reference::variable("a", [Qualifier::Det])].into_iter().collect();

        let (errors, session) = run(&mut store, vec![Constraint::new("a", "ghost", 1)], &SeverityPolicyV1::default());

        assert!(errors.is_empty());
        assert_eq!(session.stats().dangling, 1);
        assert_eq!(session.stats().constraints, 1);
    }

    #[test]
    fn test_sink_failure_propagates() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut store: InMemoryReferenceStore = [
            Reference::variable("x", [Qualifier::Rnd]),
            Reference::variable("y", [Qualifier::Det]),
        ]
        .into_iter()
        .collect();
        let hierarchy = LatticeHierarchy::encryption_schemes();
        let policy = SeverityPolicyV1::default();
        let extractor = MaximalTypingExtractor::new(&hierarchy, &policy);
        let mut session = ExtractionSession::new(Broken);

        let result = extractor.extract(&mut store, &vec![Constraint::new("x", "y", 1)].into(), &mut session);
        assert!(matches!(result, Err(ExtractError::Diagnostic(_))));
    }
}
