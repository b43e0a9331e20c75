//! Extraction report for downstream consumers.
//!
//! The report packages the violation list, the conversion ledger's
//! `by_identifier` view and summary counts, together with fingerprints of
//! the configuration and ledger. Repeated runs over the same input produce
//! byte-identical reports.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use crate::canonical::canonical_hash_hex;
use crate::extractor::{ExtractError, ExtractionSession, ExtractionStats, MaximalTypingExtractor};
use crate::input::AnalysisUnit;
use crate::types::{Constraint, Conversion, RefId};
use crate::REPORT_SCHEMA_VERSION;

/// Result of one extraction, ready to serialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Report schema version.
    pub schema_version: String,
    /// Severity policy identifier.
    pub policy_id: String,
    /// Severity policy parameters hash.
    pub policy_params_hash: String,
    /// Qualifier hierarchy fingerprint.
    pub hierarchy_fingerprint: String,
    /// Violated ERROR constraints, in constraint order.
    pub violations: Vec<Constraint>,
    /// Conversions by attributed reference.
    pub conversions: BTreeMap<RefId, Vec<Conversion>>,
    /// Fingerprint of `conversions`.
    pub ledger_fingerprint: String,
    /// Summary counts.
    pub stats: ExtractionStats,
}

impl ExtractionReport {
    /// Run the full extraction over `unit`, writing diagnostics to `out`.
    pub fn extract<W: Write>(unit: &mut AnalysisUnit, out: W) -> Result<Self, ExtractError> {
        let extractor = MaximalTypingExtractor::new(&unit.hierarchy, &unit.policy);
        let mut session = ExtractionSession::new(out);
        let violations = extractor.extract(&mut unit.store, &unit.constraints, &mut session)?;

        let (ledger, mut out, stats) = session.into_parts();
        out.flush()?;

        Ok(Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            policy_id: unit.policy.policy_id().to_string(),
            policy_params_hash: unit.policy.params_hash(),
            hierarchy_fingerprint: unit.hierarchy.fingerprint(),
            violations,
            ledger_fingerprint: ledger.fingerprint(),
            conversions: ledger.into_by_identifier(),
            stats,
        })
    }

    /// Whether no ERROR constraint was violated.
    pub fn is_well_typed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Hash of the whole report.
    pub fn report_hash(&self) -> String {
        canonical_hash_hex(self)
    }

    /// Pretty JSON rendering.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the report as pretty JSON to `path`.
    pub fn write_to(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json)
    }
}
