//! Maximal typing driver.
//!
//! Reads an analysis input document, runs maximal typing, writes conversion
//! diagnostics to stdout and optionally the full report as JSON.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `INPUT_PATH`: analysis input document (or first command-line argument)
//! - `REPORT_PATH`: where to write the JSON report (optional)
//! - `RUST_LOG`: Log level filter (default: maximal_typing=info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! Logs go to stderr; stdout carries only diagnostics.
//!
//! Exits with status 1 when any ERROR constraint is violated.
//!
//! ## Usage
//!
//! ```bash
//! REPORT_PATH=report.json cargo run --bin maximal_typing -- input.json
//! ```

use std::process::ExitCode;
use std::time::Instant;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use maximal_typing::{AnalysisInput, ExtractionReport};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "maximal_typing=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    init_tracing();

    let input_path = match std::env::var("INPUT_PATH")
        .ok()
        .or_else(|| std::env::args().nth(1))
    {
        Some(path) => path,
        None => {
            error!("No input given. Set INPUT_PATH or pass the input document as an argument");
            return Ok(ExitCode::from(2));
        }
    };
    let report_path = std::env::var("REPORT_PATH").ok();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        input = %input_path,
        "Starting maximal typing"
    );

    let start = Instant::now();
    let mut unit = AnalysisInput::from_path(&input_path)?.into_unit()?;
    if let Err(e) = unit.store.validate_constraints(&unit.constraints) {
        warn!(error = %e, "Input references unknown identifiers");
    }

    let report = ExtractionReport::extract(&mut unit, std::io::stdout().lock())?;

    info!(
        errors = report.violations.len(),
        conversions = report.stats.conversions,
        diagnosed = report.stats.diagnosed,
        ledger_fingerprint = %report.ledger_fingerprint,
        latency_ms = start.elapsed().as_millis() as u64,
        "Maximal typing complete"
    );

    if let Some(path) = report_path {
        report.write_to(&path)?;
        info!(path = %path, "Report written");
    }

    for violation in &report.violations {
        error!(constraint = %violation, "Type violation");
    }

    if report.is_well_typed() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
