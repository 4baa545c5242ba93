//! Text rendering and CSV export of run reports.
//!
//! Everything here is a pure function of its input: rendering the same
//! report twice yields the same bytes.

#![allow(clippy::missing_errors_doc)]

use crate::dns::history::RunHistory;
use crate::dns::types::{ProviderResult, RunReport};
use crate::error::Result;
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// First line of the text report.
pub const REPORT_HEADER: &str = "DNS Provider Latency Results:";

/// Line under the report header.
pub const REPORT_SEPARATOR: &str = "----------------------------------------";

/// Latency column for providers where every probe failed.
pub const FAILED_TEXT: &str = "Timeout or Error";

/// Column headers of the CSV export.
pub const CSV_HEADER: [&str; 6] = ["Provider", "IP", "Latency", "Success", "Tests Done", "Total Tests"];

/// Latency column of the text report for one result.
#[must_use]
pub fn format_latency(result: &ProviderResult) -> String {
    result
        .latency
        .mean()
        .map_or_else(|| FAILED_TEXT.to_string(), |d| format!("{:?}", d))
}

/// Render a ranked report as text, one provider per line.
#[must_use]
pub fn render_report(report: &RunReport) -> String {
    render_results(&report.results)
}

/// Render ranked results as text, one provider per line.
#[must_use]
pub fn render_results(results: &[ProviderResult]) -> String {
    let mut out = String::new();
    out.push_str(REPORT_HEADER);
    out.push('\n');
    out.push_str(REPORT_SEPARATOR);
    out.push('\n');
    for r in results {
        let _ = writeln!(out, "{:<20} ({}): {}", r.provider.name, r.address, format_latency(r));
    }
    out
}

/// Render the history view, newest run first.
#[must_use]
pub fn render_history(history: &RunHistory) -> String {
    let mut out = String::new();
    for run in history.all().iter().rev() {
        if run.results.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\nTest Run: {}\n", run.timestamp.format("%Y-%m-%d %H:%M:%S"));
        for r in &run.results {
            let latency = r
                .latency
                .mean()
                .map_or_else(|| "Failed".to_string(), |d| format!("{:?}", d));
            let _ = writeln!(out, "{:<20}: {}", r.provider.name, latency);
        }
    }
    out
}

/// Write results as CSV to any writer.
pub fn write_csv<W: std::io::Write>(writer: W, results: &[ProviderResult]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(CSV_HEADER)?;

    for r in results {
        let latency = r
            .latency
            .mean()
            .map(|d| format!("{:.3}", d.as_secs_f64() * 1000.0))
            .unwrap_or_default();
        writer.write_record([
            r.provider.name.clone(),
            r.address.to_string(),
            latency,
            r.success().to_string(),
            r.success_count.to_string(),
            r.total_probes.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Export results to a CSV file at `path`.
pub fn export_csv(path: &Path, results: &[ProviderResult]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv(file, results)?;
    tracing::info!("Results exported to {}", path.display());
    Ok(())
}

/// Default export location: a timestamped file in the documents folder.
#[must_use]
pub fn default_export_path(now: DateTime<Local>) -> PathBuf {
    let dir = dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    dir.join(format!("dns_test_results_{}.csv", now.format("%Y-%m-%d_%H-%M-%S")))
}
