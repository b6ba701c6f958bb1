//! Export: JSON round trip for the analysis bundle and CSV tables.
//!
//! - **JSON**: full `AnalysisReport` with `schema_version`; newer versions are
//!   rejected on load
//! - **CSV**: simulation table, loss patterns, expiration forensics, return
//!   distribution
//!
//! CSV values are written at full precision; rounding is a display concern.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::expiration::ExpiredTradeForensics;
use crate::loss_patterns::LossPattern;
use crate::report::{AnalysisReport, SCHEMA_VERSION};
use crate::simulate::SimulationPoint;
use crate::summary::{DistributionBucket, ProfitFactor, INFINITY_SENTINEL};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize an `AnalysisReport` to pretty JSON.
pub fn export_json(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize AnalysisReport to JSON")
}

/// Deserialize an `AnalysisReport` from JSON, rejecting newer schema versions.
pub fn import_json(json: &str) -> Result<AnalysisReport> {
    let report: AnalysisReport =
        serde_json::from_str(json).context("failed to deserialize AnalysisReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One row per simulated threshold.
///
/// Columns: threshold_percent, wins, losses, breakeven, decided_trades,
/// win_rate, win_rate_lower, win_rate_upper, avg_win_percent,
/// avg_loss_percent, profit_factor, expectancy, payoff_ratio,
/// sample_reliability
pub fn export_simulation_csv(points: &[SimulationPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "threshold_percent",
        "wins",
        "losses",
        "breakeven",
        "decided_trades",
        "win_rate",
        "win_rate_lower",
        "win_rate_upper",
        "avg_win_percent",
        "avg_loss_percent",
        "profit_factor",
        "expectancy",
        "payoff_ratio",
        "sample_reliability",
    ])?;

    for p in points {
        let s = &p.stats;
        wtr.write_record([
            p.threshold_percent().to_string(),
            s.wins.to_string(),
            s.losses.to_string(),
            s.breakeven.to_string(),
            s.decided_trades.to_string(),
            s.win_rate.to_string(),
            s.win_rate_interval.lower.to_string(),
            s.win_rate_interval.upper.to_string(),
            s.avg_win_percent.to_string(),
            s.avg_loss_percent.to_string(),
            profit_factor_cell(&s.profit_factor),
            s.expectancy.to_string(),
            s.payoff_ratio.to_string(),
            s.sample_reliability.to_string(),
        ])?;
    }

    finish(wtr)
}

/// Columns: reason, count, avg_loss_percent, worst_loss_percent, share_percent
pub fn export_loss_patterns_csv(patterns: &[LossPattern]) -> Result<String> {
    serialize_rows(patterns)
}

/// One row per analyzed expired trade, in input order.
pub fn export_expirations_csv(trades: &[ExpiredTradeForensics]) -> Result<String> {
    serialize_rows(trades)
}

/// Columns: range, lower, upper, count, wins, losses. Open-ended bounds are empty.
pub fn export_distribution_csv(buckets: &[DistributionBucket]) -> Result<String> {
    serialize_rows(buckets)
}

fn profit_factor_cell(pf: &ProfitFactor) -> String {
    match pf {
        ProfitFactor::Finite(v) => v.to_string(),
        ProfitFactor::Infinite => INFINITY_SENTINEL.to_string(),
    }
}

fn serialize_rows<T: Serialize>(rows: &[T]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    for row in rows {
        wtr.serialize(row).context("failed to write CSV row")?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write the full artifact set for one analysis into `output_dir`:
/// - `report.json`: the full `AnalysisReport`
/// - `simulation.csv`
/// - `loss_patterns.csv`
/// - `expirations.csv`
/// - `distribution.csv`: at the configured loss threshold
///
/// The directory is created if needed and existing files are overwritten.
/// Returns the paths written.
pub fn save_artifacts(report: &AnalysisReport, output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let artifacts = [
        ("report.json", export_json(report)?),
        (
            "simulation.csv",
            export_simulation_csv(&report.simulation.simulations)?,
        ),
        (
            "loss_patterns.csv",
            export_loss_patterns_csv(&report.loss_patterns)?,
        ),
        (
            "expirations.csv",
            export_expirations_csv(&report.expirations.trades)?,
        ),
        (
            "distribution.csv",
            export_distribution_csv(&report.summary.distribution)?,
        ),
    ];

    let mut written = Vec::with_capacity(artifacts.len());
    for (name, contents) in artifacts {
        let path = output_dir.join(name);
        fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
