//! Analysis bundle: every component run once over the same snapshot.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::mem;
use thiserror::Error;
use tracing::info;

use winloss_core::{AnalysisConfig, ConfigError, RecordWarning, ThresholdError, TradeRecord};

use crate::bootstrap::{bootstrap_expectancy, ExpectancyInterval};
use crate::cohort::{summarize_by, CohortKey, CohortSummary};
use crate::expiration::{analyze_expirations, ExpirationReport};
use crate::loss_patterns::{aggregate_loss_patterns, LossPattern};
use crate::simulate::{SimulationResult, ThresholdSimulator};
use crate::summary::{summarize, SummaryReport};

/// Current schema version for persisted reports.
pub const SCHEMA_VERSION: u32 = 1;

/// BLAKE3 hex digest of the canonical JSON form of an input batch.
pub type InputFingerprint = String;

/// Errors from building an analysis bundle.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Threshold(#[from] ThresholdError),

    #[error("failed to fingerprint input batch: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Every report for one batch, plus enough metadata to tell two runs apart.
///
/// Contains no timestamps, so the same batch and config always serialize to
/// identical bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub schema_version: u32,
    pub input_fingerprint: InputFingerprint,
    pub trade_count: usize,
    pub summary: SummaryReport,
    pub by_source: Vec<CohortSummary>,
    pub by_asset_type: Vec<CohortSummary>,
    pub simulation: SimulationResult,
    pub expirations: ExpirationReport,
    pub loss_patterns: Vec<LossPattern>,
    pub expectancy_interval: Option<ExpectancyInterval>,
    /// Deduplicated across components and sorted.
    #[serde(default)]
    pub warnings: Vec<RecordWarning>,
}

impl AnalysisReport {
    /// Fold in warnings raised outside the analysis (e.g. while loading),
    /// keeping the list deduplicated and sorted.
    pub fn merge_warnings<I>(&mut self, extra: I)
    where
        I: IntoIterator<Item = RecordWarning>,
    {
        let merged: BTreeSet<RecordWarning> =
            mem::take(&mut self.warnings).into_iter().chain(extra).collect();
        self.warnings = merged.into_iter().collect();
    }
}

/// Fingerprint a batch. Same records in the same order → same digest.
pub fn input_fingerprint(trades: &[TradeRecord]) -> Result<InputFingerprint, serde_json::Error> {
    let mut hasher = blake3::Hasher::new();
    serde_json::to_writer(&mut hasher, trades)?;
    Ok(hasher.finalize().to_hex().to_string())
}

/// Run every analysis at the configured defaults.
///
/// Fails only on invalid configuration; degenerate data produces sentinel
/// values, never an error.
pub fn analyze(
    trades: &[TradeRecord],
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalysisError> {
    config.validate()?;
    let threshold = config.loss_threshold()?;

    let mut summary = summarize(trades, threshold, config);
    let mut by_source = summarize_by(trades, threshold, config, CohortKey::Source);
    let mut by_asset_type = summarize_by(trades, threshold, config, CohortKey::AssetType);
    let mut simulation = ThresholdSimulator::new(config).run(trades, &config.thresholds)?;
    let mut expirations = analyze_expirations(trades, &config.expiration);
    let loss_patterns = aggregate_loss_patterns(trades, threshold);
    let expectancy_interval = bootstrap_expectancy(trades, threshold, config);

    let mut warnings = BTreeSet::new();
    warnings.extend(mem::take(&mut summary.warnings));
    warnings.extend(mem::take(&mut simulation.warnings));
    warnings.extend(mem::take(&mut expirations.warnings));
    for cohort in by_source.iter_mut().chain(by_asset_type.iter_mut()) {
        warnings.extend(mem::take(&mut cohort.report.warnings));
    }

    let report = AnalysisReport {
        schema_version: SCHEMA_VERSION,
        input_fingerprint: input_fingerprint(trades)?,
        trade_count: trades.len(),
        summary,
        by_source,
        by_asset_type,
        simulation,
        expirations,
        loss_patterns,
        expectancy_interval,
        warnings: warnings.into_iter().collect(),
    };

    info!(
        trades = report.trade_count,
        decided = report.summary.decided_trades,
        expired = report.expirations.total_expired,
        warnings = report.warnings.len(),
        fingerprint = %report.input_fingerprint,
        "analysis complete"
    );
    Ok(report)
}
