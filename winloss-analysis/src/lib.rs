//! Winloss Analysis: summary statistics, stop-loss sweeps, expiration forensics.
//!
//! This crate builds on `winloss-core` to provide:
//! - Summary statistics at one loss threshold (win rate with Wilson interval,
//!   profit factor, expectancy, payoff ratio, return distribution)
//! - Per-cohort breakdowns by source, asset type, direction, holding period
//! - Stop-loss threshold sweeps with reliability-gated optimal selection
//! - Expiration forensics with cohort aggregation and recommendations
//! - Loss pattern aggregation by reason code
//! - Bootstrap confidence interval for expectancy
//! - The combined analysis bundle, with JSON and CSV export

pub mod bootstrap;
pub mod cohort;
pub mod expiration;
pub mod export;
pub mod loss_patterns;
pub mod report;
pub mod simulate;
pub mod summary;

#[cfg(test)]
mod test_support;

pub use bootstrap::{bootstrap_expectancy, ExpectancyInterval};
pub use cohort::{summarize_by, CohortKey, CohortSummary};
pub use expiration::{
    analyze_expirations, CohortStats, ExpirationReport, ExpiredTradeForensics, Recommendation,
    RecommendationKind, Severity,
};
pub use export::{
    export_distribution_csv, export_expirations_csv, export_json, export_loss_patterns_csv,
    export_simulation_csv, import_json, save_artifacts,
};
pub use loss_patterns::{aggregate_loss_patterns, LossPattern, UNKNOWN_REASON};
pub use report::{analyze, input_fingerprint, AnalysisError, AnalysisReport, SCHEMA_VERSION};
pub use simulate::{
    select_optimal, simulate, OptimalThreshold, SimulationPoint, SimulationResult,
    ThresholdSimulator,
};
pub use summary::{summarize, summarize_iter, DistributionBucket, ProfitFactor, SummaryReport};
