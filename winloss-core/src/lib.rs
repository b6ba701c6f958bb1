//! Winloss Core: trade records, outcome classification, interval estimation.
//!
//! This crate holds the leaf components of the trade-outcome engine:
//! - Domain types (`TradeRecord` and its categorical tags, per-record warnings)
//! - Threshold-dependent outcome classifier (win / loss / breakeven / expired)
//! - Wilson score interval estimator
//! - Sample reliability grading
//! - Analysis configuration (TOML, with defaults for every field)
//! - Trade-history ingestion (JSON, JSON Lines, CSV)
//!
//! Everything except `history` is pure and synchronous.

pub mod classify;
pub mod config;
pub mod domain;
pub mod history;
pub mod interval;
pub mod reliability;

pub use classify::{
    classify, label_for_gain, ClassifiedOutcome, Exclusion, LossThreshold, OutcomeLabel,
    ThresholdError,
};
pub use config::{AnalysisConfig, BootstrapConfig, ConfigError, ExpirationConfig, DEFAULT_SWEEP};
pub use domain::{
    AnalysisStage, AssetType, Direction, Excursion, HoldingPeriod, PricePlan, RecordIssue,
    RecordWarning, Resolution, ResolutionState, SignalSource, TradeId, TradeRecord,
    MAX_ABS_PERCENT_GAIN,
};
pub use history::{load_trades, parse_trades, LoadError, TradeFormat, TradeHistory};
pub use interval::{round1, wilson_interval, WilsonInterval, DEFAULT_Z};
pub use reliability::{ReliabilityThresholds, SampleReliability};
