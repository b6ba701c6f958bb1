//! Domain types for closed-trade analysis.

pub mod ids;
pub mod trade;
pub mod warning;

pub use ids::TradeId;
pub use trade::{
    AssetType, Direction, Excursion, HoldingPeriod, PricePlan, Resolution, ResolutionState,
    SignalSource, TradeRecord, MAX_ABS_PERCENT_GAIN,
};
pub use warning::{AnalysisStage, RecordIssue, RecordWarning};
