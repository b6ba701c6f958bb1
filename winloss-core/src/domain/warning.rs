//! Per-record warnings. A bad record is dropped from one computation, never the batch.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::TradeId;

/// Why a record could not take part in a computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordIssue {
    /// Won/lost upstream but no realized return recorded.
    MissingPercentGain,
    NonFinitePercentGain,
    /// Magnitude above [`MAX_ABS_PERCENT_GAIN`](super::MAX_ABS_PERCENT_GAIN).
    ImplausiblePercentGain,
    /// Expired without both `highest_reached` and `lowest_reached`.
    MissingExcursion,
    /// Entry, target or stop not recorded.
    MissingPrices,
    /// Non-positive, non-finite, or zero-distance entry/target/stop.
    InvalidPrices,
    /// Target sits on the adverse side of entry for the trade's direction.
    TargetOnWrongSide,
    /// Stop sits on the favorable side of entry for the trade's direction.
    StopOnWrongSide,
    /// Row could not be decoded at all. `position` is 1-based: the line for
    /// JSON Lines and CSV, the array index + 1 for a JSON array.
    Malformed { position: usize },
}

impl fmt::Display for RecordIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::MissingPercentGain => "missing percent gain",
            Self::NonFinitePercentGain => "non-finite percent gain",
            Self::ImplausiblePercentGain => "implausible percent gain",
            Self::MissingExcursion => "missing highest/lowest reached",
            Self::MissingPrices => "missing entry/target/stop prices",
            Self::InvalidPrices => "invalid entry/target/stop prices",
            Self::TargetOnWrongSide => "target on wrong side of entry",
            Self::StopOnWrongSide => "stop on wrong side of entry",
            Self::Malformed { position } => {
                return write!(f, "malformed record at position {position}")
            }
        };
        f.write_str(msg)
    }
}

/// The computation a record was excluded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    Load,
    Summary,
    Expiration,
}

impl fmt::Display for AnalysisStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::Summary => "summary",
            Self::Expiration => "expiration",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordWarning {
    pub trade_id: TradeId,
    pub stage: AnalysisStage,
    pub issue: RecordIssue,
}

impl RecordWarning {
    pub fn new(trade_id: &TradeId, stage: AnalysisStage, issue: RecordIssue) -> Self {
        Self {
            trade_id: trade_id.clone(),
            stage,
            issue,
        }
    }
}

impl fmt::Display for RecordWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "trade {}: {} (excluded from {})",
            self.trade_id, self.issue, self.stage
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_trade_and_stage() {
        let w = RecordWarning::new(
            &TradeId::new("abc"),
            AnalysisStage::Expiration,
            RecordIssue::MissingExcursion,
        );
        assert_eq!(
            w.to_string(),
            "trade abc: missing highest/lowest reached (excluded from expiration)"
        );
    }

    #[test]
    fn issue_wire_name_is_snake_case() {
        let json = serde_json::to_string(&RecordIssue::TargetOnWrongSide).unwrap();
        assert_eq!(json, "\"target_on_wrong_side\"");
        let json = serde_json::to_string(&RecordIssue::Malformed { position: 4 }).unwrap();
        assert_eq!(json, r#"{"malformed":{"position":4}}"#);
    }

    #[test]
    fn malformed_display_names_position() {
        let w = RecordWarning::new(
            &TradeId::new("row-4"),
            AnalysisStage::Load,
            RecordIssue::Malformed { position: 4 },
        );
        assert_eq!(
            w.to_string(),
            "trade row-4: malformed record at position 4 (excluded from load)"
        );
    }
}
