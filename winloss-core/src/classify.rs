//! Outcome classifier: threshold-dependent win/loss/breakeven labels.
//!
//! The label answers "what if the stop had been set at `threshold` percent",
//! so it can disagree with the upstream `resolution_state`:
//!
//! - `percent_gain >= 0` → win (a flat trade counts as a win)
//! - `percent_gain <= -threshold` → loss (inclusive on the loss side)
//! - anything in between → breakeven
//!
//! The win check runs first, so at threshold 0 a flat trade is still a win and
//! every negative trade is a loss.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{RecordIssue, Resolution, TradeId, TradeRecord};

/// Errors from constructing a loss threshold.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdError {
    #[error("loss threshold must be finite, got {0}")]
    NonFinite(f64),
    #[error("loss threshold must be >= 0, got {0}")]
    Negative(f64),
}

/// A validated loss threshold in percent (e.g. `3.0` means a 3% loss).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct LossThreshold(f64);

impl LossThreshold {
    pub fn new(percent: f64) -> Result<Self, ThresholdError> {
        if !percent.is_finite() {
            return Err(ThresholdError::NonFinite(percent));
        }
        if percent < 0.0 {
            return Err(ThresholdError::Negative(percent));
        }
        // Normalize -0.0 so serialized output is stable.
        Ok(Self(percent + 0.0))
    }

    pub fn percent(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for LossThreshold {
    type Error = ThresholdError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LossThreshold> for f64 {
    fn from(t: LossThreshold) -> f64 {
        t.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeLabel {
    Win,
    Loss,
    Breakeven,
    Expired,
}

impl OutcomeLabel {
    /// Win or loss: counts toward the win-rate denominator.
    pub fn is_decided(&self) -> bool {
        matches!(self, Self::Win | Self::Loss)
    }
}

/// Label for one trade at one threshold. Ephemeral; recomputed per query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedOutcome {
    pub trade_id: TradeId,
    pub label: OutcomeLabel,
    /// Recorded realized return. `None` only for expired trades that never
    /// recorded one.
    pub effective_gain: Option<f64>,
}

/// Why a record produced no label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Open trades are excluded from every statistic.
    Open,
    /// Resolved upstream but the realized return is unusable.
    Invalid(RecordIssue),
}

/// Label for a realized return alone.
pub fn label_for_gain(percent_gain: f64, threshold: LossThreshold) -> OutcomeLabel {
    if percent_gain >= 0.0 {
        OutcomeLabel::Win
    } else if percent_gain <= -threshold.percent() {
        OutcomeLabel::Loss
    } else {
        OutcomeLabel::Breakeven
    }
}

/// Classify a trade at the given threshold.
pub fn classify(
    trade: &TradeRecord,
    threshold: LossThreshold,
) -> Result<ClassifiedOutcome, Exclusion> {
    let (label, effective_gain) = match trade.resolution() {
        Resolution::Open => return Err(Exclusion::Open),
        Resolution::Unresolved(issue) => return Err(Exclusion::Invalid(issue)),
        Resolution::Expired { percent_gain } => (OutcomeLabel::Expired, percent_gain),
        Resolution::Resolved { percent_gain } => {
            (label_for_gain(percent_gain, threshold), Some(percent_gain))
        }
    };
    Ok(ClassifiedOutcome {
        trade_id: trade.id.clone(),
        label,
        effective_gain,
    })
}
