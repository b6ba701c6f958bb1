//! Summary statistics: pure aggregation of classified outcomes at one threshold.
//!
//! Every metric is defined for degenerate samples: no trades, no losses, no
//! wins. Nothing here panics or returns NaN; "no data" resolves to a sentinel
//! (`0`, `ProfitFactor::Infinite`, an empty Wilson interval) and the report's
//! `sample_reliability` tells consumers how much to trust the numbers. Gains
//! are bounded by `MAX_ABS_PERCENT_GAIN` before they get here, so sums stay
//! finite; ratios that still overflow resolve to their sentinels.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use tracing::{debug, warn};

use winloss_core::{
    classify, wilson_interval, AnalysisConfig, AnalysisStage, ClassifiedOutcome, Exclusion,
    LossThreshold, OutcomeLabel, RecordWarning, SampleReliability, TradeRecord, WilsonInterval,
};

/// Wire form of an unbounded profit factor.
pub const INFINITY_SENTINEL: &str = "∞";

// ─── Profit factor ──────────────────────────────────────────────────

/// Gross profit / gross loss, with an explicit unbounded case.
///
/// Serializes as a number, or as the string `"∞"` when there were profits
/// but no losses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfitFactor {
    Finite(f64),
    Infinite,
}

impl ProfitFactor {
    /// `Infinite` when `gross_loss == 0 && gross_profit > 0` (or the ratio
    /// overflows); `0` when both are zero.
    pub fn from_gross(gross_profit: f64, gross_loss: f64) -> Self {
        let ratio = gross_profit / gross_loss;
        if gross_loss > 0.0 && ratio.is_finite() {
            Self::Finite(ratio)
        } else if gross_profit > 0.0 {
            Self::Infinite
        } else {
            Self::Finite(0.0)
        }
    }

    /// Numeric value, with `Infinite` mapped to `f64::INFINITY`.
    pub fn value(&self) -> f64 {
        match self {
            Self::Finite(v) => *v,
            Self::Infinite => f64::INFINITY,
        }
    }
}

impl PartialOrd for ProfitFactor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value().partial_cmp(&other.value())
    }
}

impl fmt::Display for ProfitFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(v) => f.pad(&format!("{v:.2}")),
            Self::Infinite => f.pad(INFINITY_SENTINEL),
        }
    }
}

impl Serialize for ProfitFactor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Finite(v) => serializer.serialize_f64(*v),
            Self::Infinite => serializer.serialize_str(INFINITY_SENTINEL),
        }
    }
}

impl<'de> Deserialize<'de> for ProfitFactor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Number(f64),
            Text(String),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Number(v) => Ok(Self::Finite(v)),
            Wire::Text(s) if s == INFINITY_SENTINEL => Ok(Self::Infinite),
            Wire::Text(s) => Err(serde::de::Error::custom(format!(
                "invalid profit factor '{s}'"
            ))),
        }
    }
}

// ─── Distribution ───────────────────────────────────────────────────

/// One bucket of the return distribution. Lower bound inclusive, upper exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionBucket {
    pub range: String,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    /// Wins, losses and breakevens whose return falls in this range.
    pub count: usize,
    pub wins: usize,
    pub losses: usize,
}

impl DistributionBucket {
    /// Empty buckets for `edges` (assumed strictly increasing): `n` edges, `n + 1` buckets.
    pub fn layout(edges: &[f64]) -> Vec<Self> {
        let bucket = |range: String, lower: Option<f64>, upper: Option<f64>| Self {
            range,
            lower,
            upper,
            count: 0,
            wins: 0,
            losses: 0,
        };

        let Some((&first, &last)) = edges.first().zip(edges.last()) else {
            return vec![bucket("all".into(), None, None)];
        };

        let mut buckets = Vec::with_capacity(edges.len() + 1);
        buckets.push(bucket(format!("< {first}%"), None, Some(first)));
        for w in edges.windows(2) {
            buckets.push(bucket(
                format!("{}% to {}%", w[0], w[1]),
                Some(w[0]),
                Some(w[1]),
            ));
        }
        buckets.push(bucket(format!(">= {last}%"), Some(last), None));
        buckets
    }

    /// Index of the bucket holding `gain` for the given edges.
    pub fn index_for(edges: &[f64], gain: f64) -> usize {
        edges.partition_point(|&e| e <= gain)
    }
}

// ─── Report ─────────────────────────────────────────────────────────

/// Aggregate statistics over one batch at one loss threshold.
///
/// All percentages are full precision; round for display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryReport {
    pub loss_threshold_percent: f64,

    // ── Counts ──
    /// Every record in the input batch.
    pub total_trades: usize,
    pub open: usize,
    pub expired: usize,
    /// Won/lost upstream but unusable (see `warnings`).
    pub excluded: usize,
    pub wins: usize,
    pub losses: usize,
    pub breakeven: usize,
    /// `wins + losses`; the win-rate denominator.
    pub decided_trades: usize,

    // ── Rates ──
    pub win_rate: f64,
    pub win_rate_interval: WilsonInterval,

    // ── Magnitudes ──
    pub avg_win_percent: f64,
    /// Signed, so negative whenever there are losses.
    pub avg_loss_percent: f64,
    pub max_win_percent: f64,
    pub max_loss_percent: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,

    // ── Ratios ──
    pub profit_factor: ProfitFactor,
    /// Expected percent return per decided trade.
    pub expectancy: f64,
    /// `0` when there are no losses.
    pub payoff_ratio: f64,

    // ── Streaks over decided trades, input order ──
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,

    pub distribution: Vec<DistributionBucket>,
    pub sample_reliability: SampleReliability,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RecordWarning>,
}

impl SummaryReport {
    /// True when no trade was decided; every rate is then a sentinel.
    pub fn is_insufficient(&self) -> bool {
        self.decided_trades == 0
    }
}

/// Summarize a batch at one threshold. Never fails; an empty batch yields an
/// all-zero report graded `low`.
pub fn summarize(
    trades: &[TradeRecord],
    threshold: LossThreshold,
    config: &AnalysisConfig,
) -> SummaryReport {
    let report = summarize_iter(trades.iter(), threshold, config);
    if !report.warnings.is_empty() {
        warn!(
            excluded = report.excluded,
            total = report.total_trades,
            "resolved trades without a usable percent gain were left out of the summary"
        );
    }
    report
}

/// Summarize any collection of borrowed records. Used by cohort breakdowns and
/// the sweep, which report skipped records themselves.
pub fn summarize_iter<'a, I>(
    trades: I,
    threshold: LossThreshold,
    config: &AnalysisConfig,
) -> SummaryReport
where
    I: IntoIterator<Item = &'a TradeRecord>,
{
    let edges = &config.distribution_bucket_edges;
    let mut distribution = DistributionBucket::layout(edges);
    let mut warnings = Vec::new();

    let mut total_trades = 0;
    let mut open = 0;
    let mut expired = 0;
    let mut excluded = 0;
    let mut breakeven = 0;
    let mut win_gains: Vec<f64> = Vec::new();
    let mut loss_gains: Vec<f64> = Vec::new();
    let mut decided_sequence: Vec<OutcomeLabel> = Vec::new();

    for trade in trades {
        total_trades += 1;
        match classify(trade, threshold) {
            Err(Exclusion::Open) => open += 1,
            Err(Exclusion::Invalid(issue)) => {
                excluded += 1;
                warnings.push(RecordWarning::new(&trade.id, AnalysisStage::Summary, issue));
            }
            Ok(ClassifiedOutcome {
                label: OutcomeLabel::Expired,
                ..
            }) => expired += 1,
            Ok(ClassifiedOutcome {
                label,
                effective_gain: Some(gain),
                ..
            }) => {
                let bucket = &mut distribution[DistributionBucket::index_for(edges, gain)];
                bucket.count += 1;
                match label {
                    OutcomeLabel::Win => {
                        bucket.wins += 1;
                        win_gains.push(gain);
                    }
                    OutcomeLabel::Loss => {
                        bucket.losses += 1;
                        loss_gains.push(gain);
                    }
                    _ => breakeven += 1,
                }
                if label.is_decided() {
                    decided_sequence.push(label);
                }
            }
            // Resolved outcomes always carry a gain.
            Ok(_) => {}
        }
    }

    let wins = win_gains.len();
    let losses = loss_gains.len();
    let decided_trades = wins + losses;

    let win_rate = if decided_trades > 0 {
        wins as f64 / decided_trades as f64 * 100.0
    } else {
        0.0
    };
    let avg_win_percent = mean(&win_gains);
    let avg_loss_percent = mean(&loss_gains);
    let gross_profit: f64 = win_gains.iter().map(|g| g.abs()).sum();
    let gross_loss: f64 = loss_gains.iter().map(|g| g.abs()).sum();

    let report = SummaryReport {
        loss_threshold_percent: threshold.percent(),
        total_trades,
        open,
        expired,
        excluded,
        wins,
        losses,
        breakeven,
        decided_trades,
        win_rate,
        win_rate_interval: wilson_interval(wins, decided_trades, config.confidence_z),
        avg_win_percent,
        avg_loss_percent,
        max_win_percent: win_gains.iter().copied().fold(0.0, f64::max),
        max_loss_percent: loss_gains.iter().copied().fold(0.0, f64::min),
        gross_profit,
        gross_loss,
        profit_factor: ProfitFactor::from_gross(gross_profit, gross_loss),
        expectancy: expectancy(win_rate, avg_win_percent, avg_loss_percent),
        payoff_ratio: payoff_ratio(avg_win_percent, avg_loss_percent),
        max_consecutive_wins: max_consecutive(&decided_sequence, OutcomeLabel::Win),
        max_consecutive_losses: max_consecutive(&decided_sequence, OutcomeLabel::Loss),
        distribution,
        sample_reliability: SampleReliability::from_count(decided_trades, &config.reliability),
        warnings,
    };

    debug!(
        threshold = report.loss_threshold_percent,
        decided = report.decided_trades,
        breakeven = report.breakeven,
        excluded = report.excluded,
        "summarized batch"
    );
    report
}

// ─── Individual metric functions ────────────────────────────────────

/// `win_rate/100 · avg_win + (1 − win_rate/100) · avg_loss`.
///
/// Equals the mean return over decided trades.
pub fn expectancy(win_rate: f64, avg_win_percent: f64, avg_loss_percent: f64) -> f64 {
    let p = win_rate / 100.0;
    p * avg_win_percent + (1.0 - p) * avg_loss_percent
}

/// `avg_win / |avg_loss|`, or `0` when there is no average loss (or it is
/// too small for the ratio to be finite).
pub fn payoff_ratio(avg_win_percent: f64, avg_loss_percent: f64) -> f64 {
    if avg_loss_percent == 0.0 {
        return 0.0;
    }
    let ratio = avg_win_percent / avg_loss_percent.abs();
    if ratio.is_finite() {
        ratio
    } else {
        0.0
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn max_consecutive(sequence: &[OutcomeLabel], target: OutcomeLabel) -> usize {
    let mut max_streak = 0;
    let mut current = 0;

    for label in sequence {
        if *label == target {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}
