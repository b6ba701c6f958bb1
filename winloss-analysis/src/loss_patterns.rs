//! Loss pattern aggregation: losing trades grouped by post-mortem reason code.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use winloss_core::{classify, LossThreshold, OutcomeLabel, TradeRecord};

/// Bucket for losses with no (or a blank) reason code.
pub const UNKNOWN_REASON: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossPattern {
    pub reason: String,
    pub count: usize,
    /// Mean signed return of the losses in this bucket.
    pub avg_loss_percent: f64,
    /// Most negative return in this bucket.
    pub worst_loss_percent: f64,
    /// Share of all losses at this threshold.
    pub share_percent: f64,
}

/// Group losses at `threshold` by reason code.
///
/// Sorted by `count` descending, ties by reason ascending. Empty input, or a
/// batch with no losses, yields an empty list.
pub fn aggregate_loss_patterns(trades: &[TradeRecord], threshold: LossThreshold) -> Vec<LossPattern> {
    let mut groups: HashMap<&str, Vec<f64>> = HashMap::new();
    let mut total_losses = 0usize;

    for trade in trades {
        let Ok(outcome) = classify(trade, threshold) else {
            continue;
        };
        if outcome.label != OutcomeLabel::Loss {
            continue;
        }
        let Some(gain) = outcome.effective_gain else {
            continue;
        };
        total_losses += 1;
        groups
            .entry(trade.loss_reason().unwrap_or(UNKNOWN_REASON))
            .or_default()
            .push(gain);
    }

    let mut patterns: Vec<LossPattern> = groups
        .into_iter()
        .map(|(reason, gains)| {
            let count = gains.len();
            LossPattern {
                reason: reason.to_string(),
                count,
                avg_loss_percent: gains.iter().sum::<f64>() / count as f64,
                worst_loss_percent: gains.iter().copied().fold(f64::INFINITY, f64::min),
                share_percent: count as f64 / total_losses as f64 * 100.0,
            }
        })
        .collect();

    patterns.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));

    debug!(
        losses = total_losses,
        reasons = patterns.len(),
        threshold = threshold.percent(),
        "aggregated loss patterns"
    );
    patterns
}
