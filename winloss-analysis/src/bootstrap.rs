//! Bootstrap confidence interval for expectancy.
//!
//! Expectancy over decided trades equals their mean return, so the interval
//! comes from resampling decided returns with replacement and taking
//! percentiles of the resampled means. Trade outcomes are treated as
//! exchangeable; no block structure is assumed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use winloss_core::{classify, AnalysisConfig, LossThreshold, TradeRecord};

use crate::summary::mean;

// ─── Result type ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectancyInterval {
    pub lower: f64,
    pub median: f64,
    pub upper: f64,
    /// Two-sided coverage, e.g. 90 → 5th..95th percentile.
    pub confidence_percent: f64,
    pub n_resamples: usize,
    /// Decided trades resampled.
    pub sample_size: usize,
}

impl ExpectancyInterval {
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// True when the whole interval is above zero.
    pub fn is_positive(&self) -> bool {
        self.lower > 0.0
    }
}

// ─── Bootstrap ───────────────────────────────────────────────────────

/// Resampled expectancy interval at `threshold`.
///
/// Returns `None` when fewer than `config.bootstrap.min_sample` trades are
/// decided. Deterministic for a fixed seed.
pub fn bootstrap_expectancy(
    trades: &[TradeRecord],
    threshold: LossThreshold,
    config: &AnalysisConfig,
) -> Option<ExpectancyInterval> {
    let gains: Vec<f64> = trades
        .iter()
        .filter_map(|t| classify(t, threshold).ok())
        .filter(|o| o.label.is_decided())
        .filter_map(|o| o.effective_gain)
        .collect();

    let settings = &config.bootstrap;
    if gains.len() < settings.min_sample {
        debug!(
            decided = gains.len(),
            min_sample = settings.min_sample,
            "too few decided trades for expectancy bootstrap"
        );
        return None;
    }

    let mut rng = StdRng::seed_from_u64(settings.seed);
    let n = gains.len();
    let mut means = Vec::with_capacity(settings.n_resamples);
    let mut resample = vec![0.0; n];

    for _ in 0..settings.n_resamples {
        for slot in resample.iter_mut() {
            *slot = gains[rng.gen_range(0..n)];
        }
        means.push(mean(&resample));
    }

    means.sort_by(|a, b| a.total_cmp(b));

    let tail = (100.0 - settings.confidence_percent) / 2.0;
    Some(ExpectancyInterval {
        lower: percentile_sorted(&means, tail),
        median: percentile_sorted(&means, 50.0),
        upper: percentile_sorted(&means, 100.0 - tail),
        confidence_percent: settings.confidence_percent,
        n_resamples: means.len(),
        sample_size: n,
    })
}

/// Linear-interpolated percentile of an ascending slice; `p` in `0..=100`.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0) * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = rank - lo as f64;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}
