//! Stop-loss threshold simulator: "what if the stop had been X%" across a sweep.
//!
//! Each threshold re-classifies the original batch from scratch; no state is
//! shared between sweep points, so the sweep may run in parallel. Results are
//! never smoothed or interpolated: a tighter stop can show a higher win rate
//! and a lower expectancy at the same time.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::mem;
use tracing::{debug, warn};

use winloss_core::{
    AnalysisConfig, LossThreshold, RecordWarning, SampleReliability, ThresholdError, TradeRecord,
};

use crate::summary::{summarize_iter, SummaryReport};

/// One row of the sweep: the summary at one threshold.
///
/// Serializes as the bare summary; the threshold is its `loss_threshold_percent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationPoint {
    pub stats: SummaryReport,
}

impl SimulationPoint {
    pub fn threshold_percent(&self) -> f64 {
        self.stats.loss_threshold_percent
    }
}

/// The selected threshold and why it was chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimalThreshold {
    pub threshold_percent: f64,
    pub point: SimulationPoint,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Ordered by threshold ascending, one per distinct threshold.
    pub simulations: Vec<SimulationPoint>,
    /// `None` means insufficient data: no threshold met `min_reliability`.
    pub optimal: Option<OptimalThreshold>,
    pub min_reliability: SampleReliability,
    /// Record problems are threshold-independent, so they are reported once.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RecordWarning>,
}

/// Sweep executor.
///
/// Runs one summary per threshold, optionally in parallel. Both paths produce
/// identical output.
pub struct ThresholdSimulator<'a> {
    config: &'a AnalysisConfig,
    parallel: bool,
}

impl<'a> ThresholdSimulator<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self {
            config,
            parallel: true,
        }
    }

    /// Enables or disables parallel execution.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sweep `thresholds` over `trades`.
    ///
    /// Thresholds are validated, sorted ascending and deduplicated before the
    /// sweep. An empty list yields an empty result.
    pub fn run(
        &self,
        trades: &[TradeRecord],
        thresholds: &[f64],
    ) -> Result<SimulationResult, ThresholdError> {
        let thresholds = normalize_thresholds(thresholds)?;

        let mut simulations: Vec<SimulationPoint> = if self.parallel {
            thresholds
                .par_iter()
                .map(|t| self.point(trades, *t))
                .collect()
        } else {
            thresholds.iter().map(|t| self.point(trades, *t)).collect()
        };

        let warnings = simulations
            .first_mut()
            .map(|p| mem::take(&mut p.stats.warnings))
            .unwrap_or_default();
        for p in &mut simulations {
            p.stats.warnings.clear();
        }

        if !warnings.is_empty() {
            warn!(
                skipped = warnings.len(),
                "resolved trades without a usable percent gain were left out of the sweep"
            );
        }

        let min_reliability = self.config.min_reliability_for_optimal;
        let optimal = select_optimal(&simulations, min_reliability);

        match &optimal {
            Some(o) => debug!(
                points = simulations.len(),
                threshold = o.threshold_percent,
                "threshold sweep complete"
            ),
            None if !simulations.is_empty() => warn!(
                points = simulations.len(),
                min_reliability = %min_reliability,
                "no threshold met the reliability bar; optimal threshold withheld"
            ),
            None => {}
        }

        Ok(SimulationResult {
            simulations,
            optimal,
            min_reliability,
            warnings,
        })
    }

    fn point(&self, trades: &[TradeRecord], threshold: LossThreshold) -> SimulationPoint {
        SimulationPoint {
            stats: summarize_iter(trades, threshold, self.config),
        }
    }
}

/// Sweep with default settings (parallel).
pub fn simulate(
    trades: &[TradeRecord],
    thresholds: &[f64],
    config: &AnalysisConfig,
) -> Result<SimulationResult, ThresholdError> {
    ThresholdSimulator::new(config).run(trades, thresholds)
}

fn normalize_thresholds(thresholds: &[f64]) -> Result<Vec<LossThreshold>, ThresholdError> {
    let mut out = thresholds
        .iter()
        .map(|t| LossThreshold::new(*t))
        .collect::<Result<Vec<_>, _>>()?;
    out.sort_by(|a, b| a.percent().total_cmp(&b.percent()));
    out.dedup();
    Ok(out)
}

/// Highest expectancy among points graded at least `min_reliability`; ties go
/// to the higher profit factor, then to the lower (tighter) threshold.
pub fn select_optimal(
    simulations: &[SimulationPoint],
    min_reliability: SampleReliability,
) -> Option<OptimalThreshold> {
    let mut best: Option<&SimulationPoint> = None;

    for point in simulations
        .iter()
        .filter(|p| p.stats.sample_reliability >= min_reliability && p.stats.decided_trades > 0)
    {
        let better = match best {
            None => true,
            Some(current) => rank(point, current) == Ordering::Greater,
        };
        if better {
            best = Some(point);
        }
    }

    best.map(|p| OptimalThreshold {
        threshold_percent: p.threshold_percent(),
        rationale: rationale(p, simulations.len()),
        point: p.clone(),
    })
}

fn rank(a: &SimulationPoint, b: &SimulationPoint) -> Ordering {
    a.stats
        .expectancy
        .total_cmp(&b.stats.expectancy)
        .then_with(|| {
            a.stats
                .profit_factor
                .value()
                .total_cmp(&b.stats.profit_factor.value())
        })
}

fn rationale(point: &SimulationPoint, candidates: usize) -> String {
    let s = &point.stats;
    format!(
        "maximizes expectancy ({:+.2}% per decided trade) among {} simulated thresholds; \
         {} decided trades ({} reliability), win rate {:.1}%, profit factor {}",
        s.expectancy, candidates, s.decided_trades, s.sample_reliability, s.win_rate, s.profit_factor
    )
}
