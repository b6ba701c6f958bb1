//! Expiration forensics: how close did expired trades come to target or stop?
//!
//! Only `expired` records with usable price extremes are analyzed; anything
//! else expired is skipped with a warning. Progress is direction-aware:
//!
//! - long:  `(highest - entry) / (target - entry) · 100`
//! - short: `(entry - lowest) / (entry - target) · 100`
//!
//! floored at 0 and deliberately not capped, so a trade that traded through
//! its target reports more than 100.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use winloss_core::{
    AnalysisStage, AssetType, Direction, Excursion, ExpirationConfig, HoldingPeriod, PricePlan,
    RecordIssue, RecordWarning, ResolutionState, TradeId, TradeRecord,
};

use crate::summary::mean;

// ─── Per-trade forensics ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiredTradeForensics {
    pub trade_id: TradeId,
    pub symbol: String,
    pub asset_type: AssetType,
    pub holding_period: HoldingPeriod,
    pub direction: Direction,
    pub progress_to_target_percent: f64,
    /// Remaining distance to target as a percent of entry; `0` once reached.
    pub needed_more_percent: f64,
    /// Worst move against the trade as a percent of entry; `0` if it never went adverse.
    pub max_adverse_percent: f64,
    pub almost_hit_target: bool,
    pub very_close: bool,
    pub would_have_hit_stop: bool,
}

/// Forensics for one expired record with known extremes and a valid plan.
pub fn trade_forensics(
    trade: &TradeRecord,
    plan: PricePlan,
    excursion: Excursion,
    config: &ExpirationConfig,
) -> ExpiredTradeForensics {
    let PricePlan {
        entry,
        target,
        stop,
    } = plan;
    let Excursion { highest, lowest } = excursion;

    let (progress, remaining, adverse, stop_hit) = match trade.direction {
        Direction::Long => (
            (highest - entry) / (target - entry),
            target - highest,
            entry - lowest,
            lowest <= stop,
        ),
        Direction::Short => (
            (entry - lowest) / (entry - target),
            lowest - target,
            highest - entry,
            highest >= stop,
        ),
    };
    let progress = (progress * 100.0).max(0.0);

    ExpiredTradeForensics {
        trade_id: trade.id.clone(),
        symbol: trade.symbol.clone(),
        asset_type: trade.asset_type,
        holding_period: trade.holding_period,
        direction: trade.direction,
        progress_to_target_percent: progress,
        needed_more_percent: (remaining.max(0.0) / entry) * 100.0,
        max_adverse_percent: (adverse.max(0.0) / entry) * 100.0,
        almost_hit_target: progress >= config.almost_hit_percent,
        very_close: progress >= config.very_close_percent,
        would_have_hit_stop: stop_hit,
    }
}

// ─── Cohorts ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortStats {
    pub cohort: String,
    pub count: usize,
    pub almost_hit_target_count: usize,
    pub almost_hit_target_percent: f64,
    pub very_close_percent: f64,
    pub would_have_hit_stop_percent: f64,
    pub avg_progress_percent: f64,
    pub avg_needed_more_percent: f64,
}

impl CohortStats {
    fn from_members(cohort: &str, members: &[&ExpiredTradeForensics]) -> Self {
        let count = members.len();
        let share = |pred: fn(&ExpiredTradeForensics) -> bool| {
            percent_of(members.iter().filter(|t| pred(t)).count(), count)
        };
        let progress: Vec<f64> = members.iter().map(|t| t.progress_to_target_percent).collect();
        let needed: Vec<f64> = members.iter().map(|t| t.needed_more_percent).collect();

        Self {
            cohort: cohort.to_string(),
            count,
            almost_hit_target_count: members.iter().filter(|t| t.almost_hit_target).count(),
            almost_hit_target_percent: share(|t| t.almost_hit_target),
            very_close_percent: share(|t| t.very_close),
            would_have_hit_stop_percent: share(|t| t.would_have_hit_stop),
            avg_progress_percent: mean(&progress),
            avg_needed_more_percent: mean(&needed),
        }
    }
}

fn group_by<F>(trades: &[ExpiredTradeForensics], key: F) -> Vec<CohortStats>
where
    F: Fn(&ExpiredTradeForensics) -> &'static str,
{
    let mut groups: BTreeMap<&'static str, Vec<&ExpiredTradeForensics>> = BTreeMap::new();
    for t in trades {
        groups.entry(key(t)).or_default().push(t);
    }
    groups
        .into_iter()
        .map(|(name, members)| CohortStats::from_members(name, &members))
        .collect()
}

// ─── Recommendations ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    WidenExitWindow,
    TargetTooFar,
    StopNotEnforced,
    WeakFollowThrough,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        })
    }
}

/// Advisory text from fixed heuristics. Not a statistical estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub severity: Severity,
    /// `None` for batch-wide findings.
    pub cohort: Option<String>,
    pub message: String,
}

fn recommendations(report: &ExpirationReport, config: &ExpirationConfig) -> Vec<Recommendation> {
    let mut out = Vec::new();
    let big_enough = |c: &&CohortStats| c.count >= config.min_cohort_size;

    for c in report.by_holding_period.iter().filter(big_enough) {
        if c.almost_hit_target_percent > config.widen_window_share_percent {
            let severity = if c.almost_hit_target_percent > config.critical_share_percent {
                Severity::Critical
            } else {
                Severity::Warning
            };
            out.push(Recommendation {
                kind: RecommendationKind::WidenExitWindow,
                severity,
                cohort: Some(c.cohort.clone()),
                message: format!(
                    "{:.1}% of expired {} trades reached {}% of the way to target; \
                     consider widening the exit window for {} trades",
                    c.almost_hit_target_percent, c.cohort, config.almost_hit_percent, c.cohort
                ),
            });
        }
        if c.avg_progress_percent < config.weak_progress_percent {
            out.push(Recommendation {
                kind: RecommendationKind::WeakFollowThrough,
                severity: Severity::Info,
                cohort: Some(c.cohort.clone()),
                message: format!(
                    "expired {} trades averaged only {:.1}% progress to target; \
                     entries in this horizon show weak follow-through",
                    c.cohort, c.avg_progress_percent
                ),
            });
        }
    }

    for c in report.by_asset_type.iter().filter(big_enough) {
        if c.would_have_hit_stop_percent > config.stop_breach_share_percent {
            out.push(Recommendation {
                kind: RecommendationKind::StopNotEnforced,
                severity: Severity::Critical,
                cohort: Some(c.cohort.clone()),
                message: format!(
                    "{:.1}% of expired {} trades traded through their stop without being closed; \
                     check stop enforcement",
                    c.would_have_hit_stop_percent, c.cohort
                ),
            });
        }
    }

    if report.analyzed >= config.min_cohort_size
        && report.very_close_percent > config.target_too_far_share_percent
    {
        out.push(Recommendation {
            kind: RecommendationKind::TargetTooFar,
            severity: Severity::Warning,
            cohort: None,
            message: format!(
                "{:.1}% of expired trades got within {}% of target and still expired; \
                 targets may be set slightly too far",
                report.very_close_percent,
                100.0 - config.very_close_percent
            ),
        });
    }

    out
}

// ─── Report ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirationReport {
    /// Every record with `resolution_state = expired`.
    pub total_expired: usize,
    pub analyzed: usize,
    /// Expired but missing extremes or with unusable prices.
    pub skipped: usize,
    pub almost_hit_target_percent: f64,
    pub very_close_percent: f64,
    pub would_have_hit_stop_percent: f64,
    pub avg_progress_percent: f64,
    /// Input order.
    pub trades: Vec<ExpiredTradeForensics>,
    pub by_holding_period: Vec<CohortStats>,
    pub by_asset_type: Vec<CohortStats>,
    /// Empty when no cohort is large enough to judge.
    pub recommendations: Vec<Recommendation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<RecordWarning>,
}

/// Analyze every expired record in `trades`. Never fails; an empty or
/// expiration-free batch yields an all-zero report with no recommendations.
pub fn analyze_expirations(trades: &[TradeRecord], config: &ExpirationConfig) -> ExpirationReport {
    let mut total_expired = 0;
    let mut analyzed = Vec::new();
    let mut warnings = Vec::new();

    for trade in trades
        .iter()
        .filter(|t| t.resolution_state == ResolutionState::Expired)
    {
        total_expired += 1;
        let usable = trade.plan().and_then(|plan| {
            trade
                .excursion()
                .map(|excursion| (plan, excursion))
                .ok_or(RecordIssue::MissingExcursion)
        });
        match usable {
            Ok((plan, excursion)) => {
                analyzed.push(trade_forensics(trade, plan, excursion, config))
            }
            Err(issue) => {
                warnings.push(RecordWarning::new(&trade.id, AnalysisStage::Expiration, issue))
            }
        }
    }

    if !warnings.is_empty() {
        warn!(
            skipped = warnings.len(),
            total_expired, "expired trades skipped from forensics"
        );
    }

    let n = analyzed.len();
    let progress: Vec<f64> = analyzed.iter().map(|t| t.progress_to_target_percent).collect();

    let mut report = ExpirationReport {
        total_expired,
        analyzed: n,
        skipped: total_expired - n,
        almost_hit_target_percent: percent_of(analyzed.iter().filter(|t| t.almost_hit_target).count(), n),
        very_close_percent: percent_of(analyzed.iter().filter(|t| t.very_close).count(), n),
        would_have_hit_stop_percent: percent_of(
            analyzed.iter().filter(|t| t.would_have_hit_stop).count(),
            n,
        ),
        avg_progress_percent: mean(&progress),
        by_holding_period: group_by(&analyzed, |t| t.holding_period.as_str()),
        by_asset_type: group_by(&analyzed, |t| t.asset_type.as_str()),
        trades: analyzed,
        recommendations: Vec::new(),
        warnings,
    };
    report.recommendations = recommendations(&report, config);

    debug!(
        total_expired,
        analyzed = report.analyzed,
        recommendations = report.recommendations.len(),
        "expiration forensics complete"
    );
    report
}

fn percent_of(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{expired_trade, resolved_trade};

    fn cfg() -> ExpirationConfig {
        ExpirationConfig::default()
    }

    fn short_expired(id: &str, highest: f64, lowest: f64) -> TradeRecord {
        TradeRecord {
            direction: Direction::Short,
            target_price: Some(90.0),
            stop_loss: Some(105.0),
            highest_reached: Some(highest),
            lowest_reached: Some(lowest),
            ..expired_trade(id, 0.0, 0.0)
        }
    }

    // ── Per-trade ──

    #[test]
    fn long_progress_and_distance() {
        // entry 100, target 110, high 108 → 80% of the way, 2% of entry left
        let r = analyze_expirations(&[expired_trade("a", 8.0, 1.0)], &cfg());
        let t = &r.trades[0];
        assert!((t.progress_to_target_percent - 80.0).abs() < 1e-9);
        assert!((t.needed_more_percent - 2.0).abs() < 1e-9);
        assert!((t.max_adverse_percent - 1.0).abs() < 1e-9);
        assert!(t.almost_hit_target);
        assert!(!t.very_close);
        assert!(!t.would_have_hit_stop);
    }

    #[test]
    fn long_through_target_is_not_capped() {
        let r = analyze_expirations(&[expired_trade("a", 12.0, 1.0)], &cfg());
        let t = &r.trades[0];
        assert!(t.progress_to_target_percent >= 100.0);
        assert!(t.almost_hit_target && t.very_close);
        assert_eq!(t.needed_more_percent, 0.0);
    }

    #[test]
    fn long_never_moved_up_floors_at_zero() {
        let mut t = expired_trade("a", 0.0, 3.0);
        t.highest_reached = Some(99.0);
        t.lowest_reached = Some(97.0);
        let r = analyze_expirations(&[t], &cfg());
        assert_eq!(r.trades[0].progress_to_target_percent, 0.0);
    }

    #[test]
    fn long_stop_breach() {
        // stop at 95, low of 94
        let r = analyze_expirations(&[expired_trade("a", 2.0, 6.0)], &cfg());
        assert!(r.trades[0].would_have_hit_stop);
    }

    #[test]
    fn short_is_mirrored() {
        // entry 100, target 90, low 91 → 90%; high 106 breaches stop 105
        let r = analyze_expirations(&[short_expired("s", 106.0, 91.0)], &cfg());
        let t = &r.trades[0];
        assert!((t.progress_to_target_percent - 90.0).abs() < 1e-9);
        assert!((t.needed_more_percent - 1.0).abs() < 1e-9);
        assert!((t.max_adverse_percent - 6.0).abs() < 1e-9);
        assert!(t.very_close);
        assert!(t.would_have_hit_stop);
    }

    // ── Eligibility ──

    #[test]
    fn only_expired_records_are_considered() {
        let r = analyze_expirations(&[resolved_trade("w", 5.0)], &cfg());
        assert_eq!(r.total_expired, 0);
        assert!(r.trades.is_empty());
        assert!(r.warnings.is_empty());
    }

    #[test]
    fn missing_extremes_are_skipped_with_warning() {
        let mut t = expired_trade("x", 5.0, 1.0);
        t.lowest_reached = None;
        let r = analyze_expirations(&[t, expired_trade("y", 5.0, 1.0)], &cfg());
        assert_eq!(r.total_expired, 2);
        assert_eq!(r.analyzed, 1);
        assert_eq!(r.skipped, 1);
        assert_eq!(r.warnings[0].issue, RecordIssue::MissingExcursion);
        assert_eq!(r.warnings[0].stage, AnalysisStage::Expiration);
    }

    #[test]
    fn bad_prices_are_skipped_with_warning() {
        let mut t = expired_trade("x", 5.0, 1.0);
        t.target_price = Some(90.0); // long with target below entry
        let r = analyze_expirations(&[t], &cfg());
        assert_eq!(r.analyzed, 0);
        assert_eq!(r.warnings[0].issue, RecordIssue::TargetOnWrongSide);
    }

    #[test]
    fn missing_stop_is_skipped_with_warning() {
        let mut t = expired_trade("x", 5.0, 1.0);
        t.stop_loss = None;
        let r = analyze_expirations(&[t, expired_trade("y", 5.0, 1.0)], &cfg());
        assert_eq!(r.analyzed, 1);
        assert_eq!(r.trades[0].trade_id.as_str(), "y");
        assert_eq!(r.warnings[0].trade_id.as_str(), "x");
        assert_eq!(r.warnings[0].issue, RecordIssue::MissingPrices);
    }

    // ── Aggregation and recommendations ──

    #[test]
    fn empty_batch_has_no_recommendations() {
        let r = analyze_expirations(&[], &cfg());
        assert_eq!(r.total_expired, 0);
        assert_eq!(r.avg_progress_percent, 0.0);
        assert!(r.by_holding_period.is_empty());
        assert!(r.recommendations.is_empty());
    }

    #[test]
    fn small_cohorts_never_recommend() {
        let trades: Vec<TradeRecord> = (0..4)
            .map(|i| expired_trade(&format!("e{i}"), 9.5, 6.0))
            .collect();
        let r = analyze_expirations(&trades, &cfg());
        assert_eq!(r.almost_hit_target_percent, 100.0);
        assert!(r.recommendations.is_empty());
    }

    #[test]
    fn widen_window_critical_when_most_almost_hit() {
        let trades: Vec<TradeRecord> = (0..6)
            .map(|i| expired_trade(&format!("e{i}"), 8.0, 1.0))
            .collect();
        let r = analyze_expirations(&trades, &cfg());
        let widen = r
            .recommendations
            .iter()
            .find(|rec| rec.kind == RecommendationKind::WidenExitWindow)
            .unwrap();
        assert_eq!(widen.severity, Severity::Critical);
        assert_eq!(widen.cohort.as_deref(), Some("swing"));
    }

    #[test]
    fn weak_follow_through_and_stop_breach() {
        let trades: Vec<TradeRecord> = (0..5)
            .map(|i| expired_trade(&format!("e{i}"), 1.0, 6.0))
            .collect();
        let r = analyze_expirations(&trades, &cfg());
        let kinds: Vec<RecommendationKind> = r.recommendations.iter().map(|r| r.kind).collect();
        assert!(kinds.contains(&RecommendationKind::WeakFollowThrough));
        assert!(kinds.contains(&RecommendationKind::StopNotEnforced));
        assert!(!kinds.contains(&RecommendationKind::WidenExitWindow));
    }

    #[test]
    fn cohorts_group_by_holding_period_and_asset() {
        let mut a = expired_trade("a", 8.0, 1.0);
        a.holding_period = HoldingPeriod::Intraday;
        a.asset_type = AssetType::Crypto;
        let b = expired_trade("b", 2.0, 1.0);
        let r = analyze_expirations(&[a, b], &cfg());
        let hp: Vec<&str> = r.by_holding_period.iter().map(|c| c.cohort.as_str()).collect();
        assert_eq!(hp, vec!["intraday", "swing"]);
        assert_eq!(r.by_asset_type.len(), 2);
        assert_eq!(r.by_holding_period[0].almost_hit_target_percent, 100.0);
        assert_eq!(r.by_holding_period[1].almost_hit_target_count, 0);
    }

    #[test]
    fn recommendation_kind_serializes_as_type() {
        let rec = Recommendation {
            kind: RecommendationKind::TargetTooFar,
            severity: Severity::Warning,
            cohort: None,
            message: String::new(),
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["type"], "target_too_far");
        assert_eq!(json["severity"], "warning");
    }
}
