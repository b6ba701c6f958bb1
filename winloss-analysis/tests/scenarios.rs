//! End-to-end scenarios over small hand-built batches.

use chrono::{TimeZone, Utc};
use winloss_analysis::{
    analyze_expirations, simulate, summarize, ProfitFactor, ThresholdSimulator,
};
use winloss_core::{
    AnalysisConfig, AssetType, Direction, HoldingPeriod, LossThreshold, ResolutionState,
    SampleReliability, SignalSource, TradeId, TradeRecord,
};

fn make_trade(id: &str, gain: Option<f64>, state: ResolutionState) -> TradeRecord {
    TradeRecord {
        id: TradeId::new(id),
        symbol: "QQQ".to_string(),
        asset_type: AssetType::Stock,
        source: SignalSource::Ai,
        direction: Direction::Long,
        entry_price: Some(50.0),
        target_price: Some(55.0),
        stop_loss: Some(48.0),
        percent_gain: gain,
        resolution_state: state,
        holding_period: HoldingPeriod::Swing,
        highest_reached: None,
        lowest_reached: None,
        loss_reason_code: None,
        timestamp: Utc.with_ymd_and_hms(2024, 6, 3, 13, 30, 0).unwrap(),
        exit_by: None,
        entry_valid_until: None,
    }
}

fn closed(id: &str, gain: f64) -> TradeRecord {
    let state = if gain >= 0.0 {
        ResolutionState::Won
    } else {
        ResolutionState::Lost
    };
    make_trade(id, Some(gain), state)
}

fn threshold(p: f64) -> LossThreshold {
    LossThreshold::new(p).unwrap()
}

#[test]
fn test_ten_trade_batch_at_three_percent() {
    let gains = [2.0, 4.5, 15.0, 7.0, 3.2, 11.0, -8.0, -5.5, -3.0, -2.0];
    let trades: Vec<TradeRecord> = gains
        .iter()
        .enumerate()
        .map(|(i, g)| closed(&format!("t{i}"), *g))
        .collect();

    let r = summarize(&trades, threshold(3.0), &AnalysisConfig::default());

    assert_eq!(r.wins, 6);
    // -2% sits inside the 3% band: breakeven, not a loss.
    assert_eq!(r.losses, 3);
    assert_eq!(r.breakeven, 1);
    assert_eq!(r.decided_trades, 9);
    assert!((r.win_rate - 6.0 / 9.0 * 100.0).abs() < 1e-9);
    assert_eq!(r.sample_reliability, SampleReliability::Low);
    assert_eq!(r.win_rate_interval.sample_size, 9);
    assert!(r.win_rate_interval.lower < r.win_rate && r.win_rate < r.win_rate_interval.upper);
}

#[test]
fn test_empty_batch_every_component() {
    let config = AnalysisConfig::default();
    let r = summarize(&[], threshold(3.0), &config);
    assert_eq!(r.wins + r.losses + r.breakeven + r.decided_trades, 0);
    assert_eq!(r.win_rate, 0.0);
    assert_eq!(r.profit_factor, ProfitFactor::Finite(0.0));
    assert_eq!(r.sample_reliability, SampleReliability::Low);

    let sim = simulate(&[], &config.thresholds, &config).unwrap();
    assert_eq!(sim.simulations.len(), config.thresholds.len());
    assert!(sim.optimal.is_none());

    let exp = analyze_expirations(&[], &config.expiration);
    assert_eq!(exp.total_expired, 0);
    assert!(exp.recommendations.is_empty());

    assert!(winloss_analysis::aggregate_loss_patterns(&[], threshold(3.0)).is_empty());
}

#[test]
fn test_sweep_denominator_excludes_breakeven() {
    let trades: Vec<TradeRecord> = (0..8).map(|i| closed(&format!("m{i}"), -7.0)).collect();
    let sim = simulate(&trades, &[0.0, 5.0, 10.0], &AnalysisConfig::default()).unwrap();

    let at = |t: f64| {
        sim.simulations
            .iter()
            .find(|p| p.threshold_percent() == t)
            .unwrap()
    };
    assert_eq!(at(0.0).stats.losses, 8);
    assert_eq!(at(5.0).stats.losses, 8);
    assert_eq!(at(10.0).stats.losses, 0);
    assert_eq!(at(10.0).stats.breakeven, 8);
    assert_eq!(at(10.0).stats.decided_trades, 0);
    assert!(at(10.0).stats.win_rate_interval.is_insufficient());
}

#[test]
fn test_profit_factor_without_losses() {
    let trades = vec![closed("a", 20.0), closed("b", 30.0)];
    let r = summarize(&trades, threshold(3.0), &AnalysisConfig::default());
    assert_eq!(r.gross_profit, 50.0);
    assert_eq!(r.gross_loss, 0.0);
    assert_eq!(r.profit_factor, ProfitFactor::Infinite);
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["profit_factor"], "∞");
}

#[test]
fn test_upstream_state_and_threshold_label_disagree() {
    // Recorded as a loss at the original stop, a -2.5% close is breakeven at 3%.
    let trades = vec![closed("x", -2.5)];
    let r = summarize(&trades, threshold(3.0), &AnalysisConfig::default());
    assert_eq!(trades[0].resolution_state, ResolutionState::Lost);
    assert_eq!(r.breakeven, 1);
    assert_eq!(r.losses, 0);
}

#[test]
fn test_open_and_expired_never_counted() {
    let trades = vec![
        make_trade("o", None, ResolutionState::Open),
        make_trade("e", Some(-9.0), ResolutionState::Expired),
        closed("w", 1.0),
    ];
    let r = summarize(&trades, threshold(3.0), &AnalysisConfig::default());
    assert_eq!(r.decided_trades, 1);
    assert_eq!(r.open, 1);
    assert_eq!(r.expired, 1);
    assert_eq!(r.max_loss_percent, 0.0);
}

#[test]
fn test_expiration_through_target_sets_both_flags() {
    let mut t = make_trade("e", None, ResolutionState::Expired);
    t.highest_reached = Some(56.0);
    t.lowest_reached = Some(49.5);
    let r = analyze_expirations(&[t], &AnalysisConfig::default().expiration);
    let f = &r.trades[0];
    assert!(f.progress_to_target_percent >= 100.0);
    assert!(f.almost_hit_target);
    assert!(f.very_close);
    assert!(!f.would_have_hit_stop);
}

#[test]
fn test_optimal_requires_reliable_sample() {
    // 30 trades: wins at +4, losses at -5; every threshold ≤ 5 grades medium.
    let trades: Vec<TradeRecord> = (0..30)
        .map(|i| closed(&format!("r{i}"), if i % 3 == 0 { -5.0 } else { 4.0 }))
        .collect();
    let config = AnalysisConfig::default();
    let sim = ThresholdSimulator::new(&config)
        .run(&trades, &[1.0, 3.0, 6.0])
        .unwrap();

    // At 6% the losses vanish: 20 decided, still medium, and the best expectancy.
    let opt = sim.optimal.unwrap();
    assert_eq!(opt.threshold_percent, 6.0);
    assert_eq!(opt.point.stats.decided_trades, 20);
    assert!(opt.point.stats.sample_reliability >= SampleReliability::Medium);
    assert!(!opt.rationale.is_empty());
}

#[test]
fn test_optimal_withheld_when_every_point_is_low() {
    let trades: Vec<TradeRecord> = (0..10).map(|i| closed(&format!("s{i}"), 1.0)).collect();
    let sim = simulate(&trades, &[1.0, 2.0], &AnalysisConfig::default()).unwrap();
    assert!(sim.optimal.is_none());
}
