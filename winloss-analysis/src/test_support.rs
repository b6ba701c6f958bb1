//! Record builders shared by the unit tests in this crate.

use chrono::{TimeZone, Utc};
use winloss_core::{
    AssetType, Direction, HoldingPeriod, ResolutionState, SignalSource, TradeId, TradeRecord,
};

pub const ENTRY: f64 = 100.0;

/// A long stock swing trade at entry 100 / target 110 / stop 95, won or lost
/// according to the sign of `gain`.
pub fn resolved_trade(id: &str, gain: f64) -> TradeRecord {
    TradeRecord {
        id: TradeId::new(id),
        symbol: "SPY".into(),
        asset_type: AssetType::Stock,
        source: SignalSource::Quant,
        direction: Direction::Long,
        entry_price: Some(ENTRY),
        target_price: Some(110.0),
        stop_loss: Some(95.0),
        percent_gain: Some(gain),
        resolution_state: if gain >= 0.0 {
            ResolutionState::Won
        } else {
            ResolutionState::Lost
        },
        holding_period: HoldingPeriod::Swing,
        highest_reached: None,
        lowest_reached: None,
        loss_reason_code: None,
        timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 15, 0, 0).unwrap(),
        exit_by: None,
        entry_valid_until: None,
    }
}

pub fn open_trade(id: &str) -> TradeRecord {
    TradeRecord {
        percent_gain: None,
        resolution_state: ResolutionState::Open,
        ..resolved_trade(id, 0.0)
    }
}

/// Expired long trade with the given price extremes.
pub fn expired_trade(id: &str, highest: f64, lowest: f64) -> TradeRecord {
    TradeRecord {
        percent_gain: None,
        resolution_state: ResolutionState::Expired,
        highest_reached: Some(ENTRY + highest),
        lowest_reached: Some(ENTRY - lowest),
        ..resolved_trade(id, 0.0)
    }
}

pub fn losing_trade(id: &str, gain: f64, reason: Option<&str>) -> TradeRecord {
    TradeRecord {
        loss_reason_code: reason.map(str::to_string),
        ..resolved_trade(id, gain)
    }
}
