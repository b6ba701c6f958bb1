//! TradeRecord: a closed (or still open) trade idea as recorded upstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::TradeId;
use super::warning::RecordIssue;

/// Largest realized return magnitude accepted, in percent (a 10,000x move).
///
/// Anything beyond is a unit or data-entry error, and sums of such values can
/// overflow to infinity.
pub const MAX_ABS_PERCENT_GAIN: f64 = 1_000_000.0;

/// Instrument class of the traded symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Option,
    Crypto,
    Future,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Option => "option",
            Self::Crypto => "crypto",
            Self::Future => "future",
        }
    }
}

/// Signal engine that produced the trade idea. Unrecognized tags map to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSource {
    Ai,
    Quant,
    Hybrid,
    Flow,
    Lotto,
    #[serde(other)]
    Other,
}

impl SignalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Quant => "quant",
            Self::Hybrid => "hybrid",
            Self::Flow => "flow",
            Self::Lotto => "lotto",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Long => "long",
            Self::Short => "short",
        }
    }
}

/// Outcome label as recorded by the upstream system.
///
/// This is authoritative for "did the trade hit its original stop or target".
/// The threshold-dependent label from [`crate::classify`] is a separate
/// question and the two are allowed to disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionState {
    Open,
    Won,
    Lost,
    Expired,
}

/// Holding-period cohort tag. Unrecognized tags map to `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoldingPeriod {
    Intraday,
    Swing,
    Position,
    #[serde(other)]
    Other,
}

impl HoldingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intraday => "intraday",
            Self::Swing => "swing",
            Self::Position => "position",
            Self::Other => "other",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.as_str())
            }
        })*
    };
}

display_as_str!(AssetType, SignalSource, Direction, HoldingPeriod);

/// A trade record supplied by the trade-history provider. Never mutated here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    // ── Identification ──
    pub id: TradeId,
    pub symbol: String,
    pub asset_type: AssetType,
    pub source: SignalSource,
    pub direction: Direction,

    // ── Plan ──
    /// Only expiration forensics reads the plan prices; see [`TradeRecord::plan`].
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub target_price: Option<f64>,
    #[serde(default)]
    pub stop_loss: Option<f64>,

    // ── Resolution ──
    /// Realized signed percent return; `None` while open.
    #[serde(default)]
    pub percent_gain: Option<f64>,
    pub resolution_state: ResolutionState,
    pub holding_period: HoldingPeriod,

    // ── Excursion (expired trades) ──
    #[serde(default)]
    pub highest_reached: Option<f64>,
    #[serde(default)]
    pub lowest_reached: Option<f64>,

    // ── Post-mortem ──
    #[serde(default)]
    pub loss_reason_code: Option<String>,

    // ── Time ──
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub exit_by: Option<DateTime<Utc>>,
    #[serde(default)]
    pub entry_valid_until: Option<DateTime<Utc>>,
}

/// What a record contributes to win/loss statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// Still open: excluded from every statistic.
    Open,
    /// Won or lost upstream with a usable realized return.
    Resolved { percent_gain: f64 },
    /// Expired: excluded from win/loss statistics, kept for forensics.
    Expired { percent_gain: Option<f64> },
    /// Won or lost upstream but the realized return is unusable.
    Unresolved(RecordIssue),
}

/// Validated entry, target and stop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePlan {
    pub entry: f64,
    pub target: f64,
    pub stop: f64,
}

/// Price extremes observed over the trade's life.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Excursion {
    pub highest: f64,
    pub lowest: f64,
}

impl TradeRecord {
    /// Classify which statistics this record may enter.
    pub fn resolution(&self) -> Resolution {
        match self.resolution_state {
            ResolutionState::Open => Resolution::Open,
            ResolutionState::Expired => Resolution::Expired {
                percent_gain: self.percent_gain.filter(|g| gain_issue(*g).is_none()),
            },
            ResolutionState::Won | ResolutionState::Lost => match self.percent_gain {
                None => Resolution::Unresolved(RecordIssue::MissingPercentGain),
                Some(g) => match gain_issue(g) {
                    Some(issue) => Resolution::Unresolved(issue),
                    None => Resolution::Resolved { percent_gain: g },
                },
            },
        }
    }

    /// Both extremes, when present and usable.
    pub fn excursion(&self) -> Option<Excursion> {
        let usable = |p: f64| p.is_finite() && p > 0.0;
        match (self.highest_reached, self.lowest_reached) {
            (Some(highest), Some(lowest)) if usable(highest) && usable(lowest) && highest >= lowest => {
                Some(Excursion { highest, lowest })
            }
            _ => None,
        }
    }

    /// The planned prices, when all three are recorded and consistent.
    ///
    /// Prices must be positive and finite, and neither target nor stop may sit
    /// at the entry price (zero implied reward or risk). For a long the target
    /// is above entry and the stop below; mirrored for a short.
    pub fn plan(&self) -> Result<PricePlan, RecordIssue> {
        let (Some(entry), Some(target), Some(stop)) =
            (self.entry_price, self.target_price, self.stop_loss)
        else {
            return Err(RecordIssue::MissingPrices);
        };
        if [entry, target, stop]
            .iter()
            .any(|p| !p.is_finite() || *p <= 0.0)
            || target == entry
            || stop == entry
        {
            return Err(RecordIssue::InvalidPrices);
        }
        let (target_ok, stop_ok) = match self.direction {
            Direction::Long => (target > entry, stop < entry),
            Direction::Short => (target < entry, stop > entry),
        };
        if !target_ok {
            Err(RecordIssue::TargetOnWrongSide)
        } else if !stop_ok {
            Err(RecordIssue::StopOnWrongSide)
        } else {
            Ok(PricePlan {
                entry,
                target,
                stop,
            })
        }
    }

    /// Normalized post-mortem reason; `None` when missing or blank.
    pub fn loss_reason(&self) -> Option<&str> {
        self.loss_reason_code
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
    }
}

fn gain_issue(gain: f64) -> Option<RecordIssue> {
    if !gain.is_finite() {
        Some(RecordIssue::NonFinitePercentGain)
    } else if gain.abs() > MAX_ABS_PERCENT_GAIN {
        Some(RecordIssue::ImplausiblePercentGain)
    } else {
        None
    }
}
