//! Per-cohort summaries: the same statistics split by one categorical tag.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use winloss_core::{AnalysisConfig, LossThreshold, TradeRecord};

use crate::summary::{summarize_iter, SummaryReport};

/// Which tag to split the batch by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CohortKey {
    Source,
    AssetType,
    Direction,
    HoldingPeriod,
}

impl CohortKey {
    /// Cohort name of one record under this key.
    pub fn cohort_of(&self, trade: &TradeRecord) -> &'static str {
        match self {
            Self::Source => trade.source.as_str(),
            Self::AssetType => trade.asset_type.as_str(),
            Self::Direction => trade.direction.as_str(),
            Self::HoldingPeriod => trade.holding_period.as_str(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::AssetType => "asset_type",
            Self::Direction => "direction",
            Self::HoldingPeriod => "holding_period",
        }
    }
}

impl fmt::Display for CohortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortSummary {
    pub cohort: String,
    pub report: SummaryReport,
}

/// One summary per non-empty cohort, ordered by cohort name.
///
/// Each cohort is graded on its own decided-trade count, so a batch graded
/// `high` overall can still contain `low` cohorts.
pub fn summarize_by(
    trades: &[TradeRecord],
    threshold: LossThreshold,
    config: &AnalysisConfig,
    key: CohortKey,
) -> Vec<CohortSummary> {
    let mut groups: BTreeMap<&'static str, Vec<&TradeRecord>> = BTreeMap::new();
    for trade in trades {
        groups.entry(key.cohort_of(trade)).or_default().push(trade);
    }

    groups
        .into_iter()
        .map(|(cohort, members)| CohortSummary {
            cohort: cohort.to_string(),
            report: summarize_iter(members, threshold, config),
        })
        .collect()
}
