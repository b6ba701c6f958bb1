//! Sample-size reliability grading. Every report carries one so consumers can
//! discount small-sample conclusions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleReliability {
    Low,
    Medium,
    High,
}

impl SampleReliability {
    pub fn from_count(decided_trades: usize, thresholds: &ReliabilityThresholds) -> Self {
        if decided_trades >= thresholds.high {
            Self::High
        } else if decided_trades >= thresholds.medium {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for SampleReliability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Minimum decided-trade counts for each grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReliabilityThresholds {
    pub high: usize,
    pub medium: usize,
}

impl Default for ReliabilityThresholds {
    fn default() -> Self {
        Self {
            high: 50,
            medium: 20,
        }
    }
}
