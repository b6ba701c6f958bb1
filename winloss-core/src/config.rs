//! Engine configuration. Every field has a default, so an empty TOML file
//! (or no file at all) yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::classify::{LossThreshold, ThresholdError};
use crate::interval::DEFAULT_Z;
use crate::reliability::{ReliabilityThresholds, SampleReliability};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid threshold: {0}")]
    Threshold(#[from] ThresholdError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Stop-loss sweep used when the caller does not supply one.
pub const DEFAULT_SWEEP: [f64; 14] = [
    0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 12.0, 15.0, 20.0,
];

/// Top-level analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Platform-wide loss threshold in percent.
    pub loss_threshold_percent: f64,
    /// Thresholds evaluated by the stop-loss simulator.
    pub thresholds: Vec<f64>,
    /// z for Wilson intervals (1.96 = 95%).
    pub confidence_z: f64,
    /// Interior edges of the return distribution, strictly increasing.
    /// `n` edges produce `n + 1` buckets.
    pub distribution_bucket_edges: Vec<f64>,
    /// A simulated threshold must reach this grade to be picked as optimal.
    pub min_reliability_for_optimal: SampleReliability,
    pub reliability: ReliabilityThresholds,
    pub expiration: ExpirationConfig,
    pub bootstrap: BootstrapConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            loss_threshold_percent: 3.0,
            thresholds: DEFAULT_SWEEP.to_vec(),
            confidence_z: DEFAULT_Z,
            distribution_bucket_edges: vec![-10.0, -5.0, 0.0, 5.0, 10.0],
            min_reliability_for_optimal: SampleReliability::Medium,
            reliability: ReliabilityThresholds::default(),
            expiration: ExpirationConfig::default(),
            bootstrap: BootstrapConfig::default(),
        }
    }
}

/// Heuristic cut-offs for expiration forensics and its recommendations.
/// All values are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExpirationConfig {
    /// Progress to target at which a trade "almost hit" it.
    pub almost_hit_percent: f64,
    /// Progress to target at which a trade was "very close".
    pub very_close_percent: f64,
    /// Cohort share of almost-hits above which a wider exit window is suggested.
    pub widen_window_share_percent: f64,
    /// Cohort share of almost-hits above which that suggestion is critical.
    pub critical_share_percent: f64,
    /// Overall share of very-close trades above which targets look too far.
    pub target_too_far_share_percent: f64,
    /// Cohort share of stop breaches above which stop enforcement is flagged.
    pub stop_breach_share_percent: f64,
    /// Mean progress below which follow-through is called weak.
    pub weak_progress_percent: f64,
    /// Cohorts smaller than this never produce recommendations.
    pub min_cohort_size: usize,
}

impl Default for ExpirationConfig {
    fn default() -> Self {
        Self {
            almost_hit_percent: 75.0,
            very_close_percent: 90.0,
            widen_window_share_percent: 40.0,
            critical_share_percent: 60.0,
            target_too_far_share_percent: 25.0,
            stop_breach_share_percent: 50.0,
            weak_progress_percent: 25.0,
            min_cohort_size: 5,
        }
    }
}

/// Resampling settings for the expectancy confidence interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapConfig {
    pub n_resamples: usize,
    /// RNG seed for reproducibility.
    pub seed: u64,
    /// Fewer decided trades than this yields no interval.
    pub min_sample: usize,
    /// Two-sided coverage, e.g. 90 → 5th..95th percentile.
    pub confidence_percent: f64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            n_resamples: 1000,
            seed: 42,
            min_sample: 10,
            confidence_percent: 90.0,
        }
    }
}

impl AnalysisConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// The platform-wide threshold as a validated value.
    pub fn loss_threshold(&self) -> Result<LossThreshold, ThresholdError> {
        LossThreshold::new(self.loss_threshold_percent)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        LossThreshold::new(self.loss_threshold_percent)?;
        for &t in &self.thresholds {
            LossThreshold::new(t)?;
        }

        if !(self.confidence_z.is_finite() && self.confidence_z > 0.0) {
            return Err(invalid(format!(
                "confidence_z must be positive, got {}",
                self.confidence_z
            )));
        }

        let edges = &self.distribution_bucket_edges;
        if edges.is_empty() {
            return Err(invalid("distribution_bucket_edges must not be empty"));
        }
        if edges.iter().any(|e| !e.is_finite()) {
            return Err(invalid("distribution_bucket_edges must be finite"));
        }
        if edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid(
                "distribution_bucket_edges must be strictly increasing",
            ));
        }

        if self.reliability.medium > self.reliability.high {
            return Err(invalid(format!(
                "reliability.medium ({}) must not exceed reliability.high ({})",
                self.reliability.medium, self.reliability.high
            )));
        }

        self.expiration.validate()?;
        self.bootstrap.validate()?;
        Ok(())
    }
}

impl ExpirationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.almost_hit_percent > 0.0 && self.almost_hit_percent.is_finite()) {
            return Err(invalid("expiration.almost_hit_percent must be positive"));
        }
        if !(self.very_close_percent >= self.almost_hit_percent
            && self.very_close_percent.is_finite())
        {
            return Err(invalid(
                "expiration.very_close_percent must be >= almost_hit_percent",
            ));
        }
        let shares = [
            ("widen_window_share_percent", self.widen_window_share_percent),
            ("critical_share_percent", self.critical_share_percent),
            ("target_too_far_share_percent", self.target_too_far_share_percent),
            ("stop_breach_share_percent", self.stop_breach_share_percent),
            ("weak_progress_percent", self.weak_progress_percent),
        ];
        for (name, value) in shares {
            if !(0.0..=100.0).contains(&value) {
                return Err(invalid(format!(
                    "expiration.{name} must be within 0..=100, got {value}"
                )));
            }
        }
        if self.critical_share_percent < self.widen_window_share_percent {
            return Err(invalid(
                "expiration.critical_share_percent must be >= widen_window_share_percent",
            ));
        }
        if self.min_cohort_size == 0 {
            return Err(invalid("expiration.min_cohort_size must be >= 1"));
        }
        Ok(())
    }
}

impl BootstrapConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.n_resamples == 0 {
            return Err(invalid("bootstrap.n_resamples must be >= 1"));
        }
        if self.min_sample < 2 {
            return Err(invalid("bootstrap.min_sample must be >= 2"));
        }
        if !(self.confidence_percent > 0.0 && self.confidence_percent < 100.0) {
            return Err(invalid(format!(
                "bootstrap.confidence_percent must be within (0, 100), got {}",
                self.confidence_percent
            )));
        }
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}
