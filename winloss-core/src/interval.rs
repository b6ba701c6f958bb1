//! Wilson score interval for a binomial proportion.
//!
//! Win-rate samples here are often tens of trades per cohort, where the
//! normal approximation undercovers. All values are percentages in `[0, 100]`
//! at full precision; round only for display.

use serde::{Deserialize, Serialize};

/// z for a two-sided 95% interval.
pub const DEFAULT_Z: f64 = 1.96;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WilsonInterval {
    /// Wilson-adjusted center (not the raw proportion).
    pub center: f64,
    pub lower: f64,
    pub upper: f64,
    /// Number of trials the interval was computed from.
    pub sample_size: usize,
}

impl WilsonInterval {
    /// The zero-sample sentinel: `{0, 0, 0}` with `sample_size = 0`.
    pub const EMPTY: Self = Self {
        center: 0.0,
        lower: 0.0,
        upper: 0.0,
        sample_size: 0,
    };

    /// True when there were no trials. Callers must not read this as a 0% rate.
    pub fn is_insufficient(&self) -> bool {
        self.sample_size == 0
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Copy with every bound rounded to one decimal place.
    pub fn rounded(&self) -> Self {
        Self {
            center: round1(self.center),
            lower: round1(self.lower),
            upper: round1(self.upper),
            sample_size: self.sample_size,
        }
    }
}

/// Wilson score interval for `successes` out of `total` at the given z.
///
/// Returns [`WilsonInterval::EMPTY`] when `total == 0`. A non-positive or
/// non-finite `z` collapses the interval onto the observed proportion.
pub fn wilson_interval(successes: usize, total: usize, z: f64) -> WilsonInterval {
    if total == 0 {
        return WilsonInterval::EMPTY;
    }
    let successes = successes.min(total);
    let n = total as f64;
    let p = successes as f64 / n;
    let z = if z.is_finite() && z > 0.0 { z } else { 0.0 };

    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denom;
    let margin = (z / denom) * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt();

    WilsonInterval {
        center: center * 100.0,
        lower: ((center - margin).max(0.0)) * 100.0,
        upper: ((center + margin).min(1.0)) * 100.0,
        sample_size: total,
    }
}

/// Round to one decimal place for display.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_total_is_sentinel() {
        let w = wilson_interval(0, 0, DEFAULT_Z);
        assert_eq!(w, WilsonInterval::EMPTY);
        assert!(w.is_insufficient());
        assert!(!w.center.is_nan());
    }

    #[test]
    fn all_successes_upper_capped_lower_below_100() {
        for n in [1, 2, 5, 10, 50, 1000] {
            let w = wilson_interval(n, n, DEFAULT_Z);
            assert!(w.upper <= 100.0, "n={n}: upper {}", w.upper);
            assert!(w.lower < 100.0, "n={n}: lower {}", w.lower);
        }
    }

    #[test]
    fn no_successes_lower_is_zero_upper_positive() {
        let w = wilson_interval(0, 10, DEFAULT_Z);
        assert_eq!(w.lower, 0.0);
        assert!(w.upper > 0.0);
    }

    #[test]
    fn known_value_half() {
        // 5/10 at z=1.96: center 50, bounds ≈ 23.66 .. 76.34
        let w = wilson_interval(5, 10, DEFAULT_Z);
        assert!((w.center - 50.0).abs() < 1e-9);
        assert!((w.lower - 23.659).abs() < 0.01, "lower {}", w.lower);
        assert!((w.upper - 76.341).abs() < 0.01, "upper {}", w.upper);
    }

    #[test]
    fn center_pulls_toward_half() {
        let w = wilson_interval(9, 10, DEFAULT_Z);
        assert!(w.center < 90.0);
        assert!(w.center > 50.0);
    }

    #[test]
    fn interval_narrows_with_sample_size() {
        let small = wilson_interval(6, 10, DEFAULT_Z);
        let large = wilson_interval(600, 1000, DEFAULT_Z);
        assert!(large.width() < small.width());
    }

    #[test]
    fn zero_z_collapses_to_proportion() {
        let w = wilson_interval(3, 4, 0.0);
        assert!((w.lower - 75.0).abs() < 1e-9);
        assert!((w.upper - 75.0).abs() < 1e-9);
    }

    #[test]
    fn rounding_is_one_decimal() {
        assert_eq!(round1(23.6592), 23.7);
        assert_eq!(round1(-4.44), -4.4);
        let w = wilson_interval(5, 10, DEFAULT_Z).rounded();
        assert_eq!(w.lower, 23.7);
    }
}
