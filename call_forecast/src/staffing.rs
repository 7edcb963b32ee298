//! Staffing recommendations derived from predicted call volume
//!
//! A linear approximation rather than an Erlang C model: each agent handles
//! [`BASE_HANDLING_RATE`] calls per period, and the head count is inflated by
//! the inverse of the target service level.

use serde::{Deserialize, Serialize};

/// Calls one agent handles per period
pub const BASE_HANDLING_RATE: f64 = 8.0;

/// Target service level used when none is configured
pub const DEFAULT_TARGET_SERVICE_LEVEL: f64 = 0.8;

/// Recommended staff count for a predicted call volume, never below one.
///
/// ```
/// use call_forecast::staffing::recommended_staff;
///
/// assert_eq!(recommended_staff(800.0, 0.8), 125);
/// assert_eq!(recommended_staff(0.0, 0.8), 1);
/// ```
pub fn recommended_staff(predicted_calls: f64, target_service_level: f64) -> u32 {
    let raw = (predicted_calls / BASE_HANDLING_RATE) * (1.0 / target_service_level);
    if !raw.is_finite() {
        return 1;
    }
    // saturating cast: negatives land on 0
    (raw.trunc() as u32).max(1)
}

/// Applies [`recommended_staff`] at a fixed target service level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaffingEstimator {
    target_service_level: f64,
}

impl Default for StaffingEstimator {
    fn default() -> Self {
        Self {
            target_service_level: DEFAULT_TARGET_SERVICE_LEVEL,
        }
    }
}

impl StaffingEstimator {
    pub fn new(target_service_level: f64) -> Self {
        Self {
            target_service_level,
        }
    }

    pub fn target_service_level(&self) -> f64 {
        self.target_service_level
    }

    /// One recommendation per predicted point
    pub fn recommend(&self, predictions: &[f64]) -> Vec<u32> {
        predictions
            .iter()
            .map(|&p| recommended_staff(p, self.target_service_level))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_of_one() {
        assert_eq!(recommended_staff(0.0, 0.8), 1);
        assert_eq!(recommended_staff(5.0, 0.8), 1);
        assert_eq!(recommended_staff(-40.0, 0.8), 1);
        assert_eq!(recommended_staff(f64::NAN, 0.8), 1);
        assert_eq!(recommended_staff(f64::INFINITY, 0.8), 1);
        assert_eq!(recommended_staff(f64::NEG_INFINITY, 0.8), 1);
    }

    #[test]
    fn test_truncates() {
        // 100 / 8 * 1.25 = 15.625
        assert_eq!(recommended_staff(100.0, 0.8), 15);
        assert_eq!(recommended_staff(800.0, 0.8), 125);
        assert_eq!(recommended_staff(80.0, 1.0), 10);
    }

    #[test]
    fn test_monotonic_in_volume() {
        let mut previous = 0;
        for calls in 0..2000 {
            let staff = recommended_staff(calls as f64 * 0.7, 0.8);
            assert!(staff >= previous);
            previous = staff;
        }
    }

    #[test]
    fn test_estimator_recommends_per_point() {
        let estimator = StaffingEstimator::default();
        assert_eq!(estimator.target_service_level(), 0.8);
        assert_eq!(estimator.recommend(&[800.0, 0.0, 160.0]), vec![125, 1, 25]);
    }
}
