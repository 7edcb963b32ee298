//! Descriptive statistics and filters over plain `f64` slices

use crate::{MathError, Result};

/// Arithmetic mean of the values
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the mean of an empty series".to_string(),
        ));
    }

    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by `n`)
pub fn std_dev(values: &[f64]) -> Result<f64> {
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    Ok(variance.sqrt())
}

/// First differences `x[t] - x[t-1]`
pub fn difference(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Sample autocorrelation at the given lag.
///
/// Returns 0 for a series with no variance.
pub fn autocorrelation(values: &[f64], lag: usize) -> f64 {
    let n = values.len();
    if n <= lag {
        return 0.0;
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let variance: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    if variance.abs() < 1e-12 {
        return 0.0;
    }

    let covariance: f64 = (lag..n)
        .map(|i| (values[i] - mean) * (values[i - lag] - mean))
        .sum();

    covariance / variance
}

/// Centred moving average over `period` points.
///
/// Odd periods use equal weights; even periods use the 2x`period` filter
/// (half weight on both ends). Positions the window cannot cover are `None`.
pub fn centered_moving_average(values: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    if period == 0 {
        return Err(MathError::InvalidInput(
            "Period must be greater than zero".to_string(),
        ));
    }

    let half = period / 2;
    let n = values.len();
    let mut result = vec![None; n];
    if n < 2 * half + 1 {
        return Ok(result);
    }

    for (t, slot) in result.iter_mut().enumerate().take(n - half).skip(half) {
        let window = &values[t - half..=t + half];
        let value = if period % 2 == 1 {
            window.iter().sum::<f64>() / period as f64
        } else {
            let inner: f64 = window[1..window.len() - 1].iter().sum();
            (inner + 0.5 * (window[0] + window[window.len() - 1])) / period as f64
        };
        *slot = Some(value);
    }

    Ok(result)
}
