//! Additive seasonal decomposition with linear trend extrapolation

use crate::data::HistoricalSeries;
use crate::error::{ForecastError, Result};
use crate::models::{Diagnostics, ForecastMethod, ForecastingStrategy, StrategyOutput};
use forecast_math::stats::{centered_moving_average, mean};
use forecast_math::{ensure_finite, MathError};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Seasonal period in days
pub const PERIOD: usize = 7;

/// Fewest observations the model will fit (two full periods)
pub const MIN_OBSERVATIONS: usize = 2 * PERIOD;

/// Fewest defined trend points needed for a slope estimate
pub const MIN_TREND_POINTS: usize = 6;

/// Points averaged at each end of the trend for the slope
const SLOPE_WINDOW: usize = 3;

/// Trend, seasonal and residual parts of a series.
///
/// `trend` and `residual` only cover the positions the centred moving average
/// can reach, so they are `period - 1` shorter than `seasonal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionComponents {
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
}

/// Split `values` into additive trend, seasonal and residual components
pub fn decompose(values: &[f64], period: usize) -> forecast_math::Result<DecompositionComponents> {
    ensure_finite(values, "Call volume series")?;
    if period < 2 || values.len() < 2 * period {
        return Err(MathError::InsufficientData(format!(
            "Decomposition with period {} needs at least {} observations, got {}",
            period,
            2 * period,
            values.len()
        )));
    }

    let trend = centered_moving_average(values, period)?;

    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (i, (x, t)) in values.iter().zip(&trend).enumerate() {
        if let Some(t) = t {
            sums[i % period] += x - t;
            counts[i % period] += 1;
        }
    }
    let mut averages: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();
    let offset = mean(&averages)?;
    averages.iter_mut().for_each(|a| *a -= offset);

    let seasonal: Vec<f64> = (0..values.len()).map(|i| averages[i % period]).collect();
    let (trend, residual) = values
        .iter()
        .zip(&trend)
        .zip(&seasonal)
        .filter_map(|((x, t), s)| t.map(|t| (t, x - t - s)))
        .unzip();

    Ok(DecompositionComponents {
        trend,
        seasonal,
        residual,
    })
}

/// Seasonal decomposition forecaster
#[derive(Debug, Clone, Default)]
pub struct SeasonalDecomposition;

impl SeasonalDecomposition {
    pub fn new() -> Self {
        Self
    }

    /// Decompose `values` and extrapolate `horizon` days, clamped at zero
    pub fn forecast(
        &self,
        values: &[f64],
        horizon: usize,
    ) -> forecast_math::Result<(Vec<f64>, DecompositionComponents)> {
        if values.len() < MIN_OBSERVATIONS {
            return Err(MathError::InsufficientData(format!(
                "Seasonal decomposition needs at least {} observations, got {}",
                MIN_OBSERVATIONS,
                values.len()
            )));
        }

        let components = decompose(values, PERIOD)?;
        let trend = &components.trend;
        if trend.len() < MIN_TREND_POINTS {
            return Err(MathError::InsufficientData(format!(
                "Need at least {} trend points, got {}",
                MIN_TREND_POINTS,
                trend.len()
            )));
        }

        let head = mean(&trend[..SLOPE_WINDOW])?;
        let tail = mean(&trend[trend.len() - SLOPE_WINDOW..])?;
        let slope = (tail - head) / trend.len() as f64;

        let trend_mean = mean(trend)?;
        let last_trend = trend
            .last()
            .copied()
            .filter(|t| t.is_finite())
            .unwrap_or(trend_mean);
        let pattern = &components.seasonal[components.seasonal.len() - PERIOD..];

        let predictions = (0..horizon)
            .map(|i| {
                let season = pattern[i % PERIOD];
                let season = if season.is_finite() { season } else { 0.0 };
                (last_trend + (i + 1) as f64 * slope + season).max(0.0)
            })
            .collect();

        debug!(slope, last_trend, trend_points = trend.len(), "Series decomposed");

        Ok((predictions, components))
    }
}

impl ForecastingStrategy for SeasonalDecomposition {
    fn method(&self) -> ForecastMethod {
        ForecastMethod::SeasonalDecompose
    }

    fn fit_and_forecast(
        &self,
        series: &HistoricalSeries,
        horizon: usize,
        _confidence_level: f64,
    ) -> Result<StrategyOutput> {
        let (predictions, components) = self
            .forecast(&series.calls_volume(), horizon)
            .map_err(|e| ForecastError::fit_failure(ForecastMethod::SeasonalDecompose, e))?;

        Ok(StrategyOutput {
            predictions,
            confidence: None,
            diagnostics: Diagnostics::Components(components),
        })
    }
}
