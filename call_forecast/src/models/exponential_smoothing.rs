//! Holt-Winters exponential smoothing for call volume forecasting
//!
//! Additive trend always, additive weekly seasonality when the history covers
//! more than two full seasons. Smoothing parameters are chosen by minimising
//! the in-sample one-step squared error.

use crate::data::HistoricalSeries;
use crate::error::{ForecastError, Result};
use crate::models::{
    ConfidenceBand, Diagnostics, ForecastMethod, ForecastingStrategy, StrategyOutput,
};
use forecast_math::optimize::{logistic, logit, NelderMead};
use forecast_math::stats::{mean, std_dev};
use forecast_math::{ensure_finite, MathError};
use tracing::debug;

/// Longest season the model will consider (one week of daily data)
pub const MAX_SEASON_LENGTH: usize = 7;

/// Fewest observations the model will fit
pub const MIN_OBSERVATIONS: usize = 2;

const START_ALPHA: f64 = 0.5;
const START_BETA: f64 = 0.1;
const START_GAMMA: f64 = 0.1;

/// Critical value for an interval at `confidence_level`.
///
/// Only two widths exist: 95% and 99%. Any other level gets the 99% width.
pub fn z_score(confidence_level: f64) -> f64 {
    if (confidence_level - 0.95).abs() < 1e-9 {
        1.96
    } else {
        2.576
    }
}

/// Holt-Winters additive model
#[derive(Debug, Clone, Default)]
pub struct ExponentialSmoothing {
    optimizer: NelderMead,
}

/// Holt-Winters model fitted to a series
#[derive(Debug, Clone)]
pub struct TrainedExponentialSmoothing {
    alpha: f64,
    beta: f64,
    gamma: Option<f64>,
    season_length: usize,
    state: FilterState,
    fitted: Vec<f64>,
    residual_std: f64,
    sse: f64,
}

#[derive(Debug, Clone)]
struct FilterState {
    level: f64,
    trend: f64,
    /// Latest seasonal term for each phase `t % season_length`
    seasonals: Vec<f64>,
    observations: usize,
}

/// Season length for `n` observations, or 0 when the history is too short
/// for a seasonal component.
pub fn season_length_for(n: usize) -> usize {
    let m = MAX_SEASON_LENGTH.min(n / 2);
    if m >= 2 && n > 2 * m {
        m
    } else {
        0
    }
}

fn initial_state(values: &[f64], season_length: usize) -> forecast_math::Result<FilterState> {
    if season_length == 0 {
        let trend = values[1] - values[0];
        return Ok(FilterState {
            level: values[0] - trend,
            trend,
            seasonals: Vec::new(),
            observations: 0,
        });
    }

    let m = season_length;
    let first = mean(&values[..m])?;
    let second = mean(&values[m..2 * m])?;
    let trend = (second - first) / m as f64;

    Ok(FilterState {
        level: first - trend,
        trend,
        seasonals: values[..m].iter().map(|v| v - first).collect(),
        observations: 0,
    })
}

/// Run the smoothing recursions over `values`, returning the final state and
/// the one-step-ahead fitted values.
fn run_filter(
    values: &[f64],
    season_length: usize,
    alpha: f64,
    beta: f64,
    gamma: f64,
) -> forecast_math::Result<(FilterState, Vec<f64>)> {
    let mut state = initial_state(values, season_length)?;
    let mut fitted = Vec::with_capacity(values.len());

    for (t, &x) in values.iter().enumerate() {
        let season = if season_length > 0 {
            state.seasonals[t % season_length]
        } else {
            0.0
        };
        fitted.push(state.level + state.trend + season);

        let level = alpha * (x - season) + (1.0 - alpha) * (state.level + state.trend);
        state.trend = beta * (level - state.level) + (1.0 - beta) * state.trend;
        state.level = level;
        if season_length > 0 {
            state.seasonals[t % season_length] = gamma * (x - level) + (1.0 - gamma) * season;
        }
    }
    state.observations = values.len();

    Ok((state, fitted))
}

fn squared_error(values: &[f64], fitted: &[f64]) -> f64 {
    values
        .iter()
        .zip(fitted)
        .map(|(x, f)| (x - f).powi(2))
        .sum()
}

impl ExponentialSmoothing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_optimizer(optimizer: NelderMead) -> Self {
        Self { optimizer }
    }

    /// Fit the model, picking the seasonal period from the series length
    pub fn fit(&self, values: &[f64]) -> forecast_math::Result<TrainedExponentialSmoothing> {
        ensure_finite(values, "Call volume series")?;
        if values.len() < MIN_OBSERVATIONS {
            return Err(MathError::InsufficientData(format!(
                "Exponential smoothing needs at least {} observations, got {}",
                MIN_OBSERVATIONS,
                values.len()
            )));
        }

        let season_length = season_length_for(values.len());
        let seasonal = season_length > 0;

        let mut start = vec![logit(START_ALPHA), logit(START_BETA)];
        if seasonal {
            start.push(logit(START_GAMMA));
        }

        let minimum = self.optimizer.minimize(
            |p| {
                let gamma = p.get(2).map_or(0.0, |g| logistic(*g));
                match run_filter(values, season_length, logistic(p[0]), logistic(p[1]), gamma) {
                    Ok((_, fitted)) => squared_error(values, &fitted),
                    Err(_) => f64::INFINITY,
                }
            },
            &start,
        )?;

        let alpha = logistic(minimum.point[0]);
        let beta = logistic(minimum.point[1]);
        let gamma = minimum.point.get(2).map(|g| logistic(*g));

        let (state, fitted) =
            run_filter(values, season_length, alpha, beta, gamma.unwrap_or(0.0))?;
        let residuals: Vec<f64> = values.iter().zip(&fitted).map(|(x, f)| x - f).collect();
        let residual_std = std_dev(&residuals)?;
        let sse = squared_error(values, &fitted);

        debug!(
            alpha,
            beta,
            ?gamma,
            season_length,
            sse,
            converged = minimum.converged,
            "Holt-Winters fitted"
        );

        Ok(TrainedExponentialSmoothing {
            alpha,
            beta,
            gamma,
            season_length,
            state,
            fitted,
            residual_std,
            sse,
        })
    }
}

impl TrainedExponentialSmoothing {
    /// Level smoothing parameter
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Trend smoothing parameter
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Seasonal smoothing parameter, if the model is seasonal
    pub fn gamma(&self) -> Option<f64> {
        self.gamma
    }

    /// Seasonal period, 0 for a trend-only model
    pub fn season_length(&self) -> usize {
        self.season_length
    }

    /// One-step-ahead in-sample predictions
    pub fn fitted_values(&self) -> &[f64] {
        &self.fitted
    }

    /// Population standard deviation of the in-sample residuals
    pub fn residual_std(&self) -> f64 {
        self.residual_std
    }

    /// Akaike information criterion from the in-sample squared error
    pub fn aic(&self) -> f64 {
        let n = self.state.observations as f64;
        let smoothing = if self.gamma.is_some() { 3 } else { 2 };
        // initial level and trend plus one initial term per season phase
        let k = (smoothing + 2 + self.season_length) as f64;
        let mse = (self.sse / n).max(f64::EPSILON);
        n * mse.ln() + 2.0 * k
    }

    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let state = &self.state;
        (1..=horizon)
            .map(|h| {
                let season = if self.season_length > 0 {
                    state.seasonals[(state.observations + h - 1) % self.season_length]
                } else {
                    0.0
                };
                state.level + h as f64 * state.trend + season
            })
            .collect()
    }

    /// Constant-width band of `z_score(confidence_level)` residual deviations
    pub fn confidence_band(&self, forecast: &[f64], confidence_level: f64) -> ConfidenceBand {
        let margin = z_score(confidence_level) * self.residual_std;
        ConfidenceBand {
            lower: forecast.iter().map(|f| f - margin).collect(),
            upper: forecast.iter().map(|f| f + margin).collect(),
        }
    }
}

impl ForecastingStrategy for ExponentialSmoothing {
    fn method(&self) -> ForecastMethod {
        ForecastMethod::ExponentialSmoothing
    }

    fn fit_and_forecast(
        &self,
        series: &HistoricalSeries,
        horizon: usize,
        confidence_level: f64,
    ) -> Result<StrategyOutput> {
        let trained = self
            .fit(&series.calls_volume())
            .map_err(|e| ForecastError::fit_failure(ForecastMethod::ExponentialSmoothing, e))?;
        let predictions = trained.forecast(horizon);
        let confidence = trained.confidence_band(&predictions, confidence_level);

        Ok(StrategyOutput {
            predictions,
            confidence: Some(confidence),
            diagnostics: Diagnostics::InformationCriteria {
                aic: trained.aic(),
                bic: None,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const WEEK: [f64; 7] = [120.0, 140.0, 135.0, 130.0, 150.0, 80.0, 60.0];

    #[test]
    fn test_season_length_for() {
        assert_eq!(season_length_for(2), 0);
        assert_eq!(season_length_for(7), 3);
        assert_eq!(season_length_for(14), 0);
        assert_eq!(season_length_for(15), 7);
        assert_eq!(season_length_for(60), 7);
    }

    #[test]
    fn test_linear_series_continues() {
        let values: Vec<f64> = (0..14).map(|i| 100.0 + 5.0 * i as f64).collect();
        let trained = ExponentialSmoothing::new().fit(&values).unwrap();

        assert_eq!(trained.season_length(), 0);
        assert!(trained.gamma().is_none());

        let forecast = trained.forecast(3);
        assert_abs_diff_eq!(forecast[0], 170.0, epsilon = 1e-6);
        assert_abs_diff_eq!(forecast[2], 180.0, epsilon = 1e-6);
    }

    #[test]
    fn test_weekly_pattern_continues() {
        let values: Vec<f64> = (0..28).map(|i| WEEK[i % 7]).collect();
        let trained = ExponentialSmoothing::new().fit(&values).unwrap();

        assert_eq!(trained.season_length(), 7);
        assert!(trained.gamma().is_some());

        let forecast = trained.forecast(7);
        for (h, value) in forecast.iter().enumerate() {
            assert_abs_diff_eq!(*value, WEEK[(28 + h) % 7], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_band_width_is_constant() {
        let values: Vec<f64> = (0..21)
            .map(|i| 200.0 + if i % 3 == 0 { 12.0 } else { -4.0 } + i as f64)
            .collect();
        let trained = ExponentialSmoothing::new().fit(&values).unwrap();
        let forecast = trained.forecast(5);
        let band = trained.confidence_band(&forecast, 0.95);

        let width = 2.0 * 1.96 * trained.residual_std();
        for i in 0..5 {
            assert_abs_diff_eq!(band.upper[i] - band.lower[i], width, epsilon = 1e-9);
        }
        assert!(trained.aic().is_finite());
    }

    #[test]
    fn test_z_score() {
        assert_eq!(z_score(0.95), 1.96);
        assert_eq!(z_score(0.99), 2.576);
        assert_eq!(z_score(0.9), 2.576);
    }

    #[test]
    fn test_too_short() {
        assert!(ExponentialSmoothing::new().fit(&[10.0]).is_err());
    }
}
