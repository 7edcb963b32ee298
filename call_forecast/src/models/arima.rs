//! ARIMA(1,1,1) model for call volume forecasting
//!
//! The series is differenced once and an ARMA(1,1) without constant is fitted
//! to the differences by conditional sum of squares:
//!
//! ```text
//! y[t] = phi * y[t-1] + e[t] + theta * e[t-1]
//! ```
//!
//! Both coefficients are searched through `tanh`, which keeps the fit
//! stationary and invertible. Forecast intervals come from the psi-weights of
//! the integrated process.

use crate::data::HistoricalSeries;
use crate::error::{ForecastError, Result};
use crate::models::{
    ConfidenceBand, Diagnostics, ForecastMethod, ForecastingStrategy, StrategyOutput,
};
use forecast_math::optimize::NelderMead;
use forecast_math::stats::{autocorrelation, difference};
use forecast_math::{ensure_finite, MathError};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;
use tracing::debug;

/// Fewest observations the model will fit
pub const MIN_OBSERVATIONS: usize = 5;

/// phi, theta and the innovation variance
const PARAMETER_COUNT: f64 = 3.0;

/// ARIMA(1,1,1) model
#[derive(Debug, Clone, Default)]
pub struct ArimaModel {
    optimizer: NelderMead,
}

/// ARIMA(1,1,1) fitted to a series
#[derive(Debug, Clone)]
pub struct TrainedArima {
    phi: f64,
    theta: f64,
    sigma2: f64,
    log_likelihood: f64,
    nobs: usize,
    last_difference: f64,
    last_residual: f64,
    last_value: f64,
}

fn conditional_residuals(y: &[f64], phi: f64, theta: f64) -> Vec<f64> {
    let mut residuals = Vec::with_capacity(y.len().saturating_sub(1));
    let mut previous = 0.0;
    for t in 1..y.len() {
        let e = y[t] - phi * y[t - 1] - theta * previous;
        residuals.push(e);
        previous = e;
    }
    residuals
}

impl ArimaModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom optimiser for the coefficient search
    pub fn with_optimizer(optimizer: NelderMead) -> Self {
        Self { optimizer }
    }

    /// Fit the model to a series of observations
    pub fn fit(&self, values: &[f64]) -> forecast_math::Result<TrainedArima> {
        ensure_finite(values, "Call volume series")?;
        if values.len() < MIN_OBSERVATIONS {
            return Err(MathError::InsufficientData(format!(
                "ARIMA(1,1,1) needs at least {} observations, got {}",
                MIN_OBSERVATIONS,
                values.len()
            )));
        }

        let differenced = difference(values);
        let start_phi = autocorrelation(&differenced, 1).clamp(-0.9, 0.9);

        let minimum = self.optimizer.minimize(
            |p| {
                conditional_residuals(&differenced, p[0].tanh(), p[1].tanh())
                    .iter()
                    .map(|e| e * e)
                    .sum()
            },
            &[start_phi.atanh(), 0.0],
        )?;

        let phi = minimum.point[0].tanh();
        let theta = minimum.point[1].tanh();
        let residuals = conditional_residuals(&differenced, phi, theta);
        let sse: f64 = residuals.iter().map(|e| e * e).sum();
        if !sse.is_finite() {
            return Err(MathError::CalculationError(
                "Residuals diverged while fitting ARIMA(1,1,1)".to_string(),
            ));
        }

        let nobs = residuals.len();
        let sigma2 = (sse / nobs as f64).max(f64::EPSILON);
        let log_likelihood = -0.5 * nobs as f64 * ((2.0 * PI * sigma2).ln() + 1.0);

        debug!(
            phi,
            theta,
            sigma2,
            iterations = minimum.iterations,
            converged = minimum.converged,
            "ARIMA(1,1,1) fitted"
        );

        Ok(TrainedArima {
            phi,
            theta,
            sigma2,
            log_likelihood,
            nobs,
            last_difference: differenced[differenced.len() - 1],
            last_residual: residuals.last().copied().unwrap_or(0.0),
            last_value: values[values.len() - 1],
        })
    }
}

impl TrainedArima {
    /// Autoregressive coefficient
    pub fn phi(&self) -> f64 {
        self.phi
    }

    /// Moving-average coefficient
    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Innovation variance
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Akaike information criterion
    pub fn aic(&self) -> f64 {
        2.0 * PARAMETER_COUNT - 2.0 * self.log_likelihood
    }

    /// Bayesian information criterion
    pub fn bic(&self) -> f64 {
        PARAMETER_COUNT * (self.nobs as f64).ln() - 2.0 * self.log_likelihood
    }

    /// Point forecasts on the original (undifferenced) scale
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let mut forecasts = Vec::with_capacity(horizon);
        let mut level = self.last_value;
        let mut previous = self.last_difference;

        for step in 0..horizon {
            let next = if step == 0 {
                self.phi * previous + self.theta * self.last_residual
            } else {
                self.phi * previous
            };
            level += next;
            forecasts.push(level);
            previous = next;
        }

        forecasts
    }

    /// Forecast error variance for each step ahead
    pub fn forecast_variance(&self, horizon: usize) -> Vec<f64> {
        let mut variances = Vec::with_capacity(horizon);
        let mut cumulative_psi = 0.0;
        let mut sum_squares = 0.0;

        for j in 0..horizon {
            let psi = if j == 0 {
                1.0
            } else {
                self.phi.powi(j as i32 - 1) * (self.phi + self.theta)
            };
            cumulative_psi += psi;
            sum_squares += cumulative_psi * cumulative_psi;
            variances.push(self.sigma2 * sum_squares);
        }

        variances
    }

    /// Normal interval at significance `1 - confidence_level`
    pub fn confidence_band(
        &self,
        forecast: &[f64],
        confidence_level: f64,
    ) -> forecast_math::Result<ConfidenceBand> {
        if !(confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(MathError::InvalidInput(format!(
                "Confidence level must be between 0 and 1, got {}",
                confidence_level
            )));
        }

        let alpha = 1.0 - confidence_level;
        let z = Normal::new(0.0, 1.0)
            .map_err(|e| MathError::CalculationError(e.to_string()))?
            .inverse_cdf(1.0 - alpha / 2.0);

        let (lower, upper) = forecast
            .iter()
            .zip(self.forecast_variance(forecast.len()))
            .map(|(f, variance)| {
                let margin = z * variance.sqrt();
                (f - margin, f + margin)
            })
            .unzip();

        Ok(ConfidenceBand { lower, upper })
    }
}

impl ForecastingStrategy for ArimaModel {
    fn method(&self) -> ForecastMethod {
        ForecastMethod::Arima
    }

    fn fit_and_forecast(
        &self,
        series: &HistoricalSeries,
        horizon: usize,
        confidence_level: f64,
    ) -> Result<StrategyOutput> {
        let fail = |e: MathError| ForecastError::fit_failure(ForecastMethod::Arima, e);

        let trained = self.fit(&series.calls_volume()).map_err(fail)?;
        let predictions = trained.forecast(horizon);
        let confidence = trained
            .confidence_band(&predictions, confidence_level)
            .map_err(fail)?;

        Ok(StrategyOutput {
            predictions,
            confidence: Some(confidence),
            diagnostics: Diagnostics::InformationCriteria {
                aic: trained.aic(),
                bic: Some(trained.bic()),
            },
        })
    }
}
