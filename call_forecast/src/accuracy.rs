//! Hold-out backtest of the forecasting methods
//!
//! The trailing `holdout_days` records are hidden, every model-based method is
//! fitted on the rest and asked for a `holdout_days` forecast, and the
//! predictions are scored against what actually happened. A method that fails
//! on the training window is left out of the report instead of failing the
//! whole analysis.

use crate::config::ForecastConfig;
use crate::data::HistoricalSeries;
use crate::metrics::{mean_absolute_error, root_mean_squared_error};
use crate::models::{ForecastMethod, ForecastingStrategy};
use crate::utils::overlapping;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Confidence level used for every backtest run
pub const BACKTEST_CONFIDENCE_LEVEL: f64 = 0.95;

/// Message reported when the history is too short to backtest
pub const INSUFFICIENT_DATA_MESSAGE: &str = "Insufficient data for accuracy analysis";

/// Backtest score for one method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodAccuracy {
    pub mae: f64,
    pub rmse: f64,
    pub predictions: Vec<f64>,
    pub actual: Vec<f64>,
}

/// Outcome of an accuracy analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccuracyReport {
    /// History shorter than `min_accuracy_history`
    InsufficientData { message: String },
    /// Scores for every method that produced a forecast
    Metrics(BTreeMap<ForecastMethod, MethodAccuracy>),
}

impl AccuracyReport {
    pub fn insufficient_data() -> Self {
        AccuracyReport::InsufficientData {
            message: INSUFFICIENT_DATA_MESSAGE.to_string(),
        }
    }

    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, AccuracyReport::InsufficientData { .. })
    }

    /// Per-method scores, if the analysis ran
    pub fn metrics(&self) -> Option<&BTreeMap<ForecastMethod, MethodAccuracy>> {
        match self {
            AccuracyReport::Metrics(metrics) => Some(metrics),
            AccuracyReport::InsufficientData { .. } => None,
        }
    }
}

/// Runs the hold-out backtest
#[derive(Debug, Clone)]
pub struct AccuracyEvaluator {
    config: ForecastConfig,
}

impl AccuracyEvaluator {
    pub fn new(config: &ForecastConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Backtest ARIMA, smoothing and both regressions on `series`
    pub fn evaluate(&self, series: &HistoricalSeries) -> AccuracyReport {
        let strategies: Vec<Box<dyn ForecastingStrategy>> = ForecastMethod::BACKTESTED
            .iter()
            .map(|method| method.strategy(&self.config))
            .collect();
        self.evaluate_strategies(series, &strategies)
    }

    /// Backtest an explicit set of strategies on `series`
    pub fn evaluate_strategies(
        &self,
        series: &HistoricalSeries,
        strategies: &[Box<dyn ForecastingStrategy>],
    ) -> AccuracyReport {
        let holdout = self.config.holdout_days;
        let split = match series.len().checked_sub(holdout) {
            Some(split) if split > 0 && series.len() >= self.config.min_accuracy_history => split,
            _ => {
                info!(
                    records = series.len(),
                    required = self.config.min_accuracy_history,
                    holdout,
                    "Not enough history for accuracy analysis"
                );
                return AccuracyReport::insufficient_data();
            }
        };
        let (train, test) = series.split_at(split);
        let actual = test.calls_volume();

        let mut metrics = BTreeMap::new();
        for strategy in strategies {
            let method = strategy.method();
            match self.score(strategy.as_ref(), &train, &actual) {
                Ok(accuracy) => {
                    info!(%method, mae = accuracy.mae, rmse = accuracy.rmse, "Backtest scored");
                    metrics.insert(method, accuracy);
                }
                Err(e) => warn!(%method, error = %e, "Skipping method in accuracy analysis"),
            }
        }

        AccuracyReport::Metrics(metrics)
    }

    fn score(
        &self,
        strategy: &dyn ForecastingStrategy,
        train: &HistoricalSeries,
        actual: &[f64],
    ) -> crate::error::Result<MethodAccuracy> {
        let output = strategy.fit_and_forecast(
            train,
            self.config.holdout_days,
            BACKTEST_CONFIDENCE_LEVEL,
        )?;
        let (predictions, actual) = overlapping(&output.predictions, actual);

        Ok(MethodAccuracy {
            mae: mean_absolute_error(actual, predictions)?,
            rmse: root_mean_squared_error(actual, predictions)?,
            predictions: predictions.to_vec(),
            actual: actual.to_vec(),
        })
    }
}
