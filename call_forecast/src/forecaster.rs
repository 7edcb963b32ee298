//! Forecast dispatch: validation, strategy selection and result assembly

use crate::accuracy::{AccuracyEvaluator, AccuracyReport};
use crate::config::ForecastConfig;
use crate::data::HistoricalSeries;
use crate::error::{ForecastError, Result};
use crate::models::{ConfidenceBand, ForecastMethod, StrategyOutput};
use crate::staffing::StaffingEstimator;
use crate::store::{ForecastStore, HistoricalStore};
use crate::utils::future_dates;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::{debug, info};
use uuid::Uuid;

/// Confidence level used when a request does not name one
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

fn default_confidence_level() -> f64 {
    DEFAULT_CONFIDENCE_LEVEL
}

/// A request for a multi-day forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRequest {
    /// Method token, e.g. `arima` or `regression-linear`
    pub method: String,
    /// Days to forecast past the latest record
    #[serde(alias = "forecast_days")]
    pub horizon_days: usize,
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
    /// Accepted for compatibility; no strategy reads it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seasonality_factors: Option<HashMap<String, serde_json::Value>>,
}

impl ForecastRequest {
    pub fn new(method: impl Into<String>, horizon_days: usize) -> Self {
        Self {
            method: method.into(),
            horizon_days,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            seasonality_factors: None,
        }
    }

    pub fn with_confidence_level(mut self, confidence_level: f64) -> Self {
        self.confidence_level = confidence_level;
        self
    }

    /// Check the horizon and confidence level
    pub fn validate(&self) -> Result<()> {
        if self.horizon_days == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon_days must be positive".to_string(),
            ));
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "confidence_level must be between 0 and 1, got {}",
                self.confidence_level
            )));
        }
        Ok(())
    }
}

/// A finished forecast. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    id: Uuid,
    method: ForecastMethod,
    forecast_dates: Vec<NaiveDate>,
    predicted_calls: Vec<f64>,
    confidence_intervals: Option<ConfidenceBand>,
    accuracy_metrics: Option<BTreeMap<String, Option<f64>>>,
    staffing_recommendations: Vec<u32>,
    created_at: DateTime<Utc>,
}

impl ForecastResult {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn method(&self) -> ForecastMethod {
        self.method
    }

    pub fn forecast_dates(&self) -> &[NaiveDate] {
        &self.forecast_dates
    }

    pub fn predicted_calls(&self) -> &[f64] {
        &self.predicted_calls
    }

    /// Lower/upper bounds; only ARIMA and smoothing provide them
    pub fn confidence_intervals(&self) -> Option<&ConfidenceBand> {
        self.confidence_intervals.as_ref()
    }

    pub fn accuracy_metrics(&self) -> Option<&BTreeMap<String, Option<f64>>> {
        self.accuracy_metrics.as_ref()
    }

    pub fn staffing_recommendations(&self) -> &[u32] {
        &self.staffing_recommendations
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Where a forecast request is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastStage {
    Validating,
    Dispatching,
    Assembling,
    Persisted,
}

impl fmt::Display for ForecastStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ForecastStage::Validating => "validating",
            ForecastStage::Dispatching => "dispatching",
            ForecastStage::Assembling => "assembling",
            ForecastStage::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// Run `method` over `series` and assemble the result.
///
/// Any error from the strategy comes back as a [`ForecastError::FitFailure`]
/// tagged with `method`.
pub fn build_forecast(
    series: &HistoricalSeries,
    method: ForecastMethod,
    horizon: usize,
    confidence_level: f64,
    config: &ForecastConfig,
) -> Result<ForecastResult> {
    let last_date = series.last_date().ok_or(ForecastError::NoData)?;

    debug!(stage = %ForecastStage::Dispatching, %method, horizon, "Running strategy");
    let StrategyOutput {
        predictions,
        confidence,
        diagnostics,
    } = method
        .strategy(config)
        .fit_and_forecast(series, horizon, confidence_level)
        .map_err(|e| match e {
            ForecastError::FitFailure { .. } => e,
            other => ForecastError::fit_failure(method, other),
        })?;

    debug!(stage = %ForecastStage::Assembling, %method, "Assembling forecast");
    if predictions.len() != horizon {
        return Err(ForecastError::fit_failure(
            method,
            format!("expected {} predictions, got {}", horizon, predictions.len()),
        ));
    }

    let staffing = StaffingEstimator::new(config.staffing_target_service_level);

    Ok(ForecastResult {
        id: Uuid::new_v4(),
        method,
        forecast_dates: future_dates(last_date, horizon),
        staffing_recommendations: staffing.recommend(&predictions),
        predicted_calls: predictions,
        confidence_intervals: confidence,
        accuracy_metrics: diagnostics.accuracy_metrics(),
        created_at: Utc::now(),
    })
}

/// Forecasting entry point over a record source and a result sink
#[derive(Debug)]
pub struct Forecaster<H, F> {
    history: H,
    forecasts: F,
    config: ForecastConfig,
}

impl<H: HistoricalStore, F: ForecastStore> Forecaster<H, F> {
    /// Create a forecaster with the default configuration
    pub fn new(history: H, forecasts: F) -> Self {
        Self::with_config(history, forecasts, ForecastConfig::default())
    }

    pub fn with_config(history: H, forecasts: F, config: ForecastConfig) -> Self {
        Self {
            history,
            forecasts,
            config,
        }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    fn load_series(&self) -> Result<HistoricalSeries> {
        Ok(HistoricalSeries::new(self.history.list_all()?))
    }

    /// Validate `request`, run the named strategy and store the result
    pub fn generate_forecast(&self, request: &ForecastRequest) -> Result<ForecastResult> {
        debug!(stage = %ForecastStage::Validating, method = %request.method, "Validating request");

        let series = self.load_series()?;
        if series.is_empty() {
            return Err(ForecastError::NoData);
        }
        if series.len() < self.config.min_history {
            return Err(ForecastError::InsufficientData {
                required: self.config.min_history,
                actual: series.len(),
            });
        }
        let method: ForecastMethod = request.method.parse()?;
        request.validate()?;
        if request.seasonality_factors.is_some() {
            debug!("Ignoring seasonality_factors");
        }

        let result = build_forecast(
            &series,
            method,
            request.horizon_days,
            request.confidence_level,
            &self.config,
        )?;

        self.forecasts.insert_forecast(&result)?;
        info!(
            stage = %ForecastStage::Persisted,
            id = %result.id(),
            %method,
            horizon = request.horizon_days,
            "Forecast generated"
        );

        Ok(result)
    }

    /// Backtest the model-based methods on the trailing hold-out window
    pub fn analyze_accuracy(&self) -> Result<AccuracyReport> {
        let series = self.load_series()?;
        Ok(AccuracyEvaluator::new(&self.config).evaluate(&series))
    }

    /// Up to `limit` stored forecasts, newest first
    pub fn recent_forecasts(&self, limit: usize) -> Result<Vec<ForecastResult>> {
        self.forecasts.list_recent(limit)
    }

    /// Stored forecasts up to the configured limit, newest first
    pub fn latest_forecasts(&self) -> Result<Vec<ForecastResult>> {
        self.recent_forecasts(self.config.recent_forecast_limit)
    }
}
