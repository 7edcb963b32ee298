//! Forecasting strategies for call volume series
//!
//! Every strategy implements [`ForecastingStrategy`]: fit on the full history
//! and forecast `horizon` days ahead in one call. [`ForecastMethod`] is the
//! closed set of strategies a request can name; [`ForecastMethod::strategy`]
//! builds the matching implementation.

use crate::config::ForecastConfig;
use crate::data::HistoricalSeries;
use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub mod arima;
pub mod decomposition;
pub mod exponential_smoothing;
pub mod regression;

pub use arima::ArimaModel;
pub use decomposition::{DecompositionComponents, SeasonalDecomposition};
pub use exponential_smoothing::ExponentialSmoothing;
pub use regression::RegressionModel;

/// Forecasting method named by a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    /// ARIMA(1,1,1)
    Arima,
    /// Holt-Winters additive smoothing
    ExponentialSmoothing,
    /// Random forest regression on calendar and lag features
    RandomForest,
    /// Linear regression on calendar and lag features
    LinearRegression,
    /// Additive seasonal decomposition with trend extrapolation
    SeasonalDecompose,
}

impl ForecastMethod {
    /// All supported methods
    pub const ALL: [ForecastMethod; 5] = [
        ForecastMethod::Arima,
        ForecastMethod::ExponentialSmoothing,
        ForecastMethod::RandomForest,
        ForecastMethod::LinearRegression,
        ForecastMethod::SeasonalDecompose,
    ];

    /// Methods scored by the accuracy analysis
    pub const BACKTESTED: [ForecastMethod; 4] = [
        ForecastMethod::Arima,
        ForecastMethod::ExponentialSmoothing,
        ForecastMethod::RandomForest,
        ForecastMethod::LinearRegression,
    ];

    /// Canonical request token
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastMethod::Arima => "arima",
            ForecastMethod::ExponentialSmoothing => "exponential_smoothing",
            ForecastMethod::RandomForest => "random_forest",
            ForecastMethod::LinearRegression => "linear_regression",
            ForecastMethod::SeasonalDecompose => "seasonal_decompose",
        }
    }

    /// Build the strategy implementing this method
    pub fn strategy(&self, config: &ForecastConfig) -> Box<dyn ForecastingStrategy> {
        match self {
            ForecastMethod::Arima => Box::new(ArimaModel::new()),
            ForecastMethod::ExponentialSmoothing => Box::new(ExponentialSmoothing::new()),
            ForecastMethod::RandomForest => Box::new(
                RegressionModel::random_forest(config.forest_params())
                    .with_calendar_advance(config.advance_calendar_features),
            ),
            ForecastMethod::LinearRegression => Box::new(
                RegressionModel::linear().with_calendar_advance(config.advance_calendar_features),
            ),
            ForecastMethod::SeasonalDecompose => Box::new(SeasonalDecomposition::new()),
        }
    }
}

impl fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForecastMethod {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "arima" | "autoregressive" => Ok(ForecastMethod::Arima),
            "exponential_smoothing" | "smoothing" => Ok(ForecastMethod::ExponentialSmoothing),
            "random_forest" | "regression-rf" => Ok(ForecastMethod::RandomForest),
            "linear_regression" | "regression-linear" => Ok(ForecastMethod::LinearRegression),
            "seasonal_decompose" | "decomposition" => Ok(ForecastMethod::SeasonalDecompose),
            other => Err(ForecastError::InvalidMethod(other.to_string())),
        }
    }
}

/// Paired lower/upper bounds around each point forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Method-specific fit diagnostics
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostics {
    /// Likelihood-based model selection criteria
    InformationCriteria { aic: f64, bic: Option<f64> },
    /// In-sample error of a regression fit
    InSample {
        mae: f64,
        rmse: f64,
        r2_score: Option<f64>,
    },
    /// Components of a seasonal decomposition
    Components(DecompositionComponents),
}

impl Diagnostics {
    /// Metrics reported on a forecast result; decompositions report none
    pub fn accuracy_metrics(&self) -> Option<BTreeMap<String, Option<f64>>> {
        match self {
            Diagnostics::InformationCriteria { aic, bic } => {
                let mut metrics = BTreeMap::from([("aic".to_string(), Some(*aic))]);
                if bic.is_some() {
                    metrics.insert("bic".to_string(), *bic);
                }
                Some(metrics)
            }
            Diagnostics::InSample {
                mae,
                rmse,
                r2_score,
            } => Some(BTreeMap::from([
                ("mae".to_string(), Some(*mae)),
                ("rmse".to_string(), Some(*rmse)),
                ("r2_score".to_string(), *r2_score),
            ])),
            Diagnostics::Components(_) => None,
        }
    }
}

/// What a strategy produces for one request
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutput {
    /// One point forecast per horizon day
    pub predictions: Vec<f64>,
    /// Interval around the predictions, if the strategy provides one
    pub confidence: Option<ConfidenceBand>,
    pub diagnostics: Diagnostics,
}

/// Common interface for forecasting strategies
pub trait ForecastingStrategy: fmt::Debug {
    /// The method this strategy implements
    fn method(&self) -> ForecastMethod;

    /// Fit on `series` and forecast `horizon` days past its end.
    ///
    /// `confidence_level` is ignored by strategies without intervals.
    /// Numerical failures come back as [`ForecastError::FitFailure`].
    fn fit_and_forecast(
        &self,
        series: &HistoricalSeries,
        horizon: usize,
        confidence_level: f64,
    ) -> Result<StrategyOutput>;
}
