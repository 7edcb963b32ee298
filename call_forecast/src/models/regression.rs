//! Regression forecasting on calendar and lagged-volume features
//!
//! Each training row describes one day: day of week (Monday = 0), month, day of
//! month, staffing level, then the call volume 1..=L days earlier, where
//! `L = min(7, n - 1)`. The first `L` days have incomplete lags and are
//! dropped.
//!
//! Forecasts roll forward one day at a time, starting from the last training
//! row: the first step re-predicts the latest observed day from its own lags,
//! then each prediction becomes the new lag 1 and the older lags shift down.
//! Staffing stays at its last observed level. Calendar columns also stay those
//! of the last observed day unless calendar advance is enabled, in which case
//! they move forward one day per step from there.

use crate::data::HistoricalSeries;
use crate::error::{ForecastError, Result};
use crate::metrics::{mean_absolute_error, root_mean_squared_error};
use crate::models::{Diagnostics, ForecastMethod, ForecastingStrategy, StrategyOutput};
use chrono::{Datelike, Duration, NaiveDate};
use forecast_math::forest::{ForestParams, RandomForest};
use forecast_math::regression::{r_squared, LinearRegression};
use forecast_math::{ensure_finite, MathError};
use tracing::debug;

/// Longest lag used as a feature
pub const MAX_LAGS: usize = 7;

/// Fewest complete rows a regressor will train on
pub const MIN_TRAINING_ROWS: usize = 5;

/// Which regressor to train
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegressorKind {
    Linear,
    RandomForest(ForestParams),
}

/// Feature rows and targets built from a series
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub rows: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
    /// Number of lag columns
    pub lags: usize,
    /// Lag columns of the last training row, most recent first
    pub recent: Vec<f64>,
    pub last_date: NaiveDate,
    pub last_staffing: f64,
}

/// Day of week (Monday = 0), month, day of month and staffing level
fn calendar_features(date: NaiveDate, staffing_level: f64) -> Vec<f64> {
    vec![
        date.weekday().num_days_from_monday() as f64,
        date.month() as f64,
        date.day() as f64,
        staffing_level,
    ]
}

/// Build the training matrix for `series`
pub fn build_features(series: &HistoricalSeries) -> forecast_math::Result<FeatureMatrix> {
    let volumes = series.calls_volume();
    ensure_finite(&volumes, "Call volume series")?;

    let n = volumes.len();
    let lags = MAX_LAGS.min(n.saturating_sub(1));
    let row_count = if lags == 0 { 0 } else { n - lags };
    if row_count < MIN_TRAINING_ROWS {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} complete lag rows, got {}",
            MIN_TRAINING_ROWS, row_count
        )));
    }

    let records = series.records();
    let mut rows = Vec::with_capacity(row_count);
    let mut targets = Vec::with_capacity(row_count);
    for i in lags..n {
        let mut row = calendar_features(records[i].date, records[i].staffing_level as f64);
        row.extend((1..=lags).map(|lag| volumes[i - lag]));
        rows.push(row);
        targets.push(volumes[i]);
    }

    let last = &records[n - 1];
    Ok(FeatureMatrix {
        rows,
        targets,
        lags,
        recent: (1..=lags).map(|lag| volumes[n - 1 - lag]).collect(),
        last_date: last.date,
        last_staffing: last.staffing_level as f64,
    })
}

#[derive(Debug)]
enum Regressor {
    Linear(LinearRegression),
    Forest(RandomForest),
}

impl Regressor {
    fn predict(&self, row: &[f64]) -> forecast_math::Result<f64> {
        match self {
            Regressor::Linear(model) => model.predict(row),
            Regressor::Forest(model) => model.predict(row),
        }
    }
}

/// Regression-based forecaster
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionModel {
    kind: RegressorKind,
    advance_calendar: bool,
}

impl RegressionModel {
    /// Ordinary least squares
    pub fn linear() -> Self {
        Self {
            kind: RegressorKind::Linear,
            advance_calendar: false,
        }
    }

    /// Bootstrap random forest with the given hyperparameters
    pub fn random_forest(params: ForestParams) -> Self {
        Self {
            kind: RegressorKind::RandomForest(params),
            advance_calendar: false,
        }
    }

    /// Recompute calendar features for each forecast day
    pub fn with_calendar_advance(mut self, advance: bool) -> Self {
        self.advance_calendar = advance;
        self
    }

    pub fn kind(&self) -> RegressorKind {
        self.kind
    }

    pub fn advances_calendar(&self) -> bool {
        self.advance_calendar
    }

    fn train(&self, features: &FeatureMatrix) -> forecast_math::Result<Regressor> {
        match self.kind {
            RegressorKind::Linear => {
                LinearRegression::fit(&features.rows, &features.targets).map(Regressor::Linear)
            }
            RegressorKind::RandomForest(params) => {
                RandomForest::fit(&features.rows, &features.targets, params).map(Regressor::Forest)
            }
        }
    }

    fn roll_forward(
        &self,
        regressor: &Regressor,
        features: &FeatureMatrix,
        horizon: usize,
    ) -> forecast_math::Result<Vec<f64>> {
        let mut recent = features.recent.clone();
        let mut predictions = Vec::with_capacity(horizon);

        for step in 0..horizon {
            let date = if self.advance_calendar {
                features.last_date + Duration::days(step as i64)
            } else {
                features.last_date
            };
            let mut row = calendar_features(date, features.last_staffing);
            row.extend_from_slice(&recent);

            let prediction = regressor.predict(&row)?;
            predictions.push(prediction);

            recent.rotate_right(1);
            recent[0] = prediction;
        }

        Ok(predictions)
    }

    /// Fit on `series` and forecast `horizon` days, with in-sample diagnostics
    pub fn forecast(
        &self,
        series: &HistoricalSeries,
        horizon: usize,
    ) -> forecast_math::Result<(Vec<f64>, Diagnostics)> {
        let features = build_features(series)?;
        let regressor = self.train(&features)?;

        let fitted = features
            .rows
            .iter()
            .map(|row| regressor.predict(row))
            .collect::<forecast_math::Result<Vec<f64>>>()?;
        let mae = mean_absolute_error(&features.targets, &fitted)
            .map_err(|e| MathError::CalculationError(e.to_string()))?;
        let rmse = root_mean_squared_error(&features.targets, &fitted)
            .map_err(|e| MathError::CalculationError(e.to_string()))?;
        let r2_score = r_squared(&features.targets, &fitted).ok();

        debug!(
            kind = ?self.kind,
            advance_calendar = self.advance_calendar,
            rows = features.rows.len(),
            lags = features.lags,
            mae,
            rmse,
            "Regressor trained"
        );

        let predictions = self.roll_forward(&regressor, &features, horizon)?;
        Ok((
            predictions,
            Diagnostics::InSample {
                mae,
                rmse,
                r2_score,
            },
        ))
    }
}

impl ForecastingStrategy for RegressionModel {
    fn method(&self) -> ForecastMethod {
        match self.kind {
            RegressorKind::Linear => ForecastMethod::LinearRegression,
            RegressorKind::RandomForest(_) => ForecastMethod::RandomForest,
        }
    }

    fn fit_and_forecast(
        &self,
        series: &HistoricalSeries,
        horizon: usize,
        _confidence_level: f64,
    ) -> Result<StrategyOutput> {
        let (predictions, diagnostics) = self
            .forecast(series, horizon)
            .map_err(|e| ForecastError::fit_failure(self.method(), e))?;

        Ok(StrategyOutput {
            predictions,
            confidence: None,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CallRecord;
    use approx::assert_abs_diff_eq;

    fn daily(start: NaiveDate, values: &[u32]) -> HistoricalSeries {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| CallRecord::new(start + Duration::days(i as i64), v, 20, 0.85))
            .collect()
    }

    fn march(values: &[u32]) -> HistoricalSeries {
        daily(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), values)
    }

    #[test]
    fn test_feature_layout() {
        let values: Vec<u32> = (0..12).map(|i| 100 + i).collect();
        let features = build_features(&march(&values)).unwrap();

        assert_eq!(features.lags, 7);
        assert_eq!(features.rows.len(), 5);
        assert_eq!(features.targets, vec![107.0, 108.0, 109.0, 110.0, 111.0]);

        // 2024-03-08 is a Friday
        assert_eq!(
            features.rows[0],
            vec![4.0, 3.0, 8.0, 20.0, 106.0, 105.0, 104.0, 103.0, 102.0, 101.0, 100.0]
        );
        // lags of the 2024-03-12 row
        assert_eq!(features.recent, features.rows[4][4..].to_vec());
        assert_eq!(features.recent[..3], [110.0, 109.0, 108.0]);
        assert_eq!(features.last_date, NaiveDate::from_ymd_opt(2024, 3, 12).unwrap());
        assert_eq!(features.last_staffing, 20.0);
    }

    #[test]
    fn test_too_few_rows() {
        let values: Vec<u32> = (0..11).collect();
        let err = build_features(&march(&values)).unwrap_err();
        assert!(matches!(err, MathError::InsufficientData(_)));

        let err = build_features(&march(&[10])).unwrap_err();
        assert!(matches!(err, MathError::InsufficientData(_)));
    }

    #[test]
    fn test_linear_continues_ramp() {
        // crossing a month end keeps day of month out of the lag span
        let start = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let values: Vec<u32> = (200..225).collect();
        let (predictions, diagnostics) = RegressionModel::linear()
            .forecast(&daily(start, &values), 3)
            .unwrap();

        // the first step re-predicts the last observed day
        assert_abs_diff_eq!(predictions[0], 224.0, epsilon = 1e-6);
        assert_abs_diff_eq!(predictions[1], 225.0, epsilon = 1e-6);
        assert_abs_diff_eq!(predictions[2], 226.0, epsilon = 1e-6);
        match diagnostics {
            Diagnostics::InSample { mae, .. } => assert!(mae < 1e-6),
            other => panic!("unexpected diagnostics: {:?}", other),
        }
    }

    #[test]
    fn test_linear_with_calendar_advance() {
        let values: Vec<u32> = (200..225).collect();
        let model = RegressionModel::linear().with_calendar_advance(true);
        let (predictions, _) = model.forecast(&march(&values), 4).unwrap();

        assert!(model.advances_calendar());
        for (step, prediction) in predictions.iter().enumerate() {
            assert_abs_diff_eq!(*prediction, 224.0 + step as f64, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_forest_stays_in_range() {
        let values: Vec<u32> = (0..30).map(|i| 150 + (i * 37 % 50)).collect();
        let model = RegressionModel::random_forest(ForestParams::default());
        let (predictions, _) = model.forecast(&march(&values), 7).unwrap();

        assert_eq!(predictions.len(), 7);
        assert!(predictions.iter().all(|p| (150.0..=199.0).contains(p)));
        assert_eq!(model.method(), ForecastMethod::RandomForest);
    }

    #[test]
    fn test_first_step_refits_last_row() {
        let values: Vec<u32> = (0..30).map(|i| 150 + (i * 37 % 50)).collect();
        let series = march(&values);
        let model = RegressionModel::random_forest(ForestParams::default());

        let features = build_features(&series).unwrap();
        let regressor = model.train(&features).unwrap();
        let last_row = features.rows.last().unwrap();
        let (predictions, _) = model.forecast(&series, 2).unwrap();

        assert_eq!(predictions[0], regressor.predict(last_row).unwrap());
    }

    #[test]
    fn test_forest_is_deterministic() {
        let values: Vec<u32> = (0..20).map(|i| 300 + (i * 13 % 40)).collect();
        let series = march(&values);
        let model = RegressionModel::random_forest(ForestParams::default());

        let first = model.forecast(&series, 5).unwrap().0;
        let second = model.forecast(&series, 5).unwrap().0;
        assert_eq!(first, second);
    }
}
