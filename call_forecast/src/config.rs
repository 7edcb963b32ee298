//! Runtime configuration for the forecasting core

use crate::error::{ForecastError, Result};
use crate::staffing::DEFAULT_TARGET_SERVICE_LEVEL;
use config::{Config, Environment, File, FileFormat};
use forecast_math::forest::ForestParams;
use serde::{Deserialize, Serialize};

/// Environment variable prefix, e.g. `CALLCAST_MIN_HISTORY=10`
pub const ENV_PREFIX: &str = "CALLCAST";

/// Forecasting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Minimum number of records before any forecast runs
    pub min_history: usize,
    /// Trailing days held out by the accuracy analysis
    pub holdout_days: usize,
    /// Minimum number of records before the accuracy analysis runs
    pub min_accuracy_history: usize,
    /// Service level used when turning predictions into staff counts
    pub staffing_target_service_level: f64,
    /// Trees in the random forest regressor
    pub random_forest_trees: usize,
    /// Seed for the random forest bootstrap
    pub random_seed: u64,
    /// How many stored forecasts `recent_forecasts` returns
    pub recent_forecast_limit: usize,
    /// Recompute calendar features for each day a regression model forecasts.
    /// Off by default, which keeps the last observed day's calendar.
    pub advance_calendar_features: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            min_history: 7,
            holdout_days: 7,
            min_accuracy_history: 14,
            staffing_target_service_level: DEFAULT_TARGET_SERVICE_LEVEL,
            random_forest_trees: 50,
            random_seed: 42,
            recent_forecast_limit: 100,
            advance_calendar_features: false,
        }
    }
}

impl ForecastConfig {
    /// Load defaults overridden by `CALLCAST_*` environment variables
    pub fn from_env() -> Result<Self> {
        let loaded: Self = Config::builder()
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Load defaults overridden by a TOML document
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let loaded: Self = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Check that every field is in range
    pub fn validate(&self) -> Result<()> {
        if self.min_history < 2 {
            return Err(ForecastError::Config(
                "min_history must be at least 2".to_string(),
            ));
        }
        if self.holdout_days == 0 {
            return Err(ForecastError::Config(
                "holdout_days must be positive".to_string(),
            ));
        }
        if self.min_accuracy_history <= self.holdout_days {
            return Err(ForecastError::Config(
                "min_accuracy_history must exceed holdout_days".to_string(),
            ));
        }
        let target = self.staffing_target_service_level;
        if !(target > 0.0 && target <= 1.0) {
            return Err(ForecastError::Config(format!(
                "staffing_target_service_level must be in (0, 1], got {}",
                target
            )));
        }
        if self.random_forest_trees == 0 {
            return Err(ForecastError::Config(
                "random_forest_trees must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Random forest hyperparameters derived from this configuration
    pub fn forest_params(&self) -> ForestParams {
        ForestParams {
            n_trees: self.random_forest_trees,
            seed: self.random_seed,
            ..ForestParams::default()
        }
    }
}
