//! Error types for the call_forecast crate

use crate::models::ForecastMethod;
use std::fmt::Display;
use thiserror::Error;

/// Custom error types for the call_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The historical store holds no records
    #[error("No historical data available for forecasting")]
    NoData,

    /// History is shorter than an operation's minimum
    #[error("Insufficient data: need at least {required} data points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Unrecognised forecasting method token
    #[error("Invalid forecasting method: {0}")]
    InvalidMethod(String),

    /// Request or configuration parameter out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Numerical failure inside a forecasting strategy
    #[error("{method} forecasting failed: {cause}")]
    FitFailure {
        method: ForecastMethod,
        cause: String,
    },

    /// Bad CSV or record shape
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Store closed or unavailable
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ForecastError {
    /// Wrap a strategy-level failure, tagging it with the originating method
    pub fn fit_failure(method: ForecastMethod, cause: impl Display) -> Self {
        ForecastError::FitFailure {
            method,
            cause: cause.to_string(),
        }
    }

    /// Failures the caller can fix by supplying more history
    pub fn needs_more_data(&self) -> bool {
        matches!(
            self,
            ForecastError::NoData | ForecastError::InsufficientData { .. }
        )
    }

    /// Failures caused by the request itself (the 400-class of errors)
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            ForecastError::Store(_) | ForecastError::Config(_) | ForecastError::IoError(_)
        )
    }
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::MalformedInput(err.to_string())
    }
}

impl From<config::ConfigError> for ForecastError {
    fn from(err: config::ConfigError) -> Self {
        ForecastError::Config(err.to_string())
    }
}
