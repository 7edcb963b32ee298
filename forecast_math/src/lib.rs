//! # Forecast Math
//!
//! Numerical building blocks used by the call volume forecasting models.
//! This crate provides the fitting machinery the models are assembled from:
//!
//! - Descriptive statistics and moving-average filters
//! - Derivative-free minimisation (Nelder-Mead)
//! - Ordinary least squares with rank-deficient columns
//! - CART regression trees and a bootstrap random forest

use thiserror::Error;

pub mod forest;
pub mod optimize;
pub mod regression;
pub mod stats;

/// Errors that can occur in numerical fitting
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for numerical operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Fail with `InvalidInput` if any value is NaN or infinite
pub fn ensure_finite(values: &[f64], what: &str) -> Result<()> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(format!(
            "{} contains NaN or infinite values",
            what
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_finite() {
        assert!(ensure_finite(&[1.0, 2.0], "series").is_ok());

        let err = ensure_finite(&[1.0, f64::NAN], "series").unwrap_err();
        assert!(err.to_string().contains("series"));
    }
}
