//! # Callcast
//!
//! Workspace facade for call-center volume forecasting.
//!
//! - [`call_forecast`]: records, stores, forecasting methods, staffing and
//!   accuracy analysis
//! - [`forecast_math`]: the numerical routines the methods are built on
//!
//! ```
//! use callcast_workspace::call_forecast::staffing::recommended_staff;
//!
//! assert_eq!(recommended_staff(800.0, 0.8), 125);
//! ```

pub use call_forecast;
pub use forecast_math;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports() {
        assert_eq!(call_forecast::NAME, "call_forecast");
        assert_eq!(forecast_math::stats::mean(&[1.0, 3.0]).unwrap(), 2.0);
    }
}
