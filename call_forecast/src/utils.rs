//! Utility functions for the call_forecast crate

use chrono::NaiveDate;
use std::iter;

/// The `horizon` consecutive days after `last_date`
pub fn future_dates(last_date: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    iter::successors(last_date.succ_opt(), |date| date.succ_opt())
        .take(horizon)
        .collect()
}

/// Trim both slices to their common length
pub fn overlapping<'a>(predicted: &'a [f64], actual: &'a [f64]) -> (&'a [f64], &'a [f64]) {
    let len = predicted.len().min(actual.len());
    (&predicted[..len], &actual[..len])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_future_dates_are_contiguous() {
        let last = NaiveDate::from_ymd_opt(2024, 2, 27).unwrap();
        let dates = future_dates(last, 4);

        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 2, 28).unwrap(),
                NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            ]
        );
        assert!(future_dates(last, 0).is_empty());
    }

    #[test]
    fn test_overlapping() {
        let (p, a) = overlapping(&[1.0, 2.0, 3.0], &[4.0, 5.0]);
        assert_eq!(p, &[1.0, 2.0]);
        assert_eq!(a, &[4.0, 5.0]);
    }
}
