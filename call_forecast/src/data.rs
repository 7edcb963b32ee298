//! Historical call records and CSV ingestion

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Columns a call data CSV must provide
pub const REQUIRED_COLUMNS: [&str; 4] = ["date", "calls_volume", "staffing_level", "service_level"];

/// Date formats accepted when parsing records, tried in order
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y-%m-%d %H:%M:%S"];

/// One day of call-center activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    /// Calendar day the record covers
    pub date: NaiveDate,
    /// Calls received
    pub calls_volume: u32,
    /// Agents on shift
    pub staffing_level: u32,
    /// Fraction of calls answered within target, in [0, 1]
    pub service_level: f64,
}

impl CallRecord {
    pub fn new(date: NaiveDate, calls_volume: u32, staffing_level: u32, service_level: f64) -> Self {
        Self {
            date,
            calls_volume,
            staffing_level,
            service_level,
        }
    }

    /// Reject records whose service level is outside [0, 1]
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.service_level) {
            return Err(ForecastError::MalformedInput(format!(
                "service_level must be between 0 and 1, got {} on {}",
                self.service_level, self.date
            )));
        }
        Ok(())
    }
}

/// Parse a calendar date in any of the accepted formats
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .ok_or_else(|| ForecastError::MalformedInput(format!("Unrecognised date: {:?}", value)))
}

/// Historical records ordered by date ascending.
///
/// Duplicate dates are kept; ordering among equal dates follows input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalSeries {
    records: Vec<CallRecord>,
}

impl HistoricalSeries {
    /// Create a series, sorting the records by date
    pub fn new(mut records: Vec<CallRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        Self { records }
    }

    pub fn records(&self) -> &[CallRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Call volumes as floats, in date order
    pub fn calls_volume(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.calls_volume as f64).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.records.iter().map(|r| r.date).collect()
    }

    /// Most recent date in the series
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    /// Split into the first `at` records and the rest
    pub fn split_at(&self, at: usize) -> (HistoricalSeries, HistoricalSeries) {
        let at = at.min(self.records.len());
        let (head, tail) = self.records.split_at(at);
        (
            HistoricalSeries {
                records: head.to_vec(),
            },
            HistoricalSeries {
                records: tail.to_vec(),
            },
        )
    }
}

impl FromIterator<CallRecord> for HistoricalSeries {
    fn from_iter<I: IntoIterator<Item = CallRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Raw CSV row before type coercion
#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    calls_volume: f64,
    staffing_level: f64,
    service_level: f64,
}

/// Convert a float field to a non-negative count, truncating fractions
fn to_count(value: f64, column: &str, line: u64) -> Result<u32> {
    if !value.is_finite() || value < 0.0 || value > u32::MAX as f64 {
        return Err(ForecastError::MalformedInput(format!(
            "{} on line {} must be a non-negative integer, got {}",
            column, line, value
        )));
    }
    Ok(value.trunc() as u32)
}

/// Loader for call data CSV files
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load call records from a `.csv` file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<CallRecord>> {
        let path = path.as_ref();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv {
            return Err(ForecastError::MalformedInput(format!(
                "File must be a CSV: {}",
                path.display()
            )));
        }

        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse call records from any CSV byte stream.
    ///
    /// The header must name all of [`REQUIRED_COLUMNS`]; extra columns are
    /// ignored and column order is free.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<CallRecord>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|h| h == *column))
            .collect();
        if !missing.is_empty() {
            return Err(ForecastError::MalformedInput(format!(
                "CSV must contain columns: {} (missing {})",
                REQUIRED_COLUMNS.join(", "),
                missing.join(", ")
            )));
        }

        let mut records = Vec::new();
        for row in csv_reader.deserialize::<CsvRow>() {
            let row = row?;
            let line = records.len() as u64 + 2;
            let record = CallRecord {
                date: parse_date(&row.date)?,
                calls_volume: to_count(row.calls_volume, "calls_volume", line)?,
                staffing_level: to_count(row.staffing_level, "staffing_level", line)?,
                service_level: row.service_level,
            };
            record.validate()?;
            records.push(record);
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_series_is_sorted() {
        let series = HistoricalSeries::new(vec![
            CallRecord::new(day(3), 30, 3, 0.8),
            CallRecord::new(day(1), 10, 1, 0.8),
            CallRecord::new(day(2), 20, 2, 0.8),
        ]);

        assert_eq!(series.calls_volume(), vec![10.0, 20.0, 30.0]);
        assert_eq!(series.last_date(), Some(day(3)));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let series: HistoricalSeries = vec![
            CallRecord::new(day(2), 20, 2, 0.8),
            CallRecord::new(day(1), 10, 1, 0.8),
            CallRecord::new(day(2), 25, 2, 0.8),
        ]
        .into_iter()
        .collect();

        assert_eq!(series.len(), 3);
        assert_eq!(series.calls_volume(), vec![10.0, 20.0, 25.0]);
    }

    #[test]
    fn test_split_at() {
        let series: HistoricalSeries = (1..=5)
            .map(|d| CallRecord::new(day(d), d * 10, 2, 0.9))
            .collect();

        let (train, test) = series.split_at(3);
        assert_eq!(train.len(), 3);
        assert_eq!(test.calls_volume(), vec![40.0, 50.0]);

        let (all, none) = series.split_at(10);
        assert_eq!(all.len(), 5);
        assert!(none.is_empty());
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-01-05").unwrap(), day(5));
        assert_eq!(parse_date("2024/01/05").unwrap(), day(5));
        assert_eq!(parse_date("01/05/2024").unwrap(), day(5));
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn test_record_validation() {
        assert!(CallRecord::new(day(1), 10, 1, 0.5).validate().is_ok());
        assert!(CallRecord::new(day(1), 10, 1, 1.5).validate().is_err());
        assert!(CallRecord::new(day(1), 10, 1, f64::NAN).validate().is_err());
    }
}
