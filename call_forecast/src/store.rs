//! Storage for historical call records and generated forecasts
//!
//! The forecaster only talks to the [`HistoricalStore`] and [`ForecastStore`]
//! traits. [`MemoryStore`] implements both behind `parking_lot` locks and has
//! an explicit open/close lifecycle: every operation on a closed store fails
//! with [`ForecastError::Store`].

use crate::data::{parse_date, CallRecord, DataLoader};
use crate::error::{ForecastError, Result};
use crate::forecaster::ForecastResult;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// A call record as kept by a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: Uuid,
    /// ISO `YYYY-MM-DD`
    pub date: String,
    pub calls_volume: u32,
    pub staffing_level: u32,
    pub service_level: f64,
    pub created_at: DateTime<Utc>,
}

impl StoredRecord {
    /// Assign an id and timestamp to a record
    pub fn from_record(record: &CallRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: record.date.format("%Y-%m-%d").to_string(),
            calls_volume: record.calls_volume,
            staffing_level: record.staffing_level,
            service_level: record.service_level,
            created_at: Utc::now(),
        }
    }

    pub fn to_record(&self) -> Result<CallRecord> {
        Ok(CallRecord::new(
            parse_date(&self.date)?,
            self.calls_volume,
            self.staffing_level,
            self.service_level,
        ))
    }
}

/// Source of historical call records
pub trait HistoricalStore {
    /// All records, ordered by date ascending
    fn list_all(&self) -> Result<Vec<CallRecord>>;

    fn insert(&self, record: CallRecord) -> Result<StoredRecord>;

    /// Insert a batch, returning how many were stored
    fn insert_many(&self, records: Vec<CallRecord>) -> Result<usize>;

    /// Remove every record, returning how many were removed
    fn delete_all(&self) -> Result<usize>;
}

/// Sink for generated forecasts
pub trait ForecastStore {
    fn insert_forecast(&self, result: &ForecastResult) -> Result<()>;

    /// Up to `limit` stored forecasts, most recent first
    fn list_recent(&self, limit: usize) -> Result<Vec<ForecastResult>>;
}

impl<T: HistoricalStore + ?Sized> HistoricalStore for Arc<T> {
    fn list_all(&self) -> Result<Vec<CallRecord>> {
        (**self).list_all()
    }

    fn insert(&self, record: CallRecord) -> Result<StoredRecord> {
        (**self).insert(record)
    }

    fn insert_many(&self, records: Vec<CallRecord>) -> Result<usize> {
        (**self).insert_many(records)
    }

    fn delete_all(&self) -> Result<usize> {
        (**self).delete_all()
    }
}

impl<T: ForecastStore + ?Sized> ForecastStore for Arc<T> {
    fn insert_forecast(&self, result: &ForecastResult) -> Result<()> {
        (**self).insert_forecast(result)
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<ForecastResult>> {
        (**self).list_recent(limit)
    }
}

/// In-process store for records and forecasts
#[derive(Debug)]
pub struct MemoryStore {
    open: AtomicBool,
    records: RwLock<Vec<StoredRecord>>,
    forecasts: RwLock<Vec<ForecastResult>>,
}

impl MemoryStore {
    /// Create an empty store, ready for use
    pub fn open() -> Self {
        debug!("Memory store opened");
        Self {
            open: AtomicBool::new(true),
            records: RwLock::new(Vec::new()),
            forecasts: RwLock::new(Vec::new()),
        }
    }

    /// Close the store. Later operations fail; closing twice is a no-op.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            info!("Memory store closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(ForecastError::Store("store is closed".to_string()))
        }
    }

    /// Number of stored call records
    pub fn record_count(&self) -> usize {
        self.records.read().len()
    }

    /// Number of stored forecasts
    pub fn forecast_count(&self) -> usize {
        self.forecasts.read().len()
    }
}

impl HistoricalStore for MemoryStore {
    fn list_all(&self) -> Result<Vec<CallRecord>> {
        self.ensure_open()?;
        let mut stored = self.records.read().clone();
        // ISO dates sort lexically; the sort is stable for duplicates
        stored.sort_by(|a, b| a.date.cmp(&b.date));
        stored.iter().map(StoredRecord::to_record).collect()
    }

    fn insert(&self, record: CallRecord) -> Result<StoredRecord> {
        self.ensure_open()?;
        record.validate()?;
        let stored = StoredRecord::from_record(&record);
        self.records.write().push(stored.clone());
        Ok(stored)
    }

    fn insert_many(&self, records: Vec<CallRecord>) -> Result<usize> {
        self.ensure_open()?;
        for record in &records {
            record.validate()?;
        }
        let stored: Vec<StoredRecord> = records.iter().map(StoredRecord::from_record).collect();
        let count = stored.len();
        self.records.write().extend(stored);
        debug!(count, "Inserted call records");
        Ok(count)
    }

    fn delete_all(&self) -> Result<usize> {
        self.ensure_open()?;
        let mut records = self.records.write();
        let count = records.len();
        records.clear();
        Ok(count)
    }
}

impl ForecastStore for MemoryStore {
    fn insert_forecast(&self, result: &ForecastResult) -> Result<()> {
        self.ensure_open()?;
        self.forecasts.write().push(result.clone());
        Ok(())
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<ForecastResult>> {
        self.ensure_open()?;
        let mut recent: Vec<ForecastResult> = self.forecasts.read().iter().rev().cloned().collect();
        recent.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        recent.truncate(limit);
        Ok(recent)
    }
}

/// Load a CSV file of call records into `store`, returning how many were added
pub fn import_csv<S, P>(store: &S, path: P) -> Result<usize>
where
    S: HistoricalStore + ?Sized,
    P: AsRef<Path>,
{
    let records = DataLoader::from_csv(path.as_ref())?;
    let count = store.insert_many(records)?;
    info!(count, path = %path.as_ref().display(), "Imported call records");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(day: u32, calls: u32) -> CallRecord {
        CallRecord::new(NaiveDate::from_ymd_opt(2024, 5, day).unwrap(), calls, 10, 0.9)
    }

    #[test]
    fn test_list_all_orders_by_date() {
        let store = MemoryStore::open();
        store.insert(record(3, 30)).unwrap();
        store.insert_many(vec![record(1, 10), record(2, 20)]).unwrap();

        let calls: Vec<u32> = store.list_all().unwrap().iter().map(|r| r.calls_volume).collect();
        assert_eq!(calls, vec![10, 20, 30]);
    }

    #[test]
    fn test_stored_record_keeps_iso_date() {
        let store = MemoryStore::open();
        let stored = store.insert(record(9, 90)).unwrap();

        assert_eq!(stored.date, "2024-05-09");
        assert_eq!(stored.to_record().unwrap(), record(9, 90));
    }

    #[test]
    fn test_delete_all() {
        let store = MemoryStore::open();
        store.insert_many(vec![record(1, 10), record(2, 20)]).unwrap();

        assert_eq!(store.delete_all().unwrap(), 2);
        assert!(store.list_all().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_record_rejected() {
        let store = MemoryStore::open();
        let bad = CallRecord::new(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), 10, 1, 2.0);

        assert!(store.insert(bad.clone()).is_err());
        assert!(store.insert_many(vec![record(1, 10), bad]).is_err());
        assert_eq!(store.record_count(), 0);
    }

    #[test]
    fn test_closed_store_fails() {
        let store = MemoryStore::open();
        store.close();
        store.close();

        assert!(!store.is_open());
        assert!(matches!(store.list_all(), Err(ForecastError::Store(_))));
        assert!(matches!(store.insert(record(1, 10)), Err(ForecastError::Store(_))));
        assert!(matches!(store.list_recent(5), Err(ForecastError::Store(_))));
    }
}
