//! # Call Forecast
//!
//! Call-center volume forecasting with staffing recommendations.
//!
//! ## Features
//!
//! - CSV ingestion of daily call records
//! - Five forecasting methods behind one [`ForecastingStrategy`] contract:
//!   ARIMA(1,1,1), Holt-Winters smoothing, random forest and linear regression
//!   on calendar and lag features, and additive seasonal decomposition
//! - Staffing recommendations for every forecast day
//! - Hold-out accuracy analysis across the model-based methods
//! - Pluggable record and forecast stores with an in-memory implementation
//!
//! ## Quick Start
//!
//! ```rust
//! use call_forecast::{CallRecord, ForecastRequest, Forecaster, HistoricalStore, MemoryStore};
//! use chrono::{Duration, NaiveDate};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::open());
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let records = (0..14)
//!     .map(|i| CallRecord::new(start + Duration::days(i), 100 + 10 * i as u32, 12, 0.85))
//!     .collect();
//! store.insert_many(records)?;
//!
//! let forecaster = Forecaster::new(store.clone(), store);
//! let result = forecaster.generate_forecast(&ForecastRequest::new("arima", 7))?;
//! assert_eq!(result.predicted_calls().len(), 7);
//! assert_eq!(result.staffing_recommendations().len(), 7);
//! # Ok::<(), call_forecast::ForecastError>(())
//! ```

pub mod accuracy;
pub mod config;
pub mod data;
pub mod error;
pub mod forecaster;
pub mod metrics;
pub mod models;
pub mod staffing;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use crate::accuracy::{AccuracyEvaluator, AccuracyReport, MethodAccuracy};
pub use crate::config::ForecastConfig;
pub use crate::data::{CallRecord, DataLoader, HistoricalSeries};
pub use crate::error::{ForecastError, Result};
pub use crate::forecaster::{ForecastRequest, ForecastResult, Forecaster};
pub use crate::models::{ForecastMethod, ForecastingStrategy};
pub use crate::staffing::{recommended_staff, StaffingEstimator};
pub use crate::store::{import_csv, ForecastStore, HistoricalStore, MemoryStore};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
