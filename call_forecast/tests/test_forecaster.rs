use call_forecast::config::ForecastConfig;
use call_forecast::data::CallRecord;
use call_forecast::error::ForecastError;
use call_forecast::forecaster::{ForecastRequest, Forecaster};
use call_forecast::models::ForecastMethod;
use call_forecast::staffing::recommended_staff;
use call_forecast::store::{ForecastStore, HistoricalStore, MemoryStore};
use chrono::{Duration, NaiveDate};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::sync::Arc;

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn store_with(volumes: &[u32]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::open());
    let records = volumes
        .iter()
        .enumerate()
        .map(|(i, &v)| CallRecord::new(start() + Duration::days(i as i64), v, 14, 0.8))
        .collect();
    store.insert_many(records).unwrap();
    store
}

fn weekly_volumes(days: usize) -> Vec<u32> {
    let pattern = [330, 360, 345, 335, 320, 210, 180];
    (0..days)
        .map(|i| pattern[i % 7] + i as u32 + (i as u32 * 5) % 7)
        .collect()
}

#[rstest]
#[case("arima")]
#[case("exponential_smoothing")]
#[case("random_forest")]
#[case("linear_regression")]
#[case("seasonal_decompose")]
#[case("autoregressive")]
#[case("regression-rf")]
fn test_result_shape(#[case] method: &str) {
    let store = store_with(&weekly_volumes(35));
    let forecaster = Forecaster::new(store.clone(), store);

    let result = forecaster
        .generate_forecast(&ForecastRequest::new(method, 10))
        .unwrap();

    assert_eq!(result.predicted_calls().len(), 10);
    assert_eq!(result.staffing_recommendations().len(), 10);
    assert_eq!(result.forecast_dates().len(), 10);

    let last = start() + Duration::days(34);
    for (i, date) in result.forecast_dates().iter().enumerate() {
        assert_eq!(*date, last + Duration::days(i as i64 + 1));
    }
    assert!(result.staffing_recommendations().iter().all(|s| *s >= 1));
}

#[test]
fn test_staffing_follows_predictions() {
    let store = store_with(&weekly_volumes(21));
    let forecaster = Forecaster::new(store.clone(), store);

    let result = forecaster
        .generate_forecast(&ForecastRequest::new("seasonal_decompose", 7))
        .unwrap();

    let expected: Vec<u32> = result
        .predicted_calls()
        .iter()
        .map(|p| recommended_staff(*p, 0.8))
        .collect();
    assert_eq!(result.staffing_recommendations(), expected.as_slice());
}

#[test]
fn test_staffing_target_is_configurable() {
    let store = store_with(&weekly_volumes(21));
    let config = ForecastConfig {
        staffing_target_service_level: 0.5,
        ..ForecastConfig::default()
    };
    let forecaster = Forecaster::with_config(store.clone(), store, config);

    let result = forecaster
        .generate_forecast(&ForecastRequest::new("seasonal_decompose", 3).with_confidence_level(0.8))
        .unwrap();

    let expected: Vec<u32> = result
        .predicted_calls()
        .iter()
        .map(|p| recommended_staff(*p, 0.5))
        .collect();
    assert_eq!(result.staffing_recommendations(), expected.as_slice());
}

#[rstest]
#[case(ForecastMethod::Arima, &["aic", "bic"])]
#[case(ForecastMethod::ExponentialSmoothing, &["aic"])]
#[case(ForecastMethod::RandomForest, &["mae", "r2_score", "rmse"])]
#[case(ForecastMethod::LinearRegression, &["mae", "r2_score", "rmse"])]
fn test_accuracy_metric_names(#[case] method: ForecastMethod, #[case] names: &[&str]) {
    let store = store_with(&weekly_volumes(28));
    let forecaster = Forecaster::new(store.clone(), store);

    let result = forecaster
        .generate_forecast(&ForecastRequest::new(method.as_str(), 7))
        .unwrap();

    let metrics = result.accuracy_metrics().unwrap();
    let keys: Vec<&str> = metrics.keys().map(String::as_str).collect();
    assert_eq!(keys, names.to_vec());
}

#[test]
fn test_decomposition_has_no_metrics_or_band() {
    let store = store_with(&weekly_volumes(28));
    let forecaster = Forecaster::new(store.clone(), store);

    let result = forecaster
        .generate_forecast(&ForecastRequest::new("decomposition", 7))
        .unwrap();

    assert!(result.accuracy_metrics().is_none());
    assert!(result.confidence_intervals().is_none());
    assert!(result.predicted_calls().iter().all(|p| *p >= 0.0));
}

#[test]
fn test_bogus_method() {
    let store = store_with(&weekly_volumes(14));
    let forecaster = Forecaster::new(store.clone(), store.clone());

    let err = forecaster
        .generate_forecast(&ForecastRequest::new("bogus", 7))
        .unwrap_err();

    assert!(matches!(err, ForecastError::InvalidMethod(ref m) if m == "bogus"));
    assert!(err.is_client_error());
    assert_eq!(store.forecast_count(), 0);
}

#[rstest]
#[case(0, 0.95)]
#[case(7, 0.0)]
#[case(7, 1.0)]
#[case(7, 1.5)]
fn test_invalid_parameters(#[case] horizon: usize, #[case] confidence: f64) {
    let store = store_with(&weekly_volumes(14));
    let forecaster = Forecaster::new(store.clone(), store);

    let err = forecaster
        .generate_forecast(&ForecastRequest::new("arima", horizon).with_confidence_level(confidence))
        .unwrap_err();

    assert!(matches!(err, ForecastError::InvalidParameter(_)));
}

#[test]
fn test_history_requirements() {
    let empty = Arc::new(MemoryStore::open());
    let forecaster = Forecaster::new(empty.clone(), empty);
    let err = forecaster
        .generate_forecast(&ForecastRequest::new("arima", 7))
        .unwrap_err();
    assert!(matches!(err, ForecastError::NoData));
    assert!(err.needs_more_data());

    let short = store_with(&[100, 120, 110, 130, 125, 140]);
    let forecaster = Forecaster::new(short.clone(), short);
    let err = forecaster
        .generate_forecast(&ForecastRequest::new("arima", 7))
        .unwrap_err();
    assert!(matches!(
        err,
        ForecastError::InsufficientData {
            required: 7,
            actual: 6
        }
    ));
}

#[test]
fn test_recent_forecasts_newest_first() {
    let store = store_with(&weekly_volumes(28));
    let forecaster = Forecaster::new(store.clone(), store.clone());

    let first = forecaster
        .generate_forecast(&ForecastRequest::new("arima", 3))
        .unwrap();
    let second = forecaster
        .generate_forecast(&ForecastRequest::new("smoothing", 3))
        .unwrap();
    let third = forecaster
        .generate_forecast(&ForecastRequest::new("decomposition", 3))
        .unwrap();

    let ids: Vec<_> = forecaster
        .recent_forecasts(10)
        .unwrap()
        .iter()
        .map(|r| r.id())
        .collect();
    assert_eq!(ids, vec![third.id(), second.id(), first.id()]);

    let limited = store.list_recent(2).unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].id(), third.id());
}

#[test]
fn test_closed_store() {
    let store = store_with(&weekly_volumes(14));
    let forecaster = Forecaster::new(store.clone(), store.clone());
    store.close();

    let err = forecaster
        .generate_forecast(&ForecastRequest::new("arima", 7))
        .unwrap_err();
    assert!(matches!(err, ForecastError::Store(_)));
    assert!(!err.is_client_error());

    assert!(matches!(forecaster.analyze_accuracy(), Err(ForecastError::Store(_))));
}

#[test]
fn test_result_json() {
    let store = store_with(&weekly_volumes(21));
    let forecaster = Forecaster::new(store.clone(), store);

    let result = forecaster
        .generate_forecast(&ForecastRequest::new("arima", 2))
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();

    assert_eq!(json["method"], "arima");
    assert_eq!(json["forecast_dates"][0], "2024-06-22");
    assert!(json["confidence_intervals"]["lower"].is_array());
    assert!(json["accuracy_metrics"]["aic"].is_number());
    assert_eq!(json["staffing_recommendations"].as_array().unwrap().len(), 2);
}

#[test]
fn test_arima_ramp_end_to_end() {
    let volumes: Vec<u32> = (0..14).map(|i| 100 + 10 * i).collect();
    let store = store_with(&volumes);
    let forecaster = Forecaster::new(store.clone(), store.clone());

    let result = forecaster
        .generate_forecast(&ForecastRequest::new("arima", 7))
        .unwrap();

    assert_eq!(result.predicted_calls().len(), 7);
    assert_eq!(result.forecast_dates()[0], start() + Duration::days(14));
    let band = result.confidence_intervals().unwrap();
    assert_eq!(band.lower.len(), 7);
    assert_eq!(band.upper.len(), 7);
    for (i, prediction) in result.predicted_calls().iter().enumerate() {
        assert!(band.lower[i] <= *prediction);
        assert!(*prediction <= band.upper[i]);
    }
    assert_eq!(store.forecast_count(), 1);
}

#[test]
fn test_accuracy_with_oversized_holdout() {
    let store = store_with(&weekly_volumes(15));
    let config = ForecastConfig {
        holdout_days: 20,
        ..ForecastConfig::default()
    };
    let forecaster = Forecaster::with_config(store.clone(), store, config);

    let report = forecaster.analyze_accuracy().unwrap();
    assert!(report.is_insufficient_data());
}
