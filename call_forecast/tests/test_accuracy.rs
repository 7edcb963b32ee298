use call_forecast::accuracy::{AccuracyEvaluator, AccuracyReport};
use call_forecast::config::ForecastConfig;
use call_forecast::data::{CallRecord, HistoricalSeries};
use call_forecast::forecaster::Forecaster;
use call_forecast::models::ForecastMethod;
use call_forecast::store::{HistoricalStore, MemoryStore};
use chrono::{Duration, NaiveDate};
use std::sync::Arc;

fn series(days: usize) -> HistoricalSeries {
    let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    (0..days)
        .map(|i| {
            let calls = 250 + (i as u32 * 11) % 40 + if i % 7 >= 5 { 0 } else { 60 };
            CallRecord::new(start + Duration::days(i as i64), calls, 20, 0.85)
        })
        .collect()
}

#[test]
fn test_insufficient_history() {
    let evaluator = AccuracyEvaluator::new(&ForecastConfig::default());

    for days in [0, 7, 13] {
        let report = evaluator.evaluate(&series(days));
        assert!(report.is_insufficient_data());
        assert!(report.metrics().is_none());
    }
}

#[test]
fn test_failing_methods_are_excluded() {
    // seven training days are too few lag rows for either regressor
    let report = AccuracyEvaluator::new(&ForecastConfig::default()).evaluate(&series(14));

    let metrics = report.metrics().unwrap();
    let methods: Vec<ForecastMethod> = metrics.keys().copied().collect();
    assert_eq!(
        methods,
        vec![ForecastMethod::Arima, ForecastMethod::ExponentialSmoothing]
    );
}

#[test]
fn test_all_backtested_methods_scored() {
    let data = series(35);
    let report = AccuracyEvaluator::new(&ForecastConfig::default()).evaluate(&data);

    let metrics = report.metrics().unwrap();
    assert_eq!(metrics.len(), 4);
    for method in ForecastMethod::BACKTESTED {
        let scored = &metrics[&method];
        assert_eq!(scored.predictions.len(), 7);
        assert_eq!(scored.actual, data.calls_volume()[28..].to_vec());
        assert!(scored.mae >= 0.0);
        assert!(scored.rmse + 1e-9 >= scored.mae);
    }
}

#[test]
fn test_report_json_shape() {
    let report = AccuracyEvaluator::new(&ForecastConfig::default()).evaluate(&series(21));
    let json = serde_json::to_value(&report).unwrap();

    let arima = &json["arima"];
    assert!(arima["mae"].is_number());
    assert!(arima["rmse"].is_number());
    assert_eq!(arima["predictions"].as_array().unwrap().len(), 7);
    assert_eq!(arima["actual"].as_array().unwrap().len(), 7);

    let parsed: AccuracyReport = serde_json::from_value(json).unwrap();
    assert_eq!(
        parsed.metrics().unwrap().keys().collect::<Vec<_>>(),
        report.metrics().unwrap().keys().collect::<Vec<_>>()
    );
}

#[test]
fn test_forecaster_delegates_to_evaluator() {
    let store = Arc::new(MemoryStore::open());
    store.insert_many(series(10).records().to_vec()).unwrap();
    let forecaster = Forecaster::new(store.clone(), store.clone());

    assert!(forecaster.analyze_accuracy().unwrap().is_insufficient_data());

    let start = NaiveDate::from_ymd_opt(2024, 2, 11).unwrap();
    store
        .insert_many(
            (0..10)
                .map(|i| CallRecord::new(start + Duration::days(i), 300, 20, 0.9))
                .collect(),
        )
        .unwrap();

    let report = forecaster.analyze_accuracy().unwrap();
    assert!(report.metrics().is_some());
}

#[test]
fn test_custom_holdout() {
    let config = ForecastConfig {
        holdout_days: 5,
        min_accuracy_history: 20,
        ..ForecastConfig::default()
    };
    let evaluator = AccuracyEvaluator::new(&config);

    assert!(evaluator.evaluate(&series(19)).is_insufficient_data());

    let report = evaluator.evaluate(&series(30));
    let arima = &report.metrics().unwrap()[&ForecastMethod::Arima];
    assert_eq!(arima.predictions.len(), 5);
}
