use call_forecast::{
    CallRecord, ForecastMethod, ForecastRequest, Forecaster, HistoricalStore, MemoryStore,
};
use chrono::{Duration, NaiveDate};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Call Forecast: Basic Forecasting Example");
    println!("========================================\n");

    // Create sample data
    println!("Creating sample data...");
    let store = Arc::new(MemoryStore::open());
    let inserted = store.insert_many(create_sample_records())?;
    println!("Sample data created: {} daily records\n", inserted);

    let forecaster = Forecaster::new(store.clone(), store.clone());

    // Run every method over the same history
    for method in ForecastMethod::ALL {
        let request = ForecastRequest::new(method.as_str(), 7);
        let result = match forecaster.generate_forecast(&request) {
            Ok(result) => result,
            Err(e) => {
                println!("{}: {}\n", method, e);
                continue;
            }
        };

        println!("{} forecast:", method);
        for (i, (date, calls)) in result
            .forecast_dates()
            .iter()
            .zip(result.predicted_calls())
            .enumerate()
        {
            let band = result
                .confidence_intervals()
                .map(|ci| format!(" ({:.1}, {:.1})", ci.lower[i], ci.upper[i]))
                .unwrap_or_default();
            println!(
                "  {}: {:>7.1} calls{}, {} agents",
                date,
                calls,
                band,
                result.staffing_recommendations()[i]
            );
        }
        if let Some(metrics) = result.accuracy_metrics() {
            println!("  metrics: {:?}", metrics);
        }
        println!();
    }

    // Backtest on the last week
    println!("Accuracy on the trailing week:");
    let report = forecaster.analyze_accuracy()?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

/// Eight weeks of daily volumes with a weekly cycle and a slow upward trend
fn create_sample_records() -> Vec<CallRecord> {
    let weekly = [1.1, 1.2, 1.15, 1.1, 1.05, 0.7, 0.6];
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default();

    (0..56)
        .map(|day| {
            let base = 400.0 + 2.5 * day as f64;
            let wobble = ((day * 37) % 11) as f64 - 5.0;
            let calls = (base * weekly[day % 7] + wobble).round() as u32;
            CallRecord::new(
                start + Duration::days(day as i64),
                calls,
                calls / 10,
                0.8 + 0.01 * (day % 5) as f64,
            )
        })
        .collect()
}
