//! Forecast report
//!
//! Loads daily call records from a CSV file, then prints either a forecast or
//! the hold-out accuracy analysis as JSON.

use call_forecast::{
    import_csv, ForecastConfig, ForecastRequest, Forecaster, MemoryStore, NAME, VERSION,
};
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Call volume forecast report", long_about = None)]
struct Args {
    /// CSV file with date, calls_volume, staffing_level and service_level columns
    #[arg(long)]
    csv: PathBuf,

    /// Forecasting method (arima, exponential_smoothing, random_forest,
    /// linear_regression, seasonal_decompose)
    #[arg(short, long, default_value = "arima")]
    method: String,

    /// Days to forecast
    #[arg(short, long, default_value = "7")]
    days: usize,

    /// Confidence level for the forecast interval
    #[arg(short, long, default_value = "0.95")]
    confidence: f64,

    /// Run the accuracy analysis instead of a forecast
    #[arg(long)]
    accuracy: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!(name = NAME, version = VERSION, "Starting forecast report");

    let config = ForecastConfig::from_env()?;
    let store = Arc::new(MemoryStore::open());
    import_csv(store.as_ref(), &args.csv)?;

    let forecaster = Forecaster::with_config(store.clone(), store.clone(), config);
    let output = if args.accuracy {
        serde_json::to_string_pretty(&forecaster.analyze_accuracy()?)?
    } else {
        let request =
            ForecastRequest::new(args.method, args.days).with_confidence_level(args.confidence);
        forecaster.generate_forecast(&request)?.to_json()?
    };
    println!("{}", output);

    store.close();
    Ok(())
}
