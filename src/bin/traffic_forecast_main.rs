use junction_forecast::config::ForecastConfig;
use junction_forecast::historical::HistoricalStore;
use junction_forecast::monitoring::traffic_monitoring_system::run_cli;
use junction_forecast::prediction::{PredictionService, TreeEnsembleModel};
use std::process::ExitCode;
use std::sync::Arc;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let config = match ForecastConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Startup error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    log::info!("Configuration: {:?}", config);

    let model = match TreeEnsembleModel::load(&config.model_path, config.features_path.as_deref()) {
        Ok(model) => Arc::new(model),
        Err(e) => {
            eprintln!("Failed to load model: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // The traffic log is read lazily on first use.
    let store = Arc::new(HistoricalStore::new(config.traffic_data_path.clone()));

    let service = match PredictionService::new(store, model) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            eprintln!("Model schema does not match the feature builder: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Starting junction traffic forecast console...");
    run_cli(service, config.junction_range()).await;
    ExitCode::SUCCESS
}
