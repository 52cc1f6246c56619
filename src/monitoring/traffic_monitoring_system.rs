use serde::Serialize;
use std::error::Error;
use std::fs;
use std::io::{stdin, stdout, Write};
use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::Arc;

use crate::error::ForecastError;
use crate::flow_analyzer::{junction_overview, junction_stats, traffic_stats};
use crate::prediction::{validate_request, ModelAdapter, PredictionService};
use crate::shared_data::{JunctionId, PredictionRequest, PredictionResult};

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints every junction with its summary statistics.
pub fn show_junction_overview<M: ModelAdapter>(
    service: &PredictionService<M>,
) -> Result<(), Box<dyn Error>> {
    let dataset = service.store().load()?;
    print_json(&junction_overview(&dataset))
}

pub fn show_junction_stats<M: ModelAdapter>(
    service: &PredictionService<M>,
    junction_id: JunctionId,
) -> Result<(), Box<dyn Error>> {
    let dataset = service.store().load()?;
    print_json(&junction_stats(&dataset, junction_id)?.rounded())
}

/// Prints global statistics: date range, overall counts, peak hours and
/// hourly/daily averages.
pub fn show_traffic_stats<M: ModelAdapter>(
    service: &PredictionService<M>,
) -> Result<(), Box<dyn Error>> {
    let dataset = service.store().load()?;
    print_json(&traffic_stats(&dataset)?)
}

/// Validates and runs one request on the blocking pool.
pub async fn run_prediction<M: ModelAdapter + 'static>(
    service: Arc<PredictionService<M>>,
    junctions: RangeInclusive<JunctionId>,
    request: PredictionRequest,
) -> Result<PredictionResult, ForecastError> {
    validate_request(&request, &junctions)?;
    tokio::task::spawn_blocking(move || service.predict(&request))
        .await
        .map_err(|e| {
            ForecastError::Scoring(format!("prediction task aborted: {}", e)).into_prediction()
        })?
}

/// Reads a JSON array of requests and runs them concurrently. Results are
/// printed in input order.
pub async fn run_batch_predictions<M: ModelAdapter + 'static>(
    service: Arc<PredictionService<M>>,
    junctions: RangeInclusive<JunctionId>,
    path: &Path,
) -> Result<(), Box<dyn Error>> {
    let data = fs::read_to_string(path)?;
    let requests: Vec<PredictionRequest> = serde_json::from_str(&data)?;
    log::info!("Running {} batch predictions from {}", requests.len(), path.display());

    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let service = Arc::clone(&service);
            let junctions = junctions.clone();
            tokio::spawn(run_prediction(service, junctions, request))
        })
        .collect();

    let mut failed = 0;
    for (i, handle) in handles.into_iter().enumerate() {
        match handle.await? {
            Ok(result) => print_json(&result)?,
            Err(e) => {
                failed += 1;
                eprintln!("Request {} failed: {}", i + 1, e);
            }
        }
    }
    println!("Batch finished with {} failures.", failed);
    Ok(())
}

/// Prints `label` and reads one trimmed line; `None` on end of input.
fn prompt(label: &str) -> Option<String> {
    print!("{}", label);
    if stdout().flush().is_err() {
        return None;
    }
    let mut input = String::new();
    match stdin().read_line(&mut input) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(input.trim().to_string()),
    }
}

fn prompt_junction(label: &str) -> Option<JunctionId> {
    let raw = prompt(label)?;
    match raw.parse::<JunctionId>() {
        Ok(id) => Some(id),
        Err(_) => {
            println!("'{}' is not a junction id.", raw);
            None
        }
    }
}

/// Menu line telling the operator whether the traffic log has been read yet.
fn data_status<M: ModelAdapter>(service: &PredictionService<M>) -> &'static str {
    if service.store().is_loaded() {
        "Traffic data: loaded"
    } else {
        "Traffic data: not loaded yet (read on first use)"
    }
}

fn report(result: Result<(), Box<dyn Error>>, what: &str) {
    if let Err(e) = result {
        eprintln!("Error {}: {}", what, e);
    }
}

/// Provides a simple CLI for operators.
pub async fn run_cli<M: ModelAdapter + 'static>(
    service: Arc<PredictionService<M>>,
    junctions: RangeInclusive<JunctionId>,
) {
    loop {
        println!("\nJunction Traffic Forecast Console");
        println!("{}", data_status(&service));
        println!("1. Display Junction Overview");
        println!("2. Display Statistics for One Junction");
        println!("3. Display Traffic Statistics");
        println!("4. Predict Route Traffic");
        println!("5. Run Batch Predictions from JSON File");
        println!("6. Exit");
        let Some(input) = prompt("Enter your choice: ") else {
            println!("Input closed, exiting.");
            break;
        };
        match input.parse::<u32>().unwrap_or(0) {
            1 => report(show_junction_overview(&service), "displaying junctions"),
            2 => {
                if let Some(id) = prompt_junction("Enter junction ID: ") {
                    report(show_junction_stats(&service, id), "displaying junction statistics");
                }
            }
            3 => report(show_traffic_stats(&service), "displaying traffic statistics"),
            4 => {
                let Some(source_junction) = prompt_junction("Source junction: ") else {
                    continue;
                };
                let Some(destination_junction) = prompt_junction("Destination junction: ") else {
                    continue;
                };
                let Some(date) = prompt("Date (YYYY-MM-DD): ") else {
                    continue;
                };
                let Some(time) = prompt("Time (HH:MM or HH:MM:SS): ") else {
                    continue;
                };
                let request = PredictionRequest {
                    source_junction,
                    destination_junction,
                    date,
                    time,
                };
                match run_prediction(Arc::clone(&service), junctions.clone(), request).await {
                    Ok(result) => report(print_json(&result), "printing prediction"),
                    Err(e) if e.is_server_side() => eprintln!("Server error: {}", e),
                    Err(e) => eprintln!("Request rejected: {}", e),
                }
            }
            5 => {
                if let Some(path) = prompt("Path to request file: ") {
                    let service = Arc::clone(&service);
                    report(
                        run_batch_predictions(service, junctions.clone(), Path::new(&path)).await,
                        "running batch predictions",
                    );
                }
            }
            6 => {
                println!("Exiting CLI.");
                break;
            }
            _ => {
                println!("Invalid choice. Try again.");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::historical::{HistoricalDataset, HistoricalStore};
    use crate::prediction::FeatureVector;
    use crate::shared_data::Observation;
    use chrono::NaiveDate;

    struct LagModel(Vec<String>);

    impl ModelAdapter for LagModel {
        fn schema(&self) -> &[String] {
            &self.0
        }

        fn score(&self, features: &FeatureVector) -> crate::error::Result<f64> {
            Ok(features.get("lag_1").unwrap_or(0.0) * 2.0)
        }
    }

    fn service() -> Arc<PredictionService<LagModel>> {
        let ts = NaiveDate::from_ymd_opt(2017, 6, 5)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let store = HistoricalStore::preloaded(HistoricalDataset::from_observations(vec![
            Observation::new(1, ts, 12),
            Observation::new(2, ts, 4),
        ]));
        Arc::new(
            PredictionService::new(Arc::new(store), Arc::new(LagModel(vec!["lag_1".to_string()])))
                .unwrap(),
        )
    }

    fn request(destination_junction: JunctionId) -> PredictionRequest {
        PredictionRequest {
            source_junction: 1,
            destination_junction,
            date: "2025-09-22".to_string(),
            time: "18:15".to_string(),
        }
    }

    #[tokio::test]
    async fn prediction_runs_on_blocking_pool() {
        let result = run_prediction(service(), 1..=4, request(2)).await.unwrap();
        assert_eq!(result.source_predicted_vehicles, 24.0);
        assert_eq!(result.destination_predicted_vehicles, 8.0);
        assert_eq!(result.route_traffic_estimate, 16.0);
        assert!(result.peak_hour);
        assert!(!result.weekend);
    }

    #[tokio::test]
    async fn out_of_range_junction_is_rejected_before_prediction() {
        let err = run_prediction(service(), 1..=4, request(7)).await.unwrap_err();
        assert!(matches!(err, ForecastError::InvalidRequest(_)));
        assert!(!err.is_server_side());
    }

    #[tokio::test]
    async fn batch_file_runs_every_request() {
        let path = std::env::temp_dir().join(format!(
            "junction_forecast_batch_{}.json",
            std::process::id()
        ));
        fs::write(&path, serde_json::to_string(&vec![request(2), request(9)]).unwrap()).unwrap();
        run_batch_predictions(service(), 1..=4, &path).await.unwrap();
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn data_status_follows_the_store() {
        assert_eq!(data_status(&service()), "Traffic data: loaded");

        let lazy = PredictionService::new(
            Arc::new(HistoricalStore::new("/nonexistent/traffic.csv")),
            Arc::new(LagModel(vec!["lag_1".to_string()])),
        )
        .unwrap();
        assert!(data_status(&lazy).contains("not loaded"));
        assert!(show_traffic_stats(&lazy).is_err());
        assert!(data_status(&lazy).contains("not loaded"));
    }

    #[tokio::test]
    async fn unreadable_batch_file_is_an_error() {
        let missing = Path::new("/nonexistent/requests.json");
        assert!(run_batch_predictions(service(), 1..=4, missing).await.is_err());
    }
}
