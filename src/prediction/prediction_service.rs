use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::ops::RangeInclusive;
use std::sync::Arc;

use crate::error::{ForecastError, Result};
use crate::flow_analyzer::lag_features;
use crate::global_variables::{is_peak_hour, is_weekend_day};
use crate::historical::{HistoricalDataset, HistoricalStore};
use crate::prediction::feature_vector::{self, FeatureSchema, FeatureVector};
use crate::prediction::model_adapter::ModelAdapter;
use crate::shared_data::{round2, JunctionId, PredictionRequest, PredictionResult};

/// Parses `YYYY-MM-DD` and `HH:MM` / `HH:MM:SS` into one timestamp.
pub fn parse_request_datetime(date: &str, time: &str) -> Result<NaiveDateTime> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
        ForecastError::InvalidRequest(format!("date must be in YYYY-MM-DD format, got '{}'", date))
    })?;
    let time_str = time.trim();
    let fmt = if time_str.matches(':').count() == 1 {
        "%H:%M"
    } else {
        "%H:%M:%S"
    };
    let at = NaiveTime::parse_from_str(time_str, fmt).map_err(|_| {
        ForecastError::InvalidRequest(format!(
            "time must be in HH:MM or HH:MM:SS format, got '{}'",
            time
        ))
    })?;
    Ok(day.and_time(at))
}

/// Boundary checks applied before a request reaches the service.
pub fn validate_request(
    request: &PredictionRequest,
    junctions: &RangeInclusive<JunctionId>,
) -> Result<()> {
    for (field, id) in [
        ("source_junction", request.source_junction),
        ("destination_junction", request.destination_junction),
    ] {
        if !junctions.contains(&id) {
            return Err(ForecastError::InvalidRequest(format!(
                "{} must be between {} and {}, got {}",
                field,
                junctions.start(),
                junctions.end(),
                id
            )));
        }
    }
    parse_request_datetime(&request.date, &request.time).map(|_| ())
}

/// Turns route requests into forecasts using the cached traffic log and a
/// scoring model.
pub struct PredictionService<M: ModelAdapter> {
    store: Arc<HistoricalStore>,
    model: Arc<M>,
    schema: FeatureSchema,
}

impl<M: ModelAdapter> PredictionService<M> {
    /// Fails with `Configuration` if the model's schema cannot be satisfied
    /// by the feature builder.
    pub fn new(store: Arc<HistoricalStore>, model: Arc<M>) -> Result<Self> {
        let schema = FeatureSchema::new(model.schema().to_vec())?;
        log::debug!("Feature schema validated: {:?}", schema.names());
        Ok(Self {
            store,
            model,
            schema,
        })
    }

    pub fn store(&self) -> &Arc<HistoricalStore> {
        &self.store
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Schema-ordered features for one junction at `timestamp`.
    pub fn features_for(
        &self,
        dataset: &HistoricalDataset,
        junction_id: JunctionId,
        timestamp: NaiveDateTime,
    ) -> Result<FeatureVector> {
        let lags = lag_features::resolve(dataset, junction_id);
        self.schema.align(&feature_vector::build(timestamp, lags))
    }

    fn predict_junction(
        &self,
        dataset: &HistoricalDataset,
        junction_id: JunctionId,
        timestamp: NaiveDateTime,
    ) -> Result<f64> {
        let features = self.features_for(dataset, junction_id, timestamp)?;
        let score = self.model.score(&features)?;
        if !score.is_finite() {
            return Err(ForecastError::Scoring(format!(
                "junction {} scored a non-finite value",
                junction_id
            )));
        }
        Ok(score)
    }

    fn predict_inner(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let timestamp = parse_request_datetime(&request.date, &request.time)?;
        let dataset = self.store.load()?;

        let source = self.predict_junction(&dataset, request.source_junction, timestamp)?;
        let destination = self.predict_junction(&dataset, request.destination_junction, timestamp)?;

        let route_traffic_estimate = (source + destination) / 2.0;
        let traffic_difference = (source - destination).abs();
        let day_of_week = timestamp.weekday().num_days_from_monday();

        Ok(PredictionResult {
            source_junction: request.source_junction,
            destination_junction: request.destination_junction,
            date: request.date.clone(),
            time: request.time.clone(),
            datetime: timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            source_predicted_vehicles: round2(source),
            destination_predicted_vehicles: round2(destination),
            route_traffic_estimate: round2(route_traffic_estimate),
            traffic_difference: round2(traffic_difference),
            peak_hour: is_peak_hour(timestamp.hour()),
            weekend: is_weekend_day(day_of_week),
        })
    }

    /// Forecasts both junctions of a route. Either both predictions succeed
    /// or the whole request fails with `Prediction`.
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        match self.predict_inner(request) {
            Ok(result) => {
                log::debug!(
                    "Route {} -> {} at {}: {:.2} / {:.2}",
                    result.source_junction,
                    result.destination_junction,
                    result.datetime,
                    result.source_predicted_vehicles,
                    result.destination_predicted_vehicles
                );
                Ok(result)
            }
            Err(e) => {
                log::warn!(
                    "Prediction {} -> {} failed: {}",
                    request.source_junction,
                    request.destination_junction,
                    e
                );
                Err(e.into_prediction())
            }
        }
    }

    /// Runs each request independently; one failure does not affect the rest.
    pub fn predict_batch(&self, requests: &[PredictionRequest]) -> Vec<Result<PredictionResult>> {
        requests.iter().map(|r| self.predict(r)).collect()
    }
}
