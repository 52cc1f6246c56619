// src/shared_data.rs

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// Junction identifier as it appears in the traffic log.
pub type JunctionId = u32;

/// One row of the historical traffic log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    pub junction_id: JunctionId,
    pub timestamp: NaiveDateTime,
    pub vehicle_count: u32,
}

impl Observation {
    pub fn new(junction_id: JunctionId, timestamp: NaiveDateTime, vehicle_count: u32) -> Self {
        Self {
            junction_id,
            timestamp,
            vehicle_count,
        }
    }

    /// Hour of day, 0-23.
    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }

    /// Day of week, 0 = Monday .. 6 = Sunday.
    pub fn day_of_week(&self) -> u32 {
        self.timestamp.weekday().num_days_from_monday()
    }

    /// Month, 1-12.
    pub fn month(&self) -> u32 {
        self.timestamp.month()
    }
}

/// A route prediction request as accepted from the outside world.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub source_junction: JunctionId,
    pub destination_junction: JunctionId,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Time of day, `HH:MM` or `HH:MM:SS`.
    pub time: String,
}

/// Route-level forecast for a pair of junctions at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub source_junction: JunctionId,
    pub destination_junction: JunctionId,
    pub date: String,
    pub time: String,
    pub datetime: String,
    pub source_predicted_vehicles: f64,
    pub destination_predicted_vehicles: f64,
    pub route_traffic_estimate: f64,
    pub traffic_difference: f64,
    pub peak_hour: bool,
    pub weekend: bool,
}

/// Round to 2 decimal places for presentation. Exact half-cent ties go to
/// the even neighbour.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
