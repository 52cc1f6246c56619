use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{ForecastError, Result};
use crate::shared_data::{JunctionId, Observation};

/// Layouts accepted for the `DateTime` column. Day-first variants come from
/// exports that were re-saved by spreadsheet tools.
const TIMESTAMP_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

/// Raw CSV row. Extra columns such as `ID` are ignored.
#[derive(Debug, Deserialize)]
struct TrafficRecord {
    #[serde(rename = "DateTime")]
    date_time: String,
    #[serde(rename = "Junction")]
    junction: JunctionId,
    #[serde(rename = "Vehicles")]
    vehicles: u32,
}

/// Parses a traffic log timestamp, trying each supported layout in turn.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// The traffic log, ordered by timestamp. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct HistoricalDataset {
    observations: Vec<Observation>,
}

impl HistoricalDataset {
    /// Builds a dataset from observations in load order. The sort is stable,
    /// so rows sharing a timestamp keep their relative order.
    pub fn from_observations(mut observations: Vec<Observation>) -> Self {
        observations.sort_by_key(|o| o.timestamp);
        Self { observations }
    }

    /// Parses a CSV traffic log with `DateTime`, `Junction` and `Vehicles`
    /// columns. Any malformed row fails the whole load.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut observations = Vec::new();

        for (index, result) in rdr.deserialize::<TrafficRecord>().enumerate() {
            // header is line 1
            let line = index + 2;
            let record = result.map_err(|e| {
                ForecastError::DataUnavailable(format!("line {}: {}", line, e))
            })?;
            let timestamp = parse_timestamp(&record.date_time).ok_or_else(|| {
                ForecastError::DataUnavailable(format!(
                    "line {}: unrecognised timestamp '{}'",
                    line, record.date_time
                ))
            })?;
            observations.push(Observation::new(record.junction, timestamp, record.vehicles));
        }

        Ok(Self::from_observations(observations))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            ForecastError::DataUnavailable(format!(
                "traffic data file {} not found: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_reader(file).map_err(|e| match e {
            ForecastError::DataUnavailable(msg) => {
                ForecastError::DataUnavailable(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Distinct junction ids, ascending.
    pub fn junction_ids(&self) -> Vec<JunctionId> {
        self.observations
            .iter()
            .map(|o| o.junction_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Observations for one junction, oldest first.
    pub fn for_junction(
        &self,
        junction_id: JunctionId,
    ) -> impl DoubleEndedIterator<Item = &Observation> {
        self.observations
            .iter()
            .filter(move |o| o.junction_id == junction_id)
    }

    /// Mean vehicle count across every junction, `None` when empty.
    pub fn mean_vehicles(&self) -> Option<f64> {
        if self.observations.is_empty() {
            return None;
        }
        let total: f64 = self.observations.iter().map(|o| o.vehicle_count as f64).sum();
        Some(total / self.observations.len() as f64)
    }
}
