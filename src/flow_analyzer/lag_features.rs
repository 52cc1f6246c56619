use serde::Serialize;

use crate::historical::HistoricalDataset;
use crate::shared_data::JunctionId;

/// The three most recent vehicle counts for a junction, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LagFeatures {
    pub lag_1: f64,
    pub lag_2: f64,
    pub lag_3: f64,
}

impl LagFeatures {
    pub fn uniform(value: f64) -> Self {
        Self {
            lag_1: value,
            lag_2: value,
            lag_3: value,
        }
    }
}

/// Resolves lag features for `junction_id`. Never fails:
///
/// - 3+ observations: the three most recent counts.
/// - 2 observations: both counts, with the older one repeated as `lag_3`.
/// - 1 observation: that count for all three lags.
/// - none: the global mean across all junctions (0.0 for an empty dataset).
///
/// The dataset is sorted by timestamp with ties in file order, so among rows
/// sharing a timestamp the one loaded last counts as most recent.
pub fn resolve(dataset: &HistoricalDataset, junction_id: JunctionId) -> LagFeatures {
    let recent: Vec<f64> = dataset
        .for_junction(junction_id)
        .rev()
        .take(3)
        .map(|o| o.vehicle_count as f64)
        .collect();

    match recent.as_slice() {
        [newest, second, third, ..] => LagFeatures {
            lag_1: *newest,
            lag_2: *second,
            lag_3: *third,
        },
        [newest, second] => LagFeatures {
            lag_1: *newest,
            lag_2: *second,
            lag_3: *second,
        },
        [only] => LagFeatures::uniform(*only),
        [] => {
            let global_mean = dataset.mean_vehicles().unwrap_or(0.0);
            log::debug!(
                "No history for junction {}; using global mean {:.2} for lags",
                junction_id,
                global_mean
            );
            LagFeatures::uniform(global_mean)
        }
    }
}
