// Shared dataset generator for the benchmarks.

use chrono::{Duration, NaiveDate};
use junction_forecast::historical::HistoricalDataset;
use junction_forecast::shared_data::Observation;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Hourly readings for `junctions` junctions over `hours` hours, with a
/// morning and evening rush on top of random noise.
pub fn generate_dataset(junctions: u32, hours: i64) -> HistoricalDataset {
    let mut rng = StdRng::seed_from_u64(42);
    let start = NaiveDate::from_ymd_opt(2015, 11, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    let mut observations = Vec::with_capacity((junctions as usize) * hours as usize);
    for junction in 1..=junctions {
        for h in 0..hours {
            let timestamp = start + Duration::hours(h);
            let rush = match h % 24 {
                7..=9 | 17..=19 => 25,
                _ => 0,
            };
            let vehicles = rng.random_range(5..40) + rush;
            observations.push(Observation::new(junction, timestamp, vehicles));
        }
    }
    HistoricalDataset::from_observations(observations)
}
