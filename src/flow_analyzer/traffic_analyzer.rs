// traffic_analyzer.rs
//
// Descriptive statistics over the historical traffic log. Functions here
// return full-precision values; the report builders at the bottom round to
// two decimals for presentation.

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::error::{ForecastError, Result};
use crate::global_variables::DEFAULT_PEAK_HOUR_COUNT;
use crate::historical::HistoricalDataset;
use crate::shared_data::{round2, JunctionId, Observation};

fn serialize_timestamp<S: Serializer>(
    ts: &NaiveDateTime,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&ts.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Running count/sum/min/max over vehicle counts.
#[derive(Debug, Clone, Copy)]
struct VehicleAccumulator {
    count: usize,
    total: f64,
    min: u32,
    max: u32,
}

impl VehicleAccumulator {
    fn new() -> Self {
        Self {
            count: 0,
            total: 0.0,
            min: u32::MAX,
            max: 0,
        }
    }

    fn push(&mut self, vehicles: u32) {
        self.count += 1;
        self.total += vehicles as f64;
        self.min = self.min.min(vehicles);
        self.max = self.max.max(vehicles);
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }
}

/// Summary for a single junction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JunctionStats {
    pub junction_id: JunctionId,
    pub total_records: usize,
    pub avg_vehicles: f64,
    pub max_vehicles: u32,
    pub min_vehicles: u32,
    #[serde(serialize_with = "serialize_timestamp")]
    pub last_recorded: NaiveDateTime,
}

impl JunctionStats {
    pub fn rounded(&self) -> Self {
        Self {
            avg_vehicles: round2(self.avg_vehicles),
            ..self.clone()
        }
    }
}

/// Whole-dataset summary.
#[derive(Debug, Clone, PartialEq)]
pub struct OverallStats {
    pub record_count: usize,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub mean_vehicles: f64,
    pub min_vehicles: u32,
    pub max_vehicles: u32,
}

fn summarize<'a, I>(observations: I) -> Option<(VehicleAccumulator, NaiveDateTime, NaiveDateTime)>
where
    I: IntoIterator<Item = &'a Observation>,
{
    let mut acc = VehicleAccumulator::new();
    let mut range: Option<(NaiveDateTime, NaiveDateTime)> = None;
    for obs in observations {
        acc.push(obs.vehicle_count);
        range = Some(match range {
            None => (obs.timestamp, obs.timestamp),
            Some((lo, hi)) => (lo.min(obs.timestamp), hi.max(obs.timestamp)),
        });
    }
    range.map(|(lo, hi)| (acc, lo, hi))
}

/// Stats for one junction. Fails with `EmptyDataset` if it has no rows.
pub fn junction_stats(
    dataset: &HistoricalDataset,
    junction_id: JunctionId,
) -> Result<JunctionStats> {
    let (acc, _, last) = summarize(dataset.for_junction(junction_id))
        .ok_or(ForecastError::EmptyDataset(Some(junction_id)))?;
    Ok(JunctionStats {
        junction_id,
        total_records: acc.count,
        avg_vehicles: acc.mean(),
        max_vehicles: acc.max,
        min_vehicles: acc.min,
        last_recorded: last,
    })
}

/// One entry per junction present in the dataset, ascending by id.
pub fn per_junction_stats(dataset: &HistoricalDataset) -> Vec<JunctionStats> {
    let mut by_junction: BTreeMap<JunctionId, (VehicleAccumulator, NaiveDateTime)> =
        BTreeMap::new();
    for obs in dataset.observations() {
        let entry = by_junction
            .entry(obs.junction_id)
            .or_insert((VehicleAccumulator::new(), obs.timestamp));
        entry.0.push(obs.vehicle_count);
        entry.1 = entry.1.max(obs.timestamp);
    }

    by_junction
        .into_iter()
        .map(|(junction_id, (acc, last))| JunctionStats {
            junction_id,
            total_records: acc.count,
            avg_vehicles: acc.mean(),
            max_vehicles: acc.max,
            min_vehicles: acc.min,
            last_recorded: last,
        })
        .collect()
}

pub fn overall_stats(dataset: &HistoricalDataset) -> Result<OverallStats> {
    let (acc, start, end) =
        summarize(dataset.observations()).ok_or(ForecastError::EmptyDataset(None))?;
    Ok(OverallStats {
        record_count: acc.count,
        start,
        end,
        mean_vehicles: acc.mean(),
        min_vehicles: acc.min,
        max_vehicles: acc.max,
    })
}

fn grouped_means<F>(dataset: &HistoricalDataset, key: F) -> BTreeMap<u32, f64>
where
    F: Fn(&Observation) -> u32,
{
    let mut groups: BTreeMap<u32, VehicleAccumulator> = BTreeMap::new();
    for obs in dataset.observations() {
        groups
            .entry(key(obs))
            .or_insert_with(VehicleAccumulator::new)
            .push(obs.vehicle_count);
    }
    groups.into_iter().map(|(k, acc)| (k, acc.mean())).collect()
}

/// Mean vehicle count per hour of day. Hours with no data are absent.
pub fn hourly_averages(dataset: &HistoricalDataset) -> BTreeMap<u32, f64> {
    grouped_means(dataset, Observation::hour)
}

/// Mean vehicle count per day of week (0 = Monday).
pub fn daily_averages(dataset: &HistoricalDataset) -> BTreeMap<u32, f64> {
    grouped_means(dataset, Observation::day_of_week)
}

/// The `k` hours with the highest mean, highest first; equal means go to the
/// earlier hour.
pub fn rank_peak_hours(hourly: &BTreeMap<u32, f64>, k: usize) -> Vec<u32> {
    let mut ranked: Vec<(u32, f64)> = hourly.iter().map(|(&h, &m)| (h, m)).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.into_iter().take(k).map(|(hour, _)| hour).collect()
}

pub fn peak_hours(dataset: &HistoricalDataset, k: usize) -> Vec<u32> {
    rank_peak_hours(&hourly_averages(dataset), k)
}

// ---------- Reports ----------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JunctionOverview {
    pub available_junctions: Vec<JunctionId>,
    pub junction_statistics: Vec<JunctionStats>,
    pub total_junctions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSummary {
    pub avg_vehicles: f64,
    pub max_vehicles: u32,
    pub min_vehicles: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrafficStats {
    pub total_records: usize,
    pub date_range: DateRange,
    pub overall_stats: VehicleSummary,
    pub peak_hours: Vec<u32>,
    pub hourly_averages: BTreeMap<u32, f64>,
    pub daily_averages: BTreeMap<u32, f64>,
}

fn round_values(map: BTreeMap<u32, f64>) -> BTreeMap<u32, f64> {
    map.into_iter().map(|(k, v)| (k, round2(v))).collect()
}

pub fn junction_overview(dataset: &HistoricalDataset) -> JunctionOverview {
    let junction_statistics: Vec<JunctionStats> =
        per_junction_stats(dataset).iter().map(JunctionStats::rounded).collect();
    let available_junctions: Vec<JunctionId> =
        junction_statistics.iter().map(|s| s.junction_id).collect();
    JunctionOverview {
        total_junctions: available_junctions.len(),
        available_junctions,
        junction_statistics,
    }
}

pub fn traffic_stats(dataset: &HistoricalDataset) -> Result<TrafficStats> {
    let overall = overall_stats(dataset)?;
    let hourly = hourly_averages(dataset);
    let peak_hours = rank_peak_hours(&hourly, DEFAULT_PEAK_HOUR_COUNT);

    Ok(TrafficStats {
        total_records: overall.record_count,
        date_range: DateRange {
            start: overall.start.format("%Y-%m-%d").to_string(),
            end: overall.end.format("%Y-%m-%d").to_string(),
        },
        overall_stats: VehicleSummary {
            avg_vehicles: round2(overall.mean_vehicles),
            max_vehicles: overall.max_vehicles,
            min_vehicles: overall.min_vehicles,
        },
        peak_hours,
        hourly_averages: round_values(hourly),
        daily_averages: round_values(daily_averages(dataset)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        // June 2017: the 5th is a Monday
        NaiveDate::from_ymd_opt(2017, 6, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn sample() -> HistoricalDataset {
        HistoricalDataset::from_observations(vec![
            Observation::new(2, at(5, 8), 30),
            Observation::new(1, at(5, 7), 10),
            Observation::new(1, at(5, 8), 20),
            Observation::new(1, at(6, 8), 25),
            Observation::new(2, at(10, 7), 5),
        ])
    }

    #[test]
    fn per_junction_stats_sorted_by_id() {
        let stats = per_junction_stats(&sample());
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].junction_id, 1);
        assert_eq!(stats[0].total_records, 3);
        assert_eq!(stats[0].min_vehicles, 10);
        assert_eq!(stats[0].max_vehicles, 25);
        assert!((stats[0].avg_vehicles - 55.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats[0].last_recorded, at(6, 8));
        assert_eq!(stats[1].junction_id, 2);
        assert_eq!(stats[1].last_recorded, at(10, 7));
    }

    #[test]
    fn single_junction_matches_batch_stats() {
        let dataset = sample();
        let batch = per_junction_stats(&dataset);
        assert_eq!(junction_stats(&dataset, 2).unwrap(), batch[1]);
    }

    #[test]
    fn unknown_junction_is_empty_dataset() {
        assert!(matches!(
            junction_stats(&sample(), 9),
            Err(ForecastError::EmptyDataset(Some(9)))
        ));
    }

    #[test]
    fn overall_stats_cover_whole_dataset() {
        let overall = overall_stats(&sample()).unwrap();
        assert_eq!(overall.record_count, 5);
        assert_eq!(overall.start, at(5, 7));
        assert_eq!(overall.end, at(10, 7));
        assert_eq!(overall.mean_vehicles, 18.0);
        assert_eq!(overall.min_vehicles, 5);
        assert_eq!(overall.max_vehicles, 30);
    }

    #[test]
    fn overall_stats_on_empty_dataset_fail() {
        assert!(matches!(
            overall_stats(&HistoricalDataset::default()),
            Err(ForecastError::EmptyDataset(None))
        ));
    }

    #[test]
    fn hourly_and_daily_means() {
        let dataset = sample();
        let hourly = hourly_averages(&dataset);
        assert_eq!(hourly.get(&7), Some(&7.5));
        assert_eq!(hourly.get(&8), Some(&25.0));
        assert_eq!(hourly.len(), 2);

        let daily = daily_averages(&dataset);
        assert_eq!(daily.get(&0), Some(&20.0)); // Monday: 30, 10, 20
        assert_eq!(daily.get(&1), Some(&25.0));
        assert_eq!(daily.get(&5), Some(&5.0)); // Saturday
    }

    #[test]
    fn peak_hours_descending_by_mean() {
        let hourly: BTreeMap<u32, f64> =
            [(7, 40.0), (8, 55.0), (9, 50.0), (17, 45.0)].into_iter().collect();
        assert_eq!(rank_peak_hours(&hourly, 3), vec![8, 9, 17]);
    }

    #[test]
    fn peak_hour_ties_prefer_lower_hour() {
        let hourly: BTreeMap<u32, f64> =
            [(18, 50.0), (8, 50.0), (12, 10.0)].into_iter().collect();
        assert_eq!(rank_peak_hours(&hourly, 2), vec![8, 18]);
        assert_eq!(rank_peak_hours(&hourly, 10), vec![8, 18, 12]);
    }

    #[test]
    fn traffic_stats_report_is_rounded() {
        let dataset = HistoricalDataset::from_observations(vec![
            Observation::new(1, at(5, 8), 10),
            Observation::new(1, at(5, 8), 10),
            Observation::new(1, at(7, 9), 11),
        ]);
        let report = traffic_stats(&dataset).unwrap();
        assert_eq!(report.overall_stats.avg_vehicles, 10.33);
        assert_eq!(report.date_range.start, "2017-06-05");
        assert_eq!(report.date_range.end, "2017-06-07");
        assert_eq!(report.peak_hours, vec![9, 8]);
        assert_eq!(report.daily_averages.get(&2), Some(&11.0));
    }

    #[test]
    fn half_cent_means_round_to_even_in_reports() {
        // eight readings at 08:00 summing to 457: mean 57.125
        let counts = [50, 55, 57, 58, 59, 60, 60, 58];
        let dataset = HistoricalDataset::from_observations(
            counts
                .iter()
                .enumerate()
                .map(|(i, &n)| Observation::new(1, at(5 + i as u32, 8), n))
                .collect(),
        );
        assert_eq!(hourly_averages(&dataset).get(&8), Some(&57.125));

        let report = traffic_stats(&dataset).unwrap();
        assert_eq!(report.hourly_averages.get(&8), Some(&57.12));
        assert_eq!(report.overall_stats.avg_vehicles, 57.12);
        assert_eq!(junction_overview(&dataset).junction_statistics[0].avg_vehicles, 57.12);
    }

    #[test]
    fn junction_overview_lists_sorted_ids() {
        let overview = junction_overview(&sample());
        assert_eq!(overview.available_junctions, vec![1, 2]);
        assert_eq!(overview.total_junctions, 2);
        assert_eq!(overview.junction_statistics[0].avg_vehicles, 18.33);

        let json = serde_json::to_value(&overview).unwrap();
        assert_eq!(
            json["junction_statistics"][0]["last_recorded"],
            "2017-06-06 08:00:00"
        );
    }
}
